//! Network fetch client
//!
//! One bounded exchange per cycle:
//!
//! 1. Power on the radio
//! 2. Join the network (each attempt re-joins)
//! 3. Open the connection and send the GET through `reqwless`
//! 4. Read and parse the response into a [`DataSnapshot`]
//! 5. If forecast steps are configured, fetch them on a second
//!    connection; a failed forecast leaves the current data intact
//! 6. Power off the radio, on every exit path
//!
//! Transient failures of the current-weather request are retried with a
//! fixed pause until `max_attempts` or the overall deadline runs out.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt::Write as _;

use embassy_time::{with_timeout, Duration, Instant, Timer};
use heapless::String;
use inkwake_hal::{RadioError, RadioLink};
use inkwake_protocol::{Target, TargetError};
use reqwless::request::{Method, Request, RequestBuilder};
use reqwless::response::Response;

use crate::config::{DeviceConfig, EndpointConfig, Location};
use crate::data::{parse_current, parse_forecast, DataSnapshot, ForecastEntry, MAX_FORECAST};
use crate::logging::{debug, info, warn};

/// Receive buffer for response headers and body
pub const RX_BUFFER_SIZE: usize = 4096;

const HEADERS: &[(&str, &str)] = &[
    ("User-Agent", "inkwake/0.1"),
    ("Accept", "application/json"),
    ("Connection", "close"),
];

/// Fetch failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FetchError {
    /// Radio hardware did not power up
    RadioUnavailable,
    /// Network join failed or timed out
    AssociationTimeout,
    /// No complete response within the request timeout
    RequestTimeout,
    /// Connection refused or dropped, or a 5xx/429 answer
    RequestFailed,
    /// Server refused the request (4xx other than 429, or a redirect)
    Rejected(u16),
    /// Configured endpoint does not fit a request
    InvalidRequest,
    /// Response could not be parsed or violates the schema
    MalformedResponse,
    /// The overall fetch deadline expired
    DeadlineExceeded,
}

impl FetchError {
    /// Check if another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::AssociationTimeout | FetchError::RequestTimeout | FetchError::RequestFailed
        )
    }
}

impl From<TargetError> for FetchError {
    fn from(_: TargetError) -> Self {
        FetchError::InvalidRequest
    }
}

fn http_to_fetch(err: reqwless::Error) -> FetchError {
    match err {
        reqwless::Error::Codec | reqwless::Error::BufferTooSmall => FetchError::MalformedResponse,
        _ => FetchError::RequestFailed,
    }
}

fn radio_to_fetch(err: RadioError) -> FetchError {
    match err {
        RadioError::Unavailable => FetchError::RadioUnavailable,
        RadioError::AssociationFailed => FetchError::AssociationTimeout,
        RadioError::ConnectFailed | RadioError::Io => FetchError::RequestFailed,
    }
}

/// Target for `path` carrying the location, key, units and language
fn location_target(endpoint: &EndpointConfig, path: &str) -> Result<Target, TargetError> {
    let target = match &endpoint.location {
        Location::CityId(id) => Target::new(path)?.param_u32("id", *id)?,
        Location::Name(name) => Target::new(path)?.param("q", name)?,
    };
    let target = target
        .param("appid", &endpoint.api_key)?
        .param("units", endpoint.units.as_str())?;
    if endpoint.language.is_empty() {
        Ok(target)
    } else {
        target.param("lang", &endpoint.language)
    }
}

/// Fetch client over a [`RadioLink`]
pub struct FetchClient<'a, R> {
    radio: &'a mut R,
    now: Option<u64>,
    max_attempts: Option<u8>,
}

impl<'a, R: RadioLink> FetchClient<'a, R> {
    /// Create a fetch client for one cycle
    ///
    /// # Arguments
    /// * `radio` - Radio, powered off
    /// * `now` - Wall-clock time used to stamp the snapshot
    pub fn new(radio: &'a mut R, now: Option<u64>) -> Self {
        Self {
            radio,
            now,
            max_attempts: None,
        }
    }

    /// Override the configured attempt limit
    pub fn with_max_attempts(mut self, attempts: u8) -> Self {
        self.max_attempts = Some(attempts.max(1));
        self
    }

    /// Fetch a fresh snapshot within `deadline`
    ///
    /// The radio is powered off before this returns, whatever the outcome.
    pub async fn fetch(&mut self, config: &DeviceConfig, deadline: Duration) -> Result<DataSnapshot, FetchError> {
        let started = Instant::now();
        let result = match with_timeout(deadline, self.attempts(config)).await {
            Ok(Ok(snapshot)) => {
                let remaining = deadline
                    .checked_sub(started.elapsed())
                    .unwrap_or(Duration::from_ticks(0));
                Ok(self.add_forecast(config, snapshot, remaining).await)
            }
            Ok(Err(err)) => Err(err),
            Err(_) => {
                warn!("fetch deadline of {} ms expired", deadline.as_millis());
                Err(FetchError::DeadlineExceeded)
            }
        };

        self.disconnect(config).await;
        if with_timeout(config.timeouts.arm(), self.radio.power_off()).await.is_err() {
            warn!("radio power-off timed out");
        }
        result
    }

    async fn disconnect(&mut self, config: &DeviceConfig) {
        if with_timeout(config.timeouts.arm(), self.radio.disconnect()).await.is_err() {
            warn!("radio disconnect timed out");
        }
    }

    async fn attempts(&mut self, config: &DeviceConfig) -> Result<DataSnapshot, FetchError> {
        let timeouts = &config.timeouts;
        match with_timeout(timeouts.connect(), self.radio.power_on()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!("radio power-on failed: {:?}", err);
                return Err(FetchError::RadioUnavailable);
            }
            Err(_) => {
                warn!("radio power-on timed out");
                return Err(FetchError::RadioUnavailable);
            }
        }

        let max_attempts = self.max_attempts.unwrap_or(timeouts.max_attempts).max(1);
        let mut attempt = 1;
        loop {
            match self.attempt(config).await {
                Ok(snapshot) => {
                    info!("fetch succeeded on attempt {}", attempt);
                    return Ok(snapshot);
                }
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    warn!("fetch attempt {} failed: {:?}, retrying", attempt, err);
                    self.disconnect(config).await;
                    Timer::after(timeouts.retry_backoff()).await;
                    attempt += 1;
                }
                Err(err) => {
                    warn!("fetch attempt {} failed: {:?}, giving up", attempt, err);
                    return Err(err);
                }
            }
        }
    }

    async fn attempt(&mut self, config: &DeviceConfig) -> Result<DataSnapshot, FetchError> {
        let timeouts = &config.timeouts;
        let wifi = &config.wifi;

        match with_timeout(timeouts.connect(), self.radio.associate(&wifi.ssid, &wifi.passphrase)).await {
            Ok(Ok(())) => debug!("associated with network"),
            Ok(Err(_)) | Err(_) => return Err(FetchError::AssociationTimeout),
        }

        with_timeout(timeouts.request(), self.current(&config.endpoint))
            .await
            .unwrap_or(Err(FetchError::RequestTimeout))
    }

    async fn current(&mut self, endpoint: &EndpointConfig) -> Result<DataSnapshot, FetchError> {
        let target = location_target(endpoint, &endpoint.path)?;
        let body = self.get(endpoint, target.as_str()).await?;
        parse_current(&body, endpoint.units, self.now).map_err(|err| {
            warn!("response does not match schema: {:?}", err);
            FetchError::MalformedResponse
        })
    }

    /// Attach up to `forecast_steps` forecast steps, within `remaining`
    async fn add_forecast(&mut self, config: &DeviceConfig, snapshot: DataSnapshot, remaining: Duration) -> DataSnapshot {
        let steps = (config.endpoint.forecast_steps as usize).min(MAX_FORECAST);
        if steps == 0 {
            return snapshot;
        }
        self.disconnect(config).await;

        let timeout = remaining.min(config.timeouts.request());
        match with_timeout(timeout, self.forecast(&config.endpoint, steps)).await {
            Ok(Ok(forecast)) => {
                debug!("forecast with {} steps", forecast.len());
                snapshot.with_forecast(forecast)
            }
            Ok(Err(err)) => {
                warn!("forecast unavailable: {:?}", err);
                snapshot
            }
            Err(_) => {
                warn!("forecast request timed out");
                snapshot
            }
        }
    }

    async fn forecast(
        &mut self,
        endpoint: &EndpointConfig,
        steps: usize,
    ) -> Result<heapless::Vec<ForecastEntry, MAX_FORECAST>, FetchError> {
        let target = location_target(endpoint, &endpoint.forecast_path)?.param_u32("cnt", steps as u32)?;
        let body = self.get(endpoint, target.as_str()).await?;
        parse_forecast(&body, steps).map_err(|err| {
            warn!("forecast does not match schema: {:?}", err);
            FetchError::MalformedResponse
        })
    }

    /// One GET on a fresh connection, returning the body of a 2xx answer
    async fn get(&mut self, endpoint: &EndpointConfig, target: &str) -> Result<Vec<u8>, FetchError> {
        let mut host: String<72> = String::new();
        write!(host, "{}", endpoint.host).map_err(|_| FetchError::InvalidRequest)?;
        if endpoint.port != 80 {
            write!(host, ":{}", endpoint.port).map_err(|_| FetchError::InvalidRequest)?;
        }

        self.radio
            .connect(&endpoint.host, endpoint.port)
            .await
            .map_err(radio_to_fetch)?;

        let request = Request::get(target).host(host.as_str()).headers(HEADERS).build();
        request.write(&mut *self.radio).await.map_err(http_to_fetch)?;

        let mut rx = vec![0u8; RX_BUFFER_SIZE];
        let response = Response::read(&mut *self.radio, Method::GET, &mut rx)
            .await
            .map_err(http_to_fetch)?;

        match response.status.0 {
            200..=299 => {}
            status @ (429 | 500..=599) => {
                warn!("server answered {}", status);
                return Err(FetchError::RequestFailed);
            }
            status => {
                warn!("request rejected with {}", status);
                return Err(FetchError::Rejected(status));
            }
        }

        let body = response.body().read_to_end().await.map_err(http_to_fetch)?;
        Ok(body.to_vec())
    }
}
