//! Logging facade
//!
//! Forwards to `log` on hosts, to `defmt` on targets, or compiles away.
//! Format strings stick to `{}` and `{:?}` so both backends accept them.

cfg_if::cfg_if! {
    if #[cfg(feature = "log")] {
        #[allow(unused_imports)]
        pub(crate) use log::{debug, error, info, trace, warn};
    } else if #[cfg(feature = "defmt")] {
        #[allow(unused_imports)]
        pub(crate) use defmt::{debug, error, info, trace, warn};
    } else {
        macro_rules! trace {
            ($($arg:tt)*) => {{}};
        }
        macro_rules! debug {
            ($($arg:tt)*) => {{}};
        }
        macro_rules! info {
            ($($arg:tt)*) => {{}};
        }
        macro_rules! warn {
            ($($arg:tt)*) => {{}};
        }
        macro_rules! error {
            ($($arg:tt)*) => {{}};
        }
        #[allow(unused_imports)]
        pub(crate) use {debug, error, info, trace, warn};
    }
}
