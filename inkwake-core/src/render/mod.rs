//! Display rendering
//!
//! Composes snapshots into 1-bit frames and commits them to the panel.

pub mod commit;
pub mod framebuffer;
pub mod layout;
pub mod renderer;

pub use commit::{choose_refresh, Display, DisplayError, RefreshMode};
pub use framebuffer::FrameBuffer;
pub use layout::{Layout, REGION_COUNT};
pub use renderer::{DisplayFrame, FrameSignature, Renderer};
