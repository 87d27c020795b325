//! Userspace control of single GPIO lines through the sysfs class tree.
//!
//! The sysfs pin-control interface signals a successful claim by making
//! a per-line directory appear and offers no notification mechanism for
//! claims, releases, or value changes. Every wait in this crate is
//! therefore bounded polling: the [`watch`] module turns "a path
//! appears or disappears" into a single-shot handle with a hard
//! deadline, [`Port`] builds the claim/release lifecycle on top of it,
//! and the value streams sample the value file from background threads
//! that the owning port can cancel deterministically before a release.
//!
//! Diagnostics go through `tracing`; with no subscriber installed the
//! crate stays silent, so embedders choose their own logging stack.

mod cancel;
mod error;
mod host;
mod port;
mod stream;
mod sysfs;
pub mod watch;

pub use error::GpioError;
pub use gpiofs_config::{Config, ConfigError};
pub use host::Gpio;
pub use port::{Edge, LineState, Mode, Port};
pub use stream::Event;
