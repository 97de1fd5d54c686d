//! Drivers that feed frames into gesture sessions.
//!
//! - `local`: pulls frames from a `LandmarkSource`, decimates them and runs one
//!   session against the configured playback backend.
//! - `remote`: a loopback TCP server; every connection gets its own session.

pub mod local;
pub mod remote;

pub use local::{FrameSkipper, LocalDriver, StepOutcome};
pub use remote::{ClientMessage, GestureServer, ServerConfig, ServerHandle, ServerMessage};
