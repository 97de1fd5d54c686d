//! Gesture Groove
//!
//! Turns a stream of hand-landmark frames into media playback commands.
//!
//! # Architecture
//!
//! Each processed frame goes through three stages:
//!
//! 1. **Recognize**: pinch detection, then horizontal and vertical swipes over
//!    bounded motion histories of the wrist position.
//! 2. **Gate**: a per-session cooldown admits at most one gesture per window.
//! 3. **Dispatch**: an admitted gesture becomes one playback-control call.
//!
//! Recognizer state and cooldown are per session. A local capture loop runs
//! one session; the TCP transport runs one session per connection.
//!
//! # Module Structure
//!
//! - `landmarks`: keypoints, hand frames and their wire form
//! - `recognize`: gesture labels, motion history, recognizer, cooldown gate
//! - `session`: recognizer + gate + dispatch for one client
//! - `playback`: playback-control trait, backends, action dispatcher
//! - `ingest`: landmark sources (synthetic, replay, pose-estimator adapter)
//! - `driver`: local capture loop and TCP transport
//! - `config`: file and environment configuration

pub mod config;
pub mod driver;
pub mod ingest;
pub mod landmarks;
pub mod playback;
pub mod recognize;
pub mod session;

pub use config::GrooveConfig;
pub use driver::{FrameSkipper, GestureServer, LocalDriver, ServerConfig, ServerHandle};
pub use ingest::{LandmarkSource, SourceConfig};
pub use landmarks::{HandLandmarks, Keypoint, LandmarkFrame, LANDMARK_COUNT};
pub use playback::{ActionDispatcher, DispatchError, InMemoryPlayer, PlaybackControl};
pub use recognize::{should_dispatch, GestureLabel, GestureRecognizer, RecognizerSettings};
pub use session::{FrameOutcome, GestureSession, SessionSettings, SharedSession};
