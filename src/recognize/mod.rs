mod cooldown;
mod history;
mod label;
mod recognizer;

pub use cooldown::{should_dispatch, CooldownGate};
pub use history::MotionHistory;
pub use label::GestureLabel;
pub use recognizer::{GestureRecognizer, RecognizerSettings};
