pub mod memory;
#[cfg(feature = "backend-spotify")]
pub mod spotify;

pub use memory::{InMemoryPlayer, PlayerCall};
#[cfg(feature = "backend-spotify")]
pub use spotify::{SpotifyConfig, SpotifyPlayer};
