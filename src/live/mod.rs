//! Live transcription: WebSocket streaming client plus the
//! single-owner aggregation loop.

pub mod events;
pub mod session;
pub mod stream;

pub use events::LiveEvent;
pub use session::{drive_events, LiveSession};
pub use stream::{DeepgramLiveClient, LiveStreamOptions};
