mod core;
mod state;
mod streaming;


pub use state::{Message, Sender, Transcript, TranscriptManager, TranscriptUpdate};
pub use streaming::TurnPhase;
