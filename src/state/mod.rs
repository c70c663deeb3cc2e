pub mod session;
pub mod transcript;

pub use session::SessionContext;
pub use transcript::{
    Message, Sender, Transcript, TranscriptManager, TranscriptUpdate, TurnPhase,
};
