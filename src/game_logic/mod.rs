pub mod messages;
pub mod question;
pub mod session;
pub mod shuffle;
pub mod timer;

pub use messages::{ClientToServerMessage, ServerToClientMessage};
pub use question::{Choice, QuestionRecord};
pub use session::{AnswerTag, Phase, QuizSession, SessionError};

#[derive(Debug, Clone, PartialEq)]
pub enum EventHandlingResult {
    /// Event was handled normally, no special actions needed
    Handled,
    /// Session should end and the client be disconnected (e.g. on a Leave request)
    DisconnectClient,
}
