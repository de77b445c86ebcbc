use serde::{Deserialize, Serialize};

use crate::game_logic::question::Choice;
use crate::game_logic::session::{AnswerOutcome, QuizResult, SessionSnapshot};

/// Messages sent from the quiz page (WebSocket) to the server.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "messageType", content = "payload")]
pub enum ClientToServerMessage {
    /// Start a play-through. The server also starts one on connect.
    Start,
    /// Pick an option, by position or by its text.
    SubmitAnswer { choice: Choice },
    /// Skip the rest of the reveal delay.
    Advance,
    /// Play again with the same question pool.
    Restart,
    /// Close the session and the connection.
    Leave,
}

/// Messages sent from the server to the quiz page.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "messageType", content = "payload")]
pub enum ServerToClientMessage {
    /// Sent once after connecting.
    GameInfo {
        game_id: String,
        title: String,
        page_title: String,
        pool_size: usize,
        skipped_questions: usize,
    },
    /// Current state, sent after every transition and on every timer tick.
    SessionUpdate { snapshot: SessionSnapshot },
    AnswerRevealed { outcome: AnswerOutcome },
    QuizFinished { result: QuizResult },
    SystemError { message: String },
}

impl ServerToClientMessage {
    pub fn to_ws_text(&self) -> Result<axum::extract::ws::Message, serde_json::Error> {
        serde_json::to_string(self)
            .map(|json_string| axum::extract::ws::Message::Text(json_string.into()))
    }
}

pub fn client_message_from_ws_text(text: &str) -> Result<ClientToServerMessage, serde_json::Error> {
    serde_json::from_str(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_client_messages() {
        assert_eq!(
            client_message_from_ws_text(r#"{"messageType":"Start"}"#).unwrap(),
            ClientToServerMessage::Start
        );
        assert_eq!(
            client_message_from_ws_text(
                r#"{"messageType":"SubmitAnswer","payload":{"choice":2}}"#
            )
            .unwrap(),
            ClientToServerMessage::SubmitAnswer {
                choice: Choice::Index(2)
            }
        );
        assert_eq!(
            client_message_from_ws_text(
                r#"{"messageType":"SubmitAnswer","payload":{"choice":"Paris"}}"#
            )
            .unwrap(),
            ClientToServerMessage::SubmitAnswer {
                choice: Choice::Value("Paris".to_string())
            }
        );
        assert!(client_message_from_ws_text(r#"{"messageType":"Jump"}"#).is_err());
    }

    #[test]
    fn test_server_message_shape() {
        let message = ServerToClientMessage::SystemError {
            message: "Game not found".to_string(),
        };
        let json: serde_json::Value = serde_json::to_value(&message).unwrap();
        assert_eq!(json["messageType"], "SystemError");
        assert_eq!(json["payload"]["message"], "Game not found");
    }
}
