use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use uuid::Uuid;

use crate::config::QuizConfig;
use crate::game_logic::messages::client_message_from_ws_text;
use crate::game_logic::{
    AnswerTag, ClientToServerMessage, EventHandlingResult, Phase, QuizSession,
    ServerToClientMessage, SessionError,
};

/// Timing knobs for the presentation side of a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Pause after an answer before the next question is shown.
    pub reveal_delay: Duration,
    pub tick_interval: Duration,
    /// Advance automatically once the reveal delay has elapsed.
    pub auto_advance: bool,
}

impl From<&QuizConfig> for SessionOptions {
    fn from(config: &QuizConfig) -> Self {
        Self {
            reveal_delay: config.reveal_delay(),
            tick_interval: config.tick_interval(),
            auto_advance: config.auto_advance,
        }
    }
}

#[derive(Debug)]
pub enum SessionActorMessage {
    ClientEvent { raw_payload: String },
    Command(ClientToServerMessage),
    /// Posted by the reveal-delay task scheduled for the answer `tag`.
    RevealElapsed { tag: AnswerTag },
}

impl SessionActorMessage {
    fn kind(&self) -> &'static str {
        match self {
            SessionActorMessage::ClientEvent { .. } => "client_event",
            SessionActorMessage::Command(_) => "command",
            SessionActorMessage::RevealElapsed { .. } => "reveal_elapsed",
        }
    }
}

/// Owns one [`QuizSession`] for a single page view and turns client events and timer
/// ticks into transitions and outbound state.
pub struct SessionActor {
    receiver: mpsc::Receiver<SessionActorMessage>,
    // Weak so that dropping every handle closes the channel and stops the actor.
    self_sender: mpsc::WeakSender<SessionActorMessage>,
    session_id: Uuid,
    session: QuizSession,
    options: SessionOptions,
    outbound: mpsc::Sender<ServerToClientMessage>,
    ticker: Interval,
    pending_reveal: Option<JoinHandle<()>>,
}

impl SessionActor {
    fn new(
        receiver: mpsc::Receiver<SessionActorMessage>,
        self_sender: mpsc::WeakSender<SessionActorMessage>,
        session_id: Uuid,
        session: QuizSession,
        options: SessionOptions,
        outbound: mpsc::Sender<ServerToClientMessage>,
    ) -> Self {
        let mut ticker = tokio::time::interval(options.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        SessionActor {
            receiver,
            self_sender,
            session_id,
            session,
            options,
            outbound,
            ticker,
            pending_reveal: None,
        }
    }

    #[tracing::instrument(skip(self, msg), fields(
        session.id = %self.session_id,
        session.generation = self.session.generation(),
        msg_type = msg.kind()
    ))]
    async fn handle_message(&mut self, msg: SessionActorMessage) -> bool {
        match msg {
            SessionActorMessage::ClientEvent { raw_payload } => {
                tracing::trace!(event.raw = %raw_payload, "Raw event from client");
                match client_message_from_ws_text(&raw_payload) {
                    Ok(command) => {
                        if self.handle_command(command).await == EventHandlingResult::DisconnectClient
                        {
                            return true;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            event.raw = %raw_payload,
                            "Failed to deserialize event from client"
                        );
                        self.send(ServerToClientMessage::SystemError {
                            message: format!(
                                "Invalid message format: {}. Please send JSON like: {{\"messageType\":\"SubmitAnswer\",\"payload\":{{\"choice\":0}}}}",
                                e
                            ),
                        })
                        .await;
                    }
                }
            }
            SessionActorMessage::Command(command) => {
                if self.handle_command(command).await == EventHandlingResult::DisconnectClient {
                    return true;
                }
            }
            SessionActorMessage::RevealElapsed { tag } => {
                if tag == self.session.answer_tag() {
                    self.pending_reveal = None;
                }
                match self.session.advance_for(tag) {
                    Ok(phase) => self.after_advance(phase).await,
                    Err(e @ SessionError::StaleCallback { .. }) => {
                        tracing::debug!(error = %e, "Ignoring stale reveal callback");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Unexpected error while advancing");
                    }
                }
            }
        }
        false
    }

    async fn handle_command(&mut self, command: ClientToServerMessage) -> EventHandlingResult {
        tracing::debug!(command = ?command, "Processing command from client");
        match command {
            ClientToServerMessage::Start | ClientToServerMessage::Restart => {
                self.start_session().await;
            }
            ClientToServerMessage::SubmitAnswer { choice } => {
                if let Some(outcome) = self.session.submit_answer(&choice) {
                    self.send(ServerToClientMessage::AnswerRevealed { outcome })
                        .await;
                    self.send_snapshot().await;
                    if self.options.auto_advance {
                        self.schedule_reveal(self.session.answer_tag());
                    }
                }
            }
            ClientToServerMessage::Advance => {
                self.cancel_pending_reveal();
                if let Some(phase) = self.session.advance() {
                    self.after_advance(phase).await;
                }
            }
            ClientToServerMessage::Leave => {
                tracing::info!("Client explicitly leaving session");
                return EventHandlingResult::DisconnectClient;
            }
        }
        EventHandlingResult::Handled
    }

    async fn start_session(&mut self) {
        self.cancel_pending_reveal();
        match self.session.start() {
            Ok(_) => {
                self.ticker.reset();
                self.send_snapshot().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to start quiz session");
                self.send(ServerToClientMessage::SystemError {
                    message: e.to_string(),
                })
                .await;
            }
        }
    }

    async fn after_advance(&mut self, phase: Phase) {
        self.send_snapshot().await;
        if phase == Phase::Finished {
            if let Some(result) = self.session.result().cloned() {
                self.send(ServerToClientMessage::QuizFinished { result }).await;
            }
        }
    }

    fn schedule_reveal(&mut self, tag: AnswerTag) {
        self.cancel_pending_reveal();
        let sender = self.self_sender.clone();
        let delay = self.options.reveal_delay;
        self.pending_reveal = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(sender) = sender.upgrade() {
                let _ = sender
                    .send(SessionActorMessage::RevealElapsed { tag })
                    .await;
            }
        }));
    }

    fn cancel_pending_reveal(&mut self) {
        if let Some(handle) = self.pending_reveal.take() {
            handle.abort();
        }
    }

    async fn send_snapshot(&self) {
        self.send(ServerToClientMessage::SessionUpdate {
            snapshot: self.session.snapshot(),
        })
        .await;
    }

    async fn send(&self, message: ServerToClientMessage) {
        if self.outbound.send(message).await.is_err() {
            tracing::warn!(session.id = %self.session_id, "Failed to send to client");
        }
    }
}

#[tracing::instrument(skip(actor), fields(session.id = %actor.session_id))]
pub async fn run_session_actor(mut actor: SessionActor) {
    tracing::info!("Session actor started");

    loop {
        tokio::select! {
            maybe_msg = actor.receiver.recv() => {
                match maybe_msg {
                    Some(msg) => {
                        let should_shutdown = actor.handle_message(msg).await;
                        if should_shutdown {
                            tracing::info!("Session shutdown requested by message handler");
                            break;
                        }
                    }
                    None => {
                        tracing::info!("Session actor channel closed. Shutting down");
                        break;
                    }
                }
            }
            _ = actor.ticker.tick(), if actor.session.is_running() => {
                actor.send_snapshot().await;
            }
        }
    }

    actor.cancel_pending_reveal();
    tracing::info!("Session actor stopping");
}

#[derive(Clone, Debug)]
pub struct SessionActorHandle {
    sender: mpsc::Sender<SessionActorMessage>,
    pub session_id: Uuid,
}

impl SessionActorHandle {
    pub fn spawn(
        session_id: Uuid,
        buffer_size: usize,
        session: QuizSession,
        options: SessionOptions,
        outbound: mpsc::Sender<ServerToClientMessage>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = SessionActor::new(
            receiver,
            sender.downgrade(),
            session_id,
            session,
            options,
            outbound,
        );
        tokio::spawn(run_session_actor(actor));
        Self { sender, session_id }
    }

    pub async fn forward_client_event(&self, raw_payload: String) -> Result<(), String> {
        self.sender
            .send(SessionActorMessage::ClientEvent { raw_payload })
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    pub async fn send_command(&self, command: ClientToServerMessage) -> Result<(), String> {
        self.sender
            .send(SessionActorMessage::Command(command))
            .await
            .map_err(|e| format!("Failed to send command: {}", e))
    }
}
