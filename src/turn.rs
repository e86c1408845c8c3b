//! One exchange between the player and the Game Master.
//!
//! `submit` appends the player's line and spawns the generation; the result
//! comes back as a [`TurnCompletion`] on the channel given at construction and
//! must be handed to [`TurnController::complete`] by the task owning the UI.

use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::error::GatewayError;
use crate::gateway::ModelGateway;
use crate::transcript::{ContextWindow, Speaker, Transcript, TranscriptLine};

/// The model's answer starts after the last occurrence of this marker.
pub const RESPONSE_MARKER: &str = "AI Game Master:";

pub const CANCELLED_MESSAGE: &str = "Generation cancelled.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Generating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Empty input, nothing happened.
    Ignored,
    /// A generation is already running.
    Busy,
    Started(u64),
}

#[derive(Debug)]
pub enum TurnOutcome {
    Generated(String),
    Failed(GatewayError),
    Cancelled,
}

#[derive(Debug)]
pub struct TurnCompletion {
    pub turn: u64,
    pub outcome: TurnOutcome,
}

/// Builds the prompt for `input` on top of the running `context`.
pub fn build_prompt(context: &str, input: &str) -> String {
    format!("{context}\n\nPlayer: {input}\n\n{RESPONSE_MARKER}")
}

/// Everything after the last response marker, trimmed. Without a marker the
/// whole decoded text is the response, echoed prompt included.
pub fn extract_response(decoded: &str) -> &str {
    decoded
        .rsplit_once(RESPONSE_MARKER)
        .map_or(decoded, |(_, response)| response)
        .trim()
}

#[derive(Debug)]
pub struct TurnController {
    transcript: Transcript,
    window: ContextWindow,
    gateway: Arc<ModelGateway>,
    state: TurnState,
    turn: u64,
    cancellation_token: Option<CancellationToken>,
    completion_tx: UnboundedSender<TurnCompletion>,
}

impl TurnController {
    pub fn new(
        transcript: Transcript,
        window: ContextWindow,
        gateway: Arc<ModelGateway>,
        completion_tx: UnboundedSender<TurnCompletion>,
    ) -> Self {
        Self {
            transcript,
            window,
            gateway,
            state: TurnState::Idle,
            turn: 0,
            cancellation_token: None,
            completion_tx,
        }
    }

    /// A fresh session: the scenario, then whatever the gateway reports about the model.
    pub fn start_session(
        scenario: &str,
        window: ContextWindow,
        gateway: Arc<ModelGateway>,
        completion_tx: UnboundedSender<TurnCompletion>,
    ) -> Self {
        Self::resume_session(scenario, Vec::new(), window, gateway, completion_tx)
    }

    /// Like [`TurnController::start_session`], with the dialogue of earlier
    /// sessions placed between the scenario and the model status.
    pub fn resume_session(
        scenario: &str,
        history: Vec<TranscriptLine>,
        window: ContextWindow,
        gateway: Arc<ModelGateway>,
        completion_tx: UnboundedSender<TurnCompletion>,
    ) -> Self {
        let mut transcript = Transcript::with_history(scenario, history);
        match gateway.status_message() {
            Ok(message) => transcript.append(Speaker::System, message),
            Err(reason) => transcript.append(Speaker::SystemError, reason),
        }
        Self::new(transcript, window, gateway, completion_tx)
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn is_generating(&self) -> bool {
        self.state == TurnState::Generating
    }

    pub fn submit(&mut self, input: &str) -> Submission {
        if input.is_empty() {
            return Submission::Ignored;
        }
        if self.is_generating() {
            return Submission::Busy;
        }

        let prompt = build_prompt(&self.transcript.context(self.window), input);
        self.transcript.append(Speaker::Player, input);

        self.turn += 1;
        let turn = self.turn;
        let token = CancellationToken::new();
        self.cancellation_token = Some(token.clone());
        self.state = TurnState::Generating;

        let gateway = Arc::clone(&self.gateway);
        let completion_tx = self.completion_tx.clone();
        log::debug!("Turn {turn}: prompt of {} bytes", prompt.len());
        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = token.cancelled() => TurnOutcome::Cancelled,
                result = gateway.generate(&prompt) => match result {
                    Ok(decoded) => TurnOutcome::Generated(decoded),
                    Err(e) => TurnOutcome::Failed(e),
                },
            };
            if completion_tx.send(TurnCompletion { turn, outcome }).is_err() {
                log::warn!("Turn {turn} finished after its session closed");
            }
        });

        Submission::Started(turn)
    }

    /// Requests cancellation of the running generation. The transcript only
    /// changes once the matching completion comes back.
    pub fn cancel(&mut self) -> bool {
        match (&self.state, &self.cancellation_token) {
            (TurnState::Generating, Some(token)) => {
                token.cancel();
                true
            }
            _ => false,
        }
    }

    /// Applies a finished generation. Returns `false` for a completion that
    /// does not belong to the running turn.
    pub fn complete(&mut self, completion: TurnCompletion) -> bool {
        if !self.is_generating() || completion.turn != self.turn {
            log::warn!("Dropping stale completion for turn {}", completion.turn);
            return false;
        }
        self.state = TurnState::Idle;
        self.cancellation_token = None;

        match completion.outcome {
            TurnOutcome::Generated(decoded) => {
                let response = extract_response(&decoded);
                self.transcript.append(Speaker::GameMaster, response);
            }
            TurnOutcome::Failed(e) => {
                log::error!("Turn {} failed: {e}", completion.turn);
                self.transcript.append(Speaker::SystemError, e.to_string());
            }
            TurnOutcome::Cancelled => {
                self.transcript.append(Speaker::System, CANCELLED_MESSAGE);
            }
        }
        true
    }
}
