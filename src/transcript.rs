//! The conversation transcript of a session.
//!
//! Lines are only ever appended. The same log feeds the display and, minus the
//! `System` lines and unanswered input, the prompt sent to the model on every
//! turn.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speaker {
    Player,
    GameMaster,
    System,
    SystemError,
}

impl Speaker {
    pub fn tag(&self) -> &'static str {
        match self {
            Speaker::Player => "Player",
            Speaker::GameMaster => "Game Master",
            Speaker::System => "System",
            Speaker::SystemError => "System Error",
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptLine {
    pub speaker: Speaker,
    pub text: String,
}

impl TranscriptLine {
    pub fn is_dialogue(&self) -> bool {
        matches!(self.speaker, Speaker::Player | Speaker::GameMaster)
    }
}

impl fmt::Display for TranscriptLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.speaker, self.text)
    }
}

/// How much of the dialogue is resent to the model on each turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "lines")]
pub enum ContextWindow {
    /// The whole dialogue, however long it gets.
    #[default]
    Unbounded,
    /// The scenario plus the last `n` dialogue lines.
    LastLines(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    scenario: String,
    lines: Vec<TranscriptLine>,
}

impl Transcript {
    pub fn new(scenario: impl Into<String>) -> Self {
        Self {
            scenario: scenario.into(),
            lines: Vec::new(),
        }
    }

    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    pub fn lines(&self) -> &[TranscriptLine] {
        &self.lines
    }

    /// Scenario line included.
    pub fn line_count(&self) -> usize {
        self.lines.len() + 1
    }

    pub fn append(&mut self, speaker: Speaker, text: impl Into<String>) {
        self.lines.push(TranscriptLine {
            speaker,
            text: text.into(),
        });
    }

    /// Every line as it is displayed, the scenario narrated by the Game Master first.
    pub fn display_lines(&self) -> impl Iterator<Item = String> + '_ {
        std::iter::once(format!("{}: {}", Speaker::GameMaster, self.scenario))
            .chain(self.lines.iter().map(|line| line.to_string()))
    }

    /// Starts from a saved conversation. Only dialogue lines are taken over.
    pub fn with_history(scenario: impl Into<String>, history: Vec<TranscriptLine>) -> Self {
        let mut transcript = Self::new(scenario);
        transcript
            .lines
            .extend(history.into_iter().filter(TranscriptLine::is_dialogue));
        transcript
    }

    /// The lines worth keeping across sessions.
    pub fn history(&self) -> Vec<TranscriptLine> {
        self.lines
            .iter()
            .filter(|line| line.is_dialogue())
            .cloned()
            .collect()
    }

    /// Dialogue the model has seen: every Game Master reply and the Player
    /// line it answers. Player input whose turn failed or was cancelled is
    /// displayed but never resent.
    fn exchanges(&self) -> Vec<&TranscriptLine> {
        self.lines
            .iter()
            .enumerate()
            .filter(|(i, line)| match line.speaker {
                Speaker::GameMaster => true,
                Speaker::Player => self
                    .lines
                    .get(i + 1)
                    .is_some_and(|next| next.speaker == Speaker::GameMaster),
                Speaker::System | Speaker::SystemError => false,
            })
            .map(|(_, line)| line)
            .collect()
    }

    /// The running context given to the model: the scenario followed by one
    /// `Speaker: text` line per answered exchange kept by `window`.
    pub fn context(&self, window: ContextWindow) -> String {
        let dialogue = self.exchanges();
        let kept = match window {
            ContextWindow::Unbounded => &dialogue[..],
            ContextWindow::LastLines(n) => &dialogue[dialogue.len().saturating_sub(n)..],
        };

        let mut context = self.scenario.clone();
        for line in kept {
            context.push('\n');
            context.push_str(&line.to_string());
        }
        context
    }
}
