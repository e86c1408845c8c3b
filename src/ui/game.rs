// ui/game.rs

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::*,
};
use tui_textarea::TextArea;

use super::{Component, Context, spinner::spinner_frame, too_small};
use crate::{app::Action, transcript::Speaker, transcript::Transcript};

#[derive(Debug)]
pub struct GameScreen {
    input: TextArea<'static>,
    // Lines scrolled up from the bottom of the transcript.
    scroll_back: usize,
    visible_lines: usize,
}

impl Default for GameScreen {
    fn default() -> Self {
        Self::new()
    }
}

fn speaker_style(speaker: Speaker) -> Style {
    match speaker {
        Speaker::Player => Style::default().fg(Color::Cyan),
        Speaker::GameMaster => Style::default().fg(Color::Green),
        Speaker::System => Style::default().fg(Color::DarkGray),
        Speaker::SystemError => Style::default().fg(Color::Red),
    }
}

/// Wraps every transcript entry to `width`, the speaker tag in bold on the first line.
pub fn transcript_lines(transcript: &Transcript, width: usize) -> Vec<Line<'static>> {
    let entries = std::iter::once((Speaker::GameMaster, transcript.scenario())).chain(
        transcript
            .lines()
            .iter()
            .map(|line| (line.speaker, line.text.as_str())),
    );

    let mut lines = Vec::new();
    for (speaker, text) in entries {
        let style = speaker_style(speaker);
        let tag = format!("{}: ", speaker.tag());
        let full = format!("{tag}{text}");
        for (i, wrapped) in textwrap::wrap(&full, width.max(1)).into_iter().enumerate() {
            let wrapped = wrapped.into_owned();
            if i == 0 && wrapped.starts_with(&tag) {
                let rest = wrapped[tag.len()..].to_string();
                lines.push(Line::from(vec![
                    Span::styled(tag.clone(), style.add_modifier(Modifier::BOLD)),
                    Span::styled(rest, style),
                ]));
            } else {
                lines.push(Line::from(Span::styled(wrapped, style)));
            }
        }
        lines.push(Line::default());
    }
    lines
}

/// First row shown when the view sits `scroll_back` lines above the bottom.
/// Ratatui scrolls by `u16`, so very long transcripts stop at its maximum.
pub fn scroll_top(total_lines: usize, visible_lines: usize, scroll_back: usize) -> u16 {
    let max_scroll = total_lines.saturating_sub(visible_lines);
    let top = max_scroll - scroll_back.min(max_scroll);
    u16::try_from(top).unwrap_or(u16::MAX)
}

impl GameScreen {
    pub fn new() -> Self {
        let mut input = TextArea::default();
        input.set_placeholder_text("What do you do?");
        Self {
            input,
            scroll_back: 0,
            visible_lines: 0,
        }
    }

    fn take_input(&mut self) -> String {
        let text = self.input.lines().join("\n");
        self.input = Self::new().input;
        text
    }

    fn scroll_up(&mut self, lines: usize) {
        self.scroll_back = self.scroll_back.saturating_add(lines);
    }

    fn scroll_down(&mut self, lines: usize) {
        self.scroll_back = self.scroll_back.saturating_sub(lines);
    }

    fn render_transcript(&mut self, area: Rect, buffer: &mut Buffer, context: &Context) {
        let block = Block::default()
            .border_type(BorderType::Rounded)
            .borders(Borders::ALL)
            .title(match context.session {
                Some(session) => format!(" {} ", session.campaign.name),
                None => " No active game ".to_string(),
            })
            .border_style(Style::default().fg(Color::DarkGray));
        let inner = block.inner(area);
        block.render(area, buffer);

        let Some(session) = context.session else {
            return;
        };
        let lines = transcript_lines(session.turns.transcript(), inner.width as usize);
        self.visible_lines = inner.height as usize;
        self.scroll_back = self
            .scroll_back
            .min(lines.len().saturating_sub(self.visible_lines));
        let top = scroll_top(lines.len(), self.visible_lines, self.scroll_back);

        Paragraph::new(lines)
            .scroll((top, 0))
            .render(inner, buffer);

        if session.turns.is_generating() && inner.height > 0 {
            let spinner_area = Rect::new(inner.x, inner.bottom() - 1, inner.width, 1);
            Clear.render(spinner_area, buffer);
            Paragraph::new(spinner_frame(context.spinner))
                .style(Style::default().fg(Color::Green))
                .alignment(Alignment::Center)
                .render(spinner_area, buffer);
        }
    }
}

impl Component for GameScreen {
    fn on_key(&mut self, key: KeyEvent, context: &Context) -> Option<Action> {
        let generating = context
            .session
            .is_some_and(|session| session.turns.is_generating());
        match key.code {
            KeyCode::Esc if generating => Some(Action::CancelTurn),
            KeyCode::Esc => Some(Action::Quit),
            KeyCode::Enter if generating => None,
            KeyCode::Enter => {
                let text = self.take_input();
                self.scroll_back = 0;
                Some(Action::SubmitTurn(text))
            }
            KeyCode::PageUp => {
                self.scroll_up(self.visible_lines.max(1));
                None
            }
            KeyCode::PageDown => {
                self.scroll_down(self.visible_lines.max(1));
                None
            }
            KeyCode::Up => {
                self.scroll_up(1);
                None
            }
            KeyCode::Down => {
                self.scroll_down(1);
                None
            }
            _ => {
                self.input.input(key);
                None
            }
        }
    }

    fn on_paste(&mut self, text: &str) {
        self.input.insert_str(text);
    }

    fn render(&mut self, area: Rect, buffer: &mut Buffer, context: &Context) {
        if too_small(area) {
            Paragraph::new("Terminal too small. Please resize.")
                .style(Style::default().fg(Color::Red))
                .alignment(Alignment::Center)
                .render(area, buffer);
            return;
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(5),
                Constraint::Length(3),
                Constraint::Length(1),
            ])
            .split(area);

        self.render_transcript(chunks[0], buffer, context);

        self.input.set_block(
            Block::default()
                .border_type(BorderType::Rounded)
                .borders(Borders::ALL)
                .title(" Player ")
                .border_style(Style::default().fg(Color::Yellow)),
        );
        (&self.input).render(chunks[1], buffer);

        Paragraph::new("Enter: send | ↑/↓ PgUp/PgDn: scroll | Esc: cancel or quit")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .render(chunks[2], buffer);
    }
}
