// ui/campaign_menu.rs

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::*,
};
use tui_textarea::TextArea;

use super::{Component, Context, center_rect, too_small};
use crate::{
    app::Action,
    catalog::{CampaignCatalog, DeleteOutcome, DeletePrompt},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }

    fn color(&self) -> Color {
        match self.kind {
            NoticeKind::Info => Color::Green,
            NoticeKind::Warning => Color::Yellow,
            NoticeKind::Error => Color::Red,
        }
    }
}

#[derive(Debug)]
enum MenuMode {
    Browse,
    NewName(TextArea<'static>),
    ConfirmDelete(DeletePrompt),
}

#[derive(Debug)]
pub struct CampaignMenu {
    catalog: CampaignCatalog,
    list_state: ListState,
    mode: MenuMode,
    notice: Option<Notice>,
}

impl CampaignMenu {
    pub fn new(catalog: CampaignCatalog) -> Self {
        Self {
            catalog,
            list_state: ListState::default(),
            mode: MenuMode::Browse,
            notice: None,
        }
    }

    pub fn with_notice(mut self, notice: Notice) -> Self {
        self.notice = Some(notice);
        self
    }

    pub fn catalog(&self) -> &CampaignCatalog {
        &self.catalog
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    fn move_highlight(&mut self, forward: bool) {
        let len = self.catalog.campaigns().len();
        if len == 0 {
            return;
        }
        let next = match (self.list_state.selected(), forward) {
            (None, _) => 0,
            (Some(i), true) => (i + 1) % len,
            (Some(i), false) => (i + len - 1) % len,
        };
        self.list_state.select(Some(next));
        // Highlighting a campaign chooses it, like clicking it would.
        let _ = self.catalog.select_existing(next);
    }

    fn on_browse_key(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.move_highlight(false);
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.move_highlight(true);
                None
            }
            KeyCode::Enter => match self.catalog.finalize() {
                Ok(result) => Some(Action::CampaignChosen(result)),
                Err(e) => {
                    self.notice = Some(Notice::warning(e.to_string()));
                    None
                }
            },
            KeyCode::Char('n') => {
                let mut input = TextArea::default();
                input.set_placeholder_text("Enter campaign name");
                self.mode = MenuMode::NewName(input);
                None
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                match self.catalog.request_delete(self.list_state.selected()) {
                    Ok(prompt) => self.mode = MenuMode::ConfirmDelete(prompt),
                    Err(e) => self.notice = Some(Notice::warning(e.to_string())),
                }
                None
            }
            KeyCode::Esc | KeyCode::Char('q') => {
                Some(Action::CampaignChosen(self.catalog.cancel()))
            }
            _ => None,
        }
    }

    fn confirm_delete(&mut self, confirmed: bool) {
        self.mode = MenuMode::Browse;
        match self.catalog.confirm_delete(confirmed) {
            Ok(outcome) => {
                if let DeleteOutcome::Deleted(_) = outcome {
                    let len = self.catalog.campaigns().len();
                    let selected = self
                        .list_state
                        .selected()
                        .filter(|_| len > 0)
                        .map(|i| i.min(len - 1));
                    self.list_state.select(selected);
                    // The highlight is the selection, keep them in step.
                    if let Some(i) = selected {
                        let _ = self.catalog.select_existing(i);
                    }
                }
                self.notice = outcome.message().map(Notice::info);
            }
            Err(e) => self.notice = Some(Notice::error(e.to_string())),
        }
    }

    fn render_list(&mut self, area: Rect, buffer: &mut Buffer) {
        let items: Vec<ListItem> = if self.catalog.campaigns().is_empty() {
            vec![ListItem::new(Line::from(Span::styled(
                "No campaigns yet. Press 'n' to create one.",
                Style::default().fg(Color::DarkGray),
            )))]
        } else {
            self.catalog
                .labels()
                .into_iter()
                .enumerate()
                .map(|(i, label)| ListItem::new(format!("{}. {}", i + 1, label)))
                .collect()
        };

        let list = List::new(items)
            .block(
                Block::default()
                    .border_type(BorderType::Rounded)
                    .borders(Borders::ALL)
                    .title(" Select Campaign ")
                    .border_style(Style::default().fg(Color::Magenta)),
            )
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");

        StatefulWidget::render(list, area, buffer, &mut self.list_state);
    }

    fn render_popup(&self, area: Rect, buffer: &mut Buffer) {
        match &self.mode {
            MenuMode::Browse => {}
            MenuMode::NewName(input) => {
                let popup = center_rect(area, Constraint::Percentage(60), Constraint::Length(3));
                Clear.render(popup, buffer);
                let mut input = input.clone();
                input.set_block(
                    Block::default()
                        .border_type(BorderType::Rounded)
                        .borders(Borders::ALL)
                        .title(" New Campaign ")
                        .border_style(Style::default().fg(Color::Yellow)),
                );
                input.render(popup, buffer);
            }
            MenuMode::ConfirmDelete(prompt) => {
                let popup = center_rect(area, Constraint::Percentage(70), Constraint::Length(8));
                Clear.render(popup, buffer);
                Paragraph::new(format!("{}\n\n[y] Yes   [n] No", prompt.question()))
                    .wrap(Wrap { trim: false })
                    .alignment(Alignment::Center)
                    .block(
                        Block::default()
                            .border_type(BorderType::Rounded)
                            .borders(Borders::ALL)
                            .title(" Confirm Deletion ")
                            .border_style(Style::default().fg(Color::Red)),
                    )
                    .render(popup, buffer);
            }
        }
    }
}

impl Component for CampaignMenu {
    fn on_key(&mut self, key: KeyEvent, _context: &Context) -> Option<Action> {
        match &mut self.mode {
            MenuMode::Browse => self.on_browse_key(key),
            MenuMode::NewName(input) => match key.code {
                KeyCode::Esc => {
                    self.mode = MenuMode::Browse;
                    None
                }
                KeyCode::Enter => {
                    let name = input.lines().join(" ");
                    self.mode = MenuMode::Browse;
                    match self.catalog.request_new(&name) {
                        Ok(Some(result)) => Some(Action::CampaignChosen(result)),
                        Ok(None) => None,
                        Err(e) => {
                            self.notice = Some(Notice::error(e.to_string()));
                            None
                        }
                    }
                }
                _ => {
                    input.input(key);
                    None
                }
            },
            MenuMode::ConfirmDelete(_) => {
                match key.code {
                    KeyCode::Char('y') | KeyCode::Char('Y') => self.confirm_delete(true),
                    KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                        self.confirm_delete(false)
                    }
                    _ => {}
                }
                None
            }
        }
    }

    fn on_paste(&mut self, text: &str) {
        if let MenuMode::NewName(input) = &mut self.mode {
            input.insert_str(text.replace(['\n', '\r'], " "));
        }
    }

    fn render(&mut self, area: Rect, buffer: &mut Buffer, _context: &Context) {
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
                Constraint::Length(1),
                Constraint::Min(5),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(area);

        Paragraph::new(format!("Game Master v{}", env!("CARGO_PKG_VERSION")))
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .render(chunks[0], buffer);

        self.render_list(chunks[1], buffer);

        if let Some(notice) = &self.notice {
            Paragraph::new(notice.text.as_str())
                .style(Style::default().fg(notice.color()))
                .alignment(Alignment::Center)
                .render(chunks[2], buffer);
        }

        let help = match self.mode {
            MenuMode::Browse => {
                "↑/↓: choose | Enter: play | n: new campaign | d: delete | Esc: quit"
            }
            MenuMode::NewName(_) => "Enter: create | Esc: back",
            MenuMode::ConfirmDelete(_) => "y: delete | n: keep",
        };
        Paragraph::new(help)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .render(chunks[3], buffer);

        self.render_popup(area, buffer);
    }
}
