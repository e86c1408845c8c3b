// ui/mod.rs

pub mod campaign_menu;
pub mod game;
pub mod spinner;

pub use campaign_menu::CampaignMenu;
pub use game::GameScreen;

use crossterm::event::KeyEvent;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Flex, Layout, Rect},
};
use std::fmt::Debug;

use crate::{app::Action, app::Session, ui::spinner::Spinner};

pub const MIN_WIDTH: u16 = 60;
pub const MIN_HEIGHT: u16 = 20;

/// What a component may look at while handling keys or drawing.
pub struct Context<'a> {
    pub session: Option<&'a Session>,
    pub spinner: &'a Spinner,
}

pub trait Component: Debug {
    fn on_key(&mut self, key: KeyEvent, context: &Context) -> Option<Action>;
    fn on_paste(&mut self, _text: &str) {}
    fn render(&mut self, area: Rect, buffer: &mut Buffer, context: &Context);
}

pub fn center_rect(area: Rect, horizontal: Constraint, vertical: Constraint) -> Rect {
    let [area] = Layout::horizontal([horizontal])
        .flex(Flex::Center)
        .areas(area);
    let [area] = Layout::vertical([vertical]).flex(Flex::Center).areas(area);
    area
}

pub fn too_small(area: Rect) -> bool {
    area.width < MIN_WIDTH || area.height < MIN_HEIGHT
}
