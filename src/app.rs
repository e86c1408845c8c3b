// /app.rs
use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc;

use crate::{
    catalog::{CampaignCatalog, CampaignRecord, SelectionResult},
    error::{AppError, Result},
    gateway::ModelGateway,
    settings::Settings,
    store::JsonCampaignStore,
    tui::{Tui, TuiEvent},
    turn::{Submission, TurnCompletion, TurnController},
    ui::{
        CampaignMenu, Component, Context, GameScreen, campaign_menu::Notice, spinner::Spinner,
    },
};

pub enum Action {
    Quit,
    CampaignChosen(SelectionResult),
    SubmitTurn(String),
    CancelTurn,
}

/// The campaign being played and its conversation.
#[derive(Debug)]
pub struct Session {
    pub campaign: CampaignRecord,
    pub turns: TurnController,
}

pub struct App {
    running: bool,
    component: Box<dyn Component>,

    settings: Settings,
    store: Arc<JsonCampaignStore>,
    gateway: Arc<ModelGateway>,
    session: Option<Session>,

    spinner: Spinner,

    completion_tx: mpsc::UnboundedSender<TurnCompletion>,
    completion_rx: mpsc::UnboundedReceiver<TurnCompletion>,
}

impl App {
    pub fn new(settings: Settings, gateway: Arc<ModelGateway>, store: Arc<JsonCampaignStore>) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let component = Box::new(Self::campaign_menu(&store, None));

        Self {
            running: true,
            component,
            settings,
            store,
            gateway,
            session: None,
            spinner: Spinner::new(),
            completion_tx,
            completion_rx,
        }
    }

    fn campaign_menu(store: &Arc<JsonCampaignStore>, notice: Option<Notice>) -> CampaignMenu {
        let mut catalog = CampaignCatalog::with_store(store.clone());
        let notice = match store.list_campaigns() {
            Ok(campaigns) => {
                catalog.set_campaigns(campaigns);
                notice
            }
            Err(e) => {
                log::error!("Failed to list campaigns: {e}");
                Some(Notice::error(format!("Failed to list campaigns: {e}")))
            }
        };
        let menu = CampaignMenu::new(catalog);
        match notice {
            Some(notice) => menu.with_notice(notice),
            None => menu,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub async fn run(&mut self) -> color_eyre::Result<()> {
        let mut tui = Tui::new()?.tick_rate(10.0).frame_rate(30.0);
        tui.enter()?;

        while self.running {
            tokio::select! {
                event = tui.next() => match event {
                    Some(TuiEvent::Render) | Some(TuiEvent::Init) | Some(TuiEvent::Resize(_, _)) => {
                        tui.draw(|frame| {
                            let context = Context {
                                session: self.session.as_ref(),
                                spinner: &self.spinner,
                            };
                            self.component
                                .render(frame.area(), frame.buffer_mut(), &context)
                        })?;
                    }
                    Some(event) => self.handle_tui_event(event)?,
                    None => break,
                },
                Some(completion) = self.completion_rx.recv() => self.apply_completion(completion),
            }
        }

        tui.exit()?;
        Ok(())
    }

    fn handle_tui_event(&mut self, event: TuiEvent) -> Result<()> {
        match event {
            TuiEvent::Key(key) => self.on_key(key)?,
            TuiEvent::Paste(text) => self.component.on_paste(&text),
            TuiEvent::Tick => {
                if self.session.as_ref().is_some_and(|s| s.turns.is_generating()) {
                    self.spinner.next_frame();
                }
            }
            TuiEvent::Error => log::warn!("Terminal event error"),
            TuiEvent::Init | TuiEvent::Render | TuiEvent::Resize(_, _) => {}
        }
        Ok(())
    }

    fn on_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return self.handle_action(Action::Quit);
        }
        let context = Context {
            session: self.session.as_ref(),
            spinner: &self.spinner,
        };
        if let Some(action) = self.component.on_key(key, &context) {
            self.handle_action(action)?
        }
        Ok(())
    }

    pub fn handle_action(&mut self, action: Action) -> Result<()> {
        match action {
            Action::Quit => self.quit(),
            Action::CampaignChosen(SelectionResult::Cancelled) => self.quit(),
            Action::CampaignChosen(selection) => match self.open_session(&selection) {
                Ok(session) => {
                    log::info!("Playing campaign {} ({})", session.campaign.name, session.campaign.id);
                    self.session = Some(session);
                    self.component = Box::new(GameScreen::new());
                }
                Err(e) => {
                    log::error!("Failed to open campaign: {e}");
                    let notice = Notice::error(format!("Failed to open campaign: {e}"));
                    self.component = Box::new(Self::campaign_menu(&self.store, Some(notice)));
                }
            },
            Action::SubmitTurn(input) => {
                let session = self.session.as_mut().ok_or(AppError::NoActiveSession)?;
                match session.turns.submit(&input) {
                    Submission::Started(turn) => log::debug!("Turn {turn} started"),
                    Submission::Busy => log::debug!("Input ignored while generating"),
                    Submission::Ignored => {}
                }
            }
            Action::CancelTurn => {
                if let Some(session) = self.session.as_mut() {
                    session.turns.cancel();
                }
            }
        }
        Ok(())
    }

    /// Resolves the chosen campaign through the store and starts its conversation,
    /// picking up the dialogue saved by earlier sessions.
    pub fn open_session(&self, selection: &SelectionResult) -> Result<Session> {
        let (campaign, history) = match selection {
            SelectionResult::Existing(id) => {
                let campaign = self.store.touch(id)?;
                let history = self.store.load_history(id).unwrap_or_else(|e| {
                    log::error!("Failed to load history of campaign {id}: {e}");
                    Vec::new()
                });
                (campaign, history)
            }
            SelectionResult::NewCampaign(name) => (self.store.create_campaign(name)?, Vec::new()),
            SelectionResult::Cancelled => return Err(AppError::NoActiveSession),
        };
        let turns = TurnController::resume_session(
            &self.settings.scenario,
            history,
            self.settings.context_window,
            Arc::clone(&self.gateway),
            self.completion_tx.clone(),
        );
        Ok(Session { campaign, turns })
    }

    pub fn apply_completion(&mut self, completion: TurnCompletion) {
        match self.session.as_mut() {
            Some(session) => {
                if session.turns.complete(completion) {
                    self.save_history();
                }
            }
            None => log::warn!("Completion for turn {} without a session", completion.turn),
        }
    }

    fn save_history(&self) {
        if let Some(session) = &self.session {
            let history = session.turns.transcript().history();
            if let Err(e) = self.store.save_history(&session.campaign.id, &history) {
                log::error!("Failed to save history of campaign {}: {e}", session.campaign.id);
            }
        }
    }

    fn quit(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.turns.cancel();
        }
        self.save_history();
        self.running = false;
    }
}
