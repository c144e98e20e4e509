use std::collections::HashMap;
use std::io::stdout;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Position, Rect};
use ratatui::Terminal;
use ratatui_image::{picker::Picker, protocol::StatefulProtocol};
use tui_widgets::popup::PopupState;

use crate::config::{Config, UiColors};
use crate::fetch::{LoadEvent, UserSource};
use crate::photo::PhotoWorker;

use super::draw;
use super::gallery::CardHandle;
use super::modal::ModalState;
use super::search::SearchBox;
use super::session::{Action, Outcome, Session};

const DEFAULT_FONT_SIZE: (u16, u16) = (8, 16);
const TICK: Duration = Duration::from_millis(100);

fn create_image_picker() -> Picker {
    let mut picker = base_picker();
    picker.guess_protocol();
    picker
}

#[cfg(unix)]
fn base_picker() -> Picker {
    Picker::from_termios().unwrap_or_else(|_| Picker::new(DEFAULT_FONT_SIZE))
}

#[cfg(not(unix))]
fn base_picker() -> Picker {
    Picker::new(DEFAULT_FONT_SIZE)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Gallery,
    Search,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Pending,
    Loaded(usize),
    Failed(String),
}

pub enum Portrait {
    Pending,
    Ready(Box<dyn StatefulProtocol>),
    Missing,
}

/// A section in the help popup (e.g., "Gallery", "Modal")
pub struct HelpSection {
    pub title: &'static str,
    pub entries: Vec<HelpEntry>,
}

/// A single help entry (action name + key bindings)
pub struct HelpEntry {
    pub action: &'static str,
    pub keys: String,
}

pub struct App<'a> {
    config: &'a Config,
    source: String,
    events: Receiver<LoadEvent>,
    photos: Option<PhotoWorker>,
    pub session: Session,
    pub search: SearchBox,
    pub focus: Focus,
    pub cursor: Option<CardHandle>,
    pub load_state: LoadState,
    pub status: Option<String>,
    pub show_help: bool,
    image_picker: Picker,
    portraits: HashMap<String, Portrait>,
    // Card rectangles from the last draw, used for mouse hit-testing
    pub card_areas: Vec<(Rect, CardHandle)>,
    pub search_area: Rect,
    // First grid row drawn
    pub gallery_scroll: usize,
    // Popup state for the loading / failure notice (tui-widgets popup)
    pub notice_popup: PopupState,
}

impl<'a> App<'a> {
    /// Build the search line and modal chrome right away; cards arrive later
    /// through `events`.
    pub fn new(
        config: &'a Config,
        source: &UserSource,
        events: Receiver<LoadEvent>,
        photos: Option<PhotoWorker>,
    ) -> Self {
        Self {
            config,
            source: source.describe(),
            events,
            photos,
            session: Session::new(),
            search: SearchBox::default(),
            focus: Focus::Gallery,
            cursor: None,
            load_state: LoadState::Pending,
            status: None,
            show_help: false,
            image_picker: create_image_picker(),
            portraits: HashMap::new(),
            card_areas: Vec::new(),
            search_area: Rect::default(),
            gallery_scroll: 0,
            notice_popup: PopupState::default(),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode().context("failed to enable raw mode")?;
        let mut stdout = stdout();
        stdout.execute(EnterAlternateScreen)?;
        stdout.execute(EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(DisableMouseCapture)?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop<B>(&mut self, terminal: &mut Terminal<B>) -> Result<()>
    where
        B: ratatui::backend::Backend,
    {
        loop {
            while let Ok(load_event) = self.events.try_recv() {
                self.handle_load_event(load_event);
            }

            draw::render(terminal, self)?;

            if event::poll(TICK)? {
                match event::read()? {
                    Event::Key(key) => {
                        if self.handle_key(key) {
                            break;
                        }
                    }
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    _ => {}
                }
            }
        }
        tracing::info!("leaving gallery");
        Ok(())
    }

    pub fn config(&self) -> &'a Config {
        self.config
    }

    pub fn ui_colors(&self) -> &'a UiColors {
        &self.config.ui.colors
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn portrait_mut(&mut self, url: &str) -> Option<&mut Portrait> {
        self.portraits.get_mut(url)
    }

    // =========================================================================
    // Background results
    // =========================================================================

    fn handle_load_event(&mut self, load_event: LoadEvent) {
        match load_event {
            LoadEvent::Users(Ok(users)) => {
                let count = users.len();
                self.session.load(users);
                self.load_state = LoadState::Loaded(count);
                self.cursor = self.session.gallery().step(None, 0);
                let urls: Vec<String> = self
                    .session
                    .gallery()
                    .cards()
                    .iter()
                    .map(|card| card.image_url.clone())
                    .collect();
                for url in urls {
                    self.request_portrait(&url);
                }
                self.set_status(format!("Loaded {count} users"));
            }
            LoadEvent::Users(Err(err)) => {
                // already logged by the fetch thread
                self.load_state = LoadState::Failed(err.to_string());
                self.set_status(format!("Fetch failed: {err}"));
            }
            LoadEvent::Photo { url, result } => {
                let portrait = match result {
                    Ok(image) => Portrait::Ready(self.image_picker.new_resize_protocol(image)),
                    Err(_) => Portrait::Missing,
                };
                self.portraits.insert(url, portrait);
            }
        }
    }

    fn request_portrait(&mut self, url: &str) {
        let Some(worker) = &self.photos else {
            return;
        };
        if url.is_empty() || self.portraits.contains_key(url) {
            return;
        }
        self.portraits.insert(url.to_string(), Portrait::Pending);
        worker.request(url);
    }

    // =========================================================================
    // Actions
    // =========================================================================

    fn perform(&mut self, action: Action) {
        match self.session.dispatch(action) {
            Ok(Outcome::Modal(ModalState::Visible(index))) => {
                if let Some(url) = self
                    .session
                    .modal()
                    .detail()
                    .map(|detail| detail.image_url.clone())
                {
                    self.request_portrait(&url);
                }
                let total = self.session.store().len();
                self.set_status(format!("User {} of {}", index + 1, total));
            }
            Ok(Outcome::Modal(ModalState::Hidden)) => {}
            Ok(Outcome::Filtered { visible }) => {
                self.cursor = self.session.gallery().step(self.cursor, 0);
                self.gallery_scroll = 0;
                let total = self.session.gallery().cards().len();
                self.set_status(format!("{visible} of {total} users shown"));
            }
            Err(err) => {
                tracing::warn!(error = %err, "action ignored");
                self.set_status("Nothing to show yet");
            }
        }
    }

    fn move_cursor(&mut self, delta: isize) {
        self.cursor = self.session.gallery().step(self.cursor, delta);
    }

    fn columns(&self) -> isize {
        self.config.ui.gallery.columns.max(1) as isize
    }

    fn set_status<S: Into<String>>(&mut self, message: S) {
        self.status = Some(message.into());
    }

    // =========================================================================
    // Keyboard
    // =========================================================================

    /// Returns true when the application should exit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press {
            return false;
        }

        // Ctrl+C always quits (hardcoded for safety)
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            return true;
        }

        if self.show_help {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('q'))
                || key_matches_any(&key, &self.config.keys.global.help)
            {
                self.show_help = false;
            }
            return false;
        }

        if self.session.modal().is_visible() {
            self.handle_modal_key(key);
            return false;
        }

        match self.focus {
            Focus::Search => {
                self.handle_search_key(key);
                false
            }
            Focus::Gallery => self.handle_gallery_key(key),
        }
    }

    fn handle_modal_key(&mut self, key: KeyEvent) {
        let keys = &self.config().keys.modal;
        if key_matches_any(&key, &keys.close) {
            self.perform(Action::Close);
            self.status = None;
        } else if key_matches_any(&key, &keys.next) {
            self.perform(Action::Next);
        } else if key_matches_any(&key, &keys.prev) {
            self.perform(Action::Prev);
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        let keys = &self.config().keys.search_input;

        if key_matches_any(&key, &keys.cancel) {
            self.focus = Focus::Gallery;
            return;
        }

        // Submit runs the same filter as typing, then hands focus back
        if key_matches_any(&key, &keys.submit) {
            self.perform(Action::Search(self.search.value().to_string()));
            self.focus = Focus::Gallery;
            return;
        }

        if let Some(true) = self.search.handle_key_event(key) {
            self.perform(Action::Search(self.search.value().to_string()));
        }
    }

    fn handle_gallery_key(&mut self, key: KeyEvent) -> bool {
        let global = &self.config().keys.global;
        let gallery = &self.config().keys.gallery;

        if key_matches_any(&key, &global.quit) {
            return true;
        }
        if key_matches_any(&key, &global.search) {
            self.focus = Focus::Search;
        } else if key_matches_any(&key, &global.help) {
            self.show_help = true;
        } else if key_matches_any(&key, &gallery.open) {
            match self.cursor {
                Some(handle) => self.perform(Action::Open(handle)),
                None => self.set_status("No card selected"),
            }
        } else if key_matches_any(&key, &gallery.next) {
            self.move_cursor(1);
        } else if key_matches_any(&key, &gallery.prev) {
            self.move_cursor(-1);
        } else if key_matches_any(&key, &gallery.down) {
            self.move_cursor(self.columns());
        } else if key_matches_any(&key, &gallery.up) {
            self.move_cursor(-self.columns());
        }
        false
    }

    // =========================================================================
    // Mouse
    // =========================================================================

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if self.show_help || self.session.modal().is_visible() {
            return;
        }
        let position = Position::new(mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if self.search_area.contains(position) {
                    self.focus = Focus::Search;
                } else if let Some(handle) = hit_test(&self.card_areas, position) {
                    self.focus = Focus::Gallery;
                    self.cursor = Some(handle);
                    self.perform(Action::Open(handle));
                }
            }
            MouseEventKind::ScrollDown => self.move_cursor(self.columns()),
            MouseEventKind::ScrollUp => self.move_cursor(-self.columns()),
            _ => {}
        }
    }

    // =========================================================================
    // Help
    // =========================================================================

    /// Generate help content from current keybindings configuration
    pub fn help_entries(&self) -> Vec<HelpSection> {
        let keys = &self.config.keys;
        vec![
            HelpSection {
                title: "Global",
                entries: vec![
                    HelpEntry { action: "Quit", keys: keys.global.quit.join(", ") },
                    HelpEntry { action: "Search", keys: keys.global.search.join(", ") },
                    HelpEntry { action: "Help", keys: keys.global.help.join(", ") },
                ],
            },
            HelpSection {
                title: "Search",
                entries: vec![
                    HelpEntry { action: "Apply", keys: keys.search_input.submit.join(", ") },
                    HelpEntry { action: "Back to cards", keys: keys.search_input.cancel.join(", ") },
                ],
            },
            HelpSection {
                title: "Gallery",
                entries: vec![
                    HelpEntry { action: "Open card", keys: keys.gallery.open.join(", ") },
                    HelpEntry { action: "Next card", keys: keys.gallery.next.join(", ") },
                    HelpEntry { action: "Previous card", keys: keys.gallery.prev.join(", ") },
                    HelpEntry { action: "Row down", keys: keys.gallery.down.join(", ") },
                    HelpEntry { action: "Row up", keys: keys.gallery.up.join(", ") },
                ],
            },
            HelpSection {
                title: "Details",
                entries: vec![
                    HelpEntry { action: "Next user", keys: keys.modal.next.join(", ") },
                    HelpEntry { action: "Previous user", keys: keys.modal.prev.join(", ") },
                    HelpEntry { action: "Close", keys: keys.modal.close.join(", ") },
                ],
            },
        ]
    }
}

pub fn hit_test(areas: &[(Rect, CardHandle)], position: Position) -> Option<CardHandle> {
    areas
        .iter()
        .find(|(area, _)| area.contains(position))
        .map(|(_, handle)| *handle)
}

/// Check if the key event matches any of the bindings in the list
pub fn key_matches_any(event: &KeyEvent, bindings: &[String]) -> bool {
    bindings.iter().any(|b| key_matches_single(event, b))
}

/// Check if the key event matches a single binding string
pub fn key_matches_single(event: &KeyEvent, binding: &str) -> bool {
    let trimmed = binding.trim();
    if trimmed.is_empty() {
        return false;
    }

    // Disallow Ctrl/Alt/Super modifiers (we don't support them)
    let disallowed = KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER;
    if event.modifiers.intersects(disallowed) {
        return false;
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "enter" => matches!(event.code, KeyCode::Enter),
        "tab" => matches!(event.code, KeyCode::Tab),
        "backtab" | "shift+tab" => matches!(event.code, KeyCode::BackTab),
        "backspace" => matches!(event.code, KeyCode::Backspace),
        "esc" | "escape" => matches!(event.code, KeyCode::Esc),
        "space" => matches!(event.code, KeyCode::Char(' ')),
        "up" => matches!(event.code, KeyCode::Up),
        "down" => matches!(event.code, KeyCode::Down),
        "left" => matches!(event.code, KeyCode::Left),
        "right" => matches!(event.code, KeyCode::Right),
        "pageup" | "page_up" => matches!(event.code, KeyCode::PageUp),
        "pagedown" | "page_down" => matches!(event.code, KeyCode::PageDown),
        "home" => matches!(event.code, KeyCode::Home),
        "end" => matches!(event.code, KeyCode::End),
        name if name.len() > 1 && name.starts_with('f') => name[1..]
            .parse::<u8>()
            .map(|n| matches!(event.code, KeyCode::F(code) if code == n))
            .unwrap_or(false),
        // Single character - case-sensitive (m != M, since M requires Shift)
        _ => {
            let mut chars = trimmed.chars();
            if let (Some(first), None) = (chars.next(), chars.next()) {
                matches!(event.code, KeyCode::Char(c) if c == first)
            } else {
                false
            }
        }
    }
}
