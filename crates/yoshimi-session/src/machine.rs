//! Per-connection session state machine.
//!
//! The machine owns one session's stage, fields and result. It never
//! performs I/O: operations that need the outside world come back as an
//! [`Effect`] for the host to carry out, and the host reports the result
//! through [`SessionMachine::complete`].

use std::sync::Arc;

use tracing::debug;

use yoshimi_core::{ActionResult, Dimensions, FeatureSet, Key, ServerConfig, Stage};

use crate::field::TextField;

/// Placeholder of the secret field before any attempt.
pub const SECRET_PLACEHOLDER: &str = "?";
/// Placeholder of the secret field after a wrong attempt.
pub const SECRET_RETRY_PLACEHOLDER: &str = "!?";

/// Input delivered to a session, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// A decoded key from the client terminal
    KeyPress(Key),
    /// The client terminal changed size
    Resize(Dimensions),
    /// The connection or channel went away
    ConnectionClosed,
}

/// Work the machine asks its host to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Run the configured script with the form values
    RunScript {
        /// Title field value
        title: String,
        /// Body field value
        body: String,
    },
    /// Read the configured public key file
    ReadPublicKey,
    /// Run the typing benchmark command
    LaunchTyping,
    /// End the session
    Quit,
}

/// Focusable elements of the form, in tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Focus {
    /// Title field
    Title,
    /// Body field
    Body,
    /// Submit control
    Submit,
}

impl Focus {
    const ORDER: [Focus; 3] = [Focus::Title, Focus::Body, Focus::Submit];

    fn index(self) -> usize {
        match self {
            Focus::Title => 0,
            Focus::Body => 1,
            Focus::Submit => 2,
        }
    }

    /// Next element, wrapping from Submit to Title.
    pub fn next(self) -> Self {
        Self::ORDER[(self.index() + 1) % Self::ORDER.len()]
    }

    /// Previous element, wrapping from Title to Submit.
    pub fn prev(self) -> Self {
        Self::ORDER[(self.index() + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }
}

/// Entries of the action menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    /// Open the title/body form
    Notify,
    /// Show the server's public key
    SshKey,
    /// Run the typing benchmark
    Typing,
}

impl MenuAction {
    /// Menu entries in display order.
    pub const ALL: [MenuAction; 3] = [MenuAction::Notify, MenuAction::SshKey, MenuAction::Typing];

    /// Text shown in the menu.
    pub fn label(self) -> &'static str {
        match self {
            MenuAction::Notify => "notify",
            MenuAction::SshKey => "ssh key",
            MenuAction::Typing => "typing",
        }
    }
}

/// Immutable per-process settings a machine needs.
#[derive(Debug, Clone)]
pub struct MachineConfig {
    /// Phrase compared verbatim against the secret field
    pub secret: String,
    /// Optional features
    pub features: FeatureSet,
    /// Visible width of the secret field
    pub secret_width: u16,
    /// Width of the box the secret field is centered in
    pub secret_box_width: u16,
    /// Visible width of the title and body fields
    pub field_width: u16,
}

impl MachineConfig {
    /// Settings with default widths.
    pub fn new(secret: impl Into<String>, features: FeatureSet) -> Self {
        let terminal = yoshimi_core::TerminalSettings::default();
        Self {
            secret: secret.into(),
            features,
            secret_width: terminal.secret_width,
            secret_box_width: terminal.secret_box_width,
            field_width: terminal.field_width,
        }
    }
}

impl From<&ServerConfig> for MachineConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            secret: config.gate.secret.clone(),
            features: config.features,
            secret_width: config.terminal.secret_width,
            secret_box_width: config.terminal.secret_box_width,
            field_width: config.terminal.field_width,
        }
    }
}

/// State of one interactive session.
#[derive(Debug, Clone)]
pub struct SessionMachine {
    config: Arc<MachineConfig>,
    stage: Stage,
    secret: TextField,
    menu_cursor: usize,
    title: TextField,
    body: TextField,
    focus: Focus,
    last_result: Option<ActionResult>,
    terminal_size: Option<Dimensions>,
    awaiting_result: bool,
    finished: bool,
}

impl SessionMachine {
    /// Create a machine at the secret gate.
    pub fn new(config: Arc<MachineConfig>) -> Self {
        let mut secret = TextField::new(SECRET_PLACEHOLDER, config.secret_width).masked('*');
        secret.focus();
        let title = TextField::new("title", config.field_width);
        let body =
            TextField::new("body", config.field_width).multiline(config.features.multiline_body);

        Self {
            config,
            stage: Stage::AwaitingSecret,
            secret,
            menu_cursor: 0,
            title,
            body,
            focus: Focus::Title,
            last_result: None,
            terminal_size: None,
            awaiting_result: false,
            finished: false,
        }
    }

    /// Apply one event and return the effect it requests, if any.
    pub fn handle(&mut self, event: InputEvent) -> Option<Effect> {
        match event {
            InputEvent::Resize(dims) => {
                self.terminal_size = Some(dims);
                None
            }
            InputEvent::ConnectionClosed => {
                self.finished = true;
                Some(Effect::Quit)
            }
            InputEvent::KeyPress(key) => {
                if key.is_interrupt() {
                    self.finished = true;
                    return Some(Effect::Quit);
                }
                if self.finished || self.awaiting_result {
                    return None;
                }
                match self.stage {
                    Stage::AwaitingSecret => self.handle_secret(&key),
                    Stage::MenuSelection => self.handle_menu(&key),
                    Stage::EditingForm => self.handle_form(&key),
                    Stage::ShowingResult => None,
                }
            }
        }
    }

    /// Record the result of a requested effect and show it.
    ///
    /// Returns `false` (and changes nothing) when no effect was pending or a
    /// result was already recorded.
    pub fn complete(&mut self, result: ActionResult) -> bool {
        if !self.awaiting_result || self.last_result.is_some() {
            return false;
        }
        self.awaiting_result = false;
        self.last_result = Some(result);
        self.enter(Stage::ShowingResult);
        true
    }

    fn handle_secret(&mut self, key: &Key) -> Option<Effect> {
        if *key != Key::Enter {
            self.secret.handle_key(key);
            return None;
        }

        if self.secret.value() == self.config.secret {
            self.secret.clear();
            self.secret.blur();
            if self.config.features.has_menu {
                self.enter(Stage::MenuSelection);
            } else {
                self.open_form();
            }
        } else {
            // No attempt limit: every wrong guess just resets the field.
            self.secret.clear();
            self.secret.set_placeholder(SECRET_RETRY_PLACEHOLDER);
        }
        None
    }

    fn handle_menu(&mut self, key: &Key) -> Option<Effect> {
        match key {
            Key::Up => {
                self.menu_cursor = self.menu_cursor.saturating_sub(1);
                None
            }
            Key::Down => {
                self.menu_cursor = (self.menu_cursor + 1).min(MenuAction::ALL.len() - 1);
                None
            }
            Key::Enter => match MenuAction::ALL[self.menu_cursor] {
                MenuAction::Notify => {
                    self.open_form();
                    None
                }
                MenuAction::SshKey => self.request(Effect::ReadPublicKey),
                MenuAction::Typing => self.request(Effect::LaunchTyping),
            },
            _ => None,
        }
    }

    fn handle_form(&mut self, key: &Key) -> Option<Effect> {
        if *key == Key::Tab {
            self.set_focus(self.focus.next());
            return None;
        }
        if key.is_back_tab() {
            self.set_focus(self.focus.prev());
            return None;
        }

        match self.focus {
            Focus::Submit if *key == Key::Enter => self.request(Effect::RunScript {
                title: self.title.value(),
                body: self.body.value(),
            }),
            Focus::Submit => None,
            Focus::Title => {
                self.title.handle_key(key);
                None
            }
            Focus::Body => {
                self.body.handle_key(key);
                None
            }
        }
    }

    fn request(&mut self, effect: Effect) -> Option<Effect> {
        self.awaiting_result = true;
        Some(effect)
    }

    fn open_form(&mut self) {
        self.enter(Stage::EditingForm);
        self.set_focus(Focus::Title);
    }

    fn set_focus(&mut self, focus: Focus) {
        self.focus = focus;
        self.title.blur();
        self.body.blur();
        match focus {
            Focus::Title => self.title.focus(),
            Focus::Body => self.body.focus(),
            Focus::Submit => {}
        }
    }

    fn enter(&mut self, stage: Stage) {
        debug!("Session stage: {} -> {}", self.stage, stage);
        self.stage = stage;
    }

    /// Current stage.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Focused form element; `None` outside the form stage.
    pub fn focus(&self) -> Option<Focus> {
        (self.stage == Stage::EditingForm).then_some(self.focus)
    }

    /// Text currently typed into the secret field.
    pub fn secret_attempt(&self) -> String {
        self.secret.value()
    }

    /// Selected menu entry.
    pub fn menu_cursor(&self) -> usize {
        self.menu_cursor
    }

    /// Title field value.
    pub fn title(&self) -> String {
        self.title.value()
    }

    /// Body field value.
    pub fn body(&self) -> String {
        self.body.value()
    }

    /// Recorded result; set once the session reaches [`Stage::ShowingResult`].
    pub fn last_result(&self) -> Option<&ActionResult> {
        self.last_result.as_ref()
    }

    /// Most recently reported terminal size.
    pub fn terminal_size(&self) -> Option<Dimensions> {
        self.terminal_size
    }

    /// Whether an effect has been requested and not yet completed.
    pub fn is_awaiting_result(&self) -> bool {
        self.awaiting_result
    }

    /// Whether the session asked to end.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Shared settings.
    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub(crate) fn secret_field(&self) -> &TextField {
        &self.secret
    }

    pub(crate) fn title_field(&self) -> &TextField {
        &self.title
    }

    pub(crate) fn body_field(&self) -> &TextField {
        &self.body
    }
}
