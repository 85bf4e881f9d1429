use crate::categories::CategorySelection;
use crate::config::Config;
use crate::feed::{FeedSequencer, SeqCommand};
use crate::gateway::{Article, Category, Gateway, GatewayError};
use crate::playback::{MediaBackend, MediaError, MediaHandle, PlaybackController};
use crate::session::{Session, SessionStore};
use crate::theme::{ColorPalette, ThemeVariant};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// How long a status bar message stays visible.
const STATUS_TTL: Duration = Duration::from_secs(3);

// ============================================================================
// Screens and Tabs
// ============================================================================

/// Top-level screen the app is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Resolving the stored session at startup.
    Loading,
    Login,
    Register,
    /// First-run category picker, shown before the feed.
    Categories,
    /// The main tabbed surface.
    Home,
}

/// Tabs on the Home screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Feed,
    Saved,
    Categories,
    Settings,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Feed, Tab::Saved, Tab::Categories, Tab::Settings];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Feed => "Feed",
            Tab::Saved => "Saved",
            Tab::Categories => "Categories",
            Tab::Settings => "Settings",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Tab::Feed => Tab::Saved,
            Tab::Saved => Tab::Categories,
            Tab::Categories => Tab::Settings,
            Tab::Settings => Tab::Feed,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Tab::Feed => Tab::Settings,
            Tab::Saved => Tab::Feed,
            Tab::Categories => Tab::Saved,
            Tab::Settings => Tab::Categories,
        }
    }
}

// ============================================================================
// Forms
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Phone,
    Password,
}

/// Login form with per-field validity flags. Submission is blocked while
/// any field is invalid; flags clear as the user edits the field.
#[derive(Debug, Default)]
pub struct LoginForm {
    pub phone: String,
    pub password: String,
    pub focus_password: bool,
    pub invalid_phone: bool,
    pub invalid_password: bool,
    pub show_password: bool,
    pub submitting: bool,
}

impl LoginForm {
    pub fn focus(&self) -> LoginField {
        if self.focus_password {
            LoginField::Password
        } else {
            LoginField::Phone
        }
    }

    pub fn next_field(&mut self) {
        self.focus_password = !self.focus_password;
    }

    pub fn push_char(&mut self, c: char) {
        if self.focus_password {
            self.password.push(c);
            self.invalid_password = false;
        } else {
            self.phone.push(c);
            self.invalid_phone = false;
        }
    }

    pub fn backspace(&mut self) {
        if self.focus_password {
            self.password.pop();
            self.invalid_password = false;
        } else {
            self.phone.pop();
            self.invalid_phone = false;
        }
    }

    /// Set validity flags; returns true when the form may be submitted.
    pub fn validate(&mut self) -> bool {
        self.invalid_phone = !is_valid_phone(&self.phone);
        self.invalid_password = self.password.is_empty();
        !self.invalid_phone && !self.invalid_password
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterField {
    Name,
    Phone,
    Password,
    Confirm,
}

impl RegisterField {
    pub fn next(self) -> Self {
        match self {
            RegisterField::Name => RegisterField::Phone,
            RegisterField::Phone => RegisterField::Password,
            RegisterField::Password => RegisterField::Confirm,
            RegisterField::Confirm => RegisterField::Name,
        }
    }
}

#[derive(Debug)]
pub struct RegisterForm {
    pub name: String,
    pub phone: String,
    pub password: String,
    pub confirm: String,
    pub focus: RegisterField,
    pub invalid_name: bool,
    pub invalid_phone: bool,
    pub invalid_password: bool,
    pub invalid_confirm: bool,
    pub submitting: bool,
}

impl Default for RegisterForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            phone: String::new(),
            password: String::new(),
            confirm: String::new(),
            focus: RegisterField::Name,
            invalid_name: false,
            invalid_phone: false,
            invalid_password: false,
            invalid_confirm: false,
            submitting: false,
        }
    }
}

impl RegisterForm {
    pub fn next_field(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn push_char(&mut self, c: char) {
        match self.focus {
            RegisterField::Name => {
                self.name.push(c);
                self.invalid_name = false;
            }
            RegisterField::Phone => {
                self.phone.push(c);
                self.invalid_phone = false;
            }
            RegisterField::Password => {
                self.password.push(c);
                self.invalid_password = false;
            }
            RegisterField::Confirm => {
                self.confirm.push(c);
                self.invalid_confirm = false;
            }
        }
    }

    pub fn backspace(&mut self) {
        match self.focus {
            RegisterField::Name => {
                self.name.pop();
                self.invalid_name = false;
            }
            RegisterField::Phone => {
                self.phone.pop();
                self.invalid_phone = false;
            }
            RegisterField::Password => {
                self.password.pop();
                self.invalid_password = false;
            }
            RegisterField::Confirm => {
                self.confirm.pop();
                self.invalid_confirm = false;
            }
        }
    }

    pub fn validate(&mut self) -> bool {
        self.invalid_name = self.name.trim().is_empty();
        self.invalid_phone = !is_valid_phone(&self.phone);
        self.invalid_password = self.password.len() < 6;
        self.invalid_confirm = self.confirm != self.password;
        !(self.invalid_name || self.invalid_phone || self.invalid_password || self.invalid_confirm)
    }
}

fn is_valid_phone(s: &str) -> bool {
    s.len() == 10 && s.bytes().all(|b| b.is_ascii_digit())
}

// ============================================================================
// Engagement
// ============================================================================

/// Per-slot like/share counters for the mounted feed. Local-only state,
/// rebuilt whenever the feed is remounted.
#[derive(Debug, Clone, Copy, Default)]
pub struct Engagement {
    pub likes: u32,
    pub shares: u32,
}

// ============================================================================
// Events
// ============================================================================

/// Events from background tasks.
pub enum AppEvent {
    /// Stored session resolved at startup.
    SessionResolved(Option<Session>),
    LoginCompleted(Result<Session, GatewayError>),
    RegisterCompleted(Result<(), GatewayError>),
    /// Category list fetched.
    ///
    /// `generation` is the fetch counter at spawn time; stale responses
    /// are dropped.
    CategoriesLoaded {
        generation: u64,
        result: Result<Vec<Category>, GatewayError>,
    },
    /// Article list fetched.
    ArticlesLoaded {
        generation: u64,
        result: Result<Vec<Article>, GatewayError>,
    },
    /// Media resource acquired (or not) for the active item.
    MediaLoaded {
        generation: u64,
        result: Result<Box<dyn MediaHandle>, MediaError>,
    },
    /// A background task panicked.
    TaskPanicked {
        task: &'static str,
        error: String,
    },
}

// ============================================================================
// Application State
// ============================================================================

/// Central application state.
pub struct App {
    pub gateway: Gateway,
    pub session_store: SessionStore,
    pub media_backend: Arc<dyn MediaBackend>,

    // Theme
    pub theme_variant: ThemeVariant,
    pub theme: ColorPalette,

    // Navigation
    pub screen: Screen,
    pub tab: Tab,

    // Forms
    pub login_form: LoginForm,
    pub register_form: RegisterForm,

    // Session
    pub session: Option<Session>,

    // Server data. Arc so background refreshes can swap cheaply.
    pub categories: Arc<Vec<Category>>,
    pub articles: Arc<Vec<Article>>,

    // Category picking
    pub selection: CategorySelection,
    /// Cursor in the category picker list.
    pub category_cursor: usize,

    // Feed and playback
    pub sequencer: FeedSequencer,
    pub controller: PlaybackController,
    /// Like/share counters, index-parallel to the mounted feed.
    pub engagement: Vec<Engagement>,
    /// Deadline for the pending delayed autoplay, if one is scheduled.
    pub pending_autoplay: Option<Instant>,
    pub autoplay_delay: Duration,

    // Chrome
    pub status_message: Option<(Cow<'static, str>, Instant)>,
    /// Modal error text; input is routed to the dismiss handler while set.
    pub alert: Option<String>,
    /// Whether the help overlay is currently displayed.
    pub show_help: bool,
    pub needs_redraw: bool,
    pub spinner_frame: usize,
    pub fetch_in_flight: bool,
    pub should_quit: bool,

    /// Generation counter for category/article fetches. Bumped per spawn;
    /// responses carrying an older value are dropped.
    pub fetch_generation: u64,

    /// Generation counter for media loads, same scheme. The handle allows
    /// aborting a load that a rebind has already superseded.
    pub media_load_generation: u64,
    pub media_load_handle: Option<tokio::task::JoinHandle<()>>,
}

impl App {
    pub fn new(
        config: &Config,
        gateway: Gateway,
        session_store: SessionStore,
        media_backend: Arc<dyn MediaBackend>,
    ) -> Self {
        let theme_variant =
            ThemeVariant::from_str_name(&config.theme).unwrap_or(ThemeVariant::Dark);
        Self {
            gateway,
            session_store,
            media_backend: media_backend.clone(),
            theme_variant,
            theme: theme_variant.palette(),
            screen: Screen::Loading,
            tab: Tab::Feed,
            login_form: LoginForm::default(),
            register_form: RegisterForm::default(),
            session: None,
            categories: Arc::new(Vec::new()),
            articles: Arc::new(Vec::new()),
            selection: CategorySelection::new(),
            category_cursor: 0,
            sequencer: FeedSequencer::new(config.replay_count),
            controller: PlaybackController::new(media_backend),
            engagement: Vec::new(),
            pending_autoplay: None,
            autoplay_delay: Duration::from_millis(config.autoplay_delay_ms),
            status_message: None,
            alert: None,
            show_help: false,
            needs_redraw: true,
            spinner_frame: 0,
            fetch_in_flight: false,
            should_quit: false,
            fetch_generation: 0,
            media_load_generation: 0,
            media_load_handle: None,
        }
    }

    // ------------------------------------------------------------------
    // Status and alerts
    // ------------------------------------------------------------------

    /// Show a transient status bar message. Cow avoids allocation for
    /// static literals.
    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some((msg.into(), Instant::now()));
        self.needs_redraw = true;
    }

    /// Drop the status message once its TTL has passed. Called from the
    /// periodic tick.
    pub fn clear_expired_status(&mut self) {
        if let Some((_, shown_at)) = &self.status_message {
            if shown_at.elapsed() >= STATUS_TTL {
                self.status_message = None;
                self.needs_redraw = true;
            }
        }
    }

    pub fn show_alert(&mut self, text: impl Into<String>) {
        self.alert = Some(text.into());
        self.needs_redraw = true;
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
        self.needs_redraw = true;
    }

    // ------------------------------------------------------------------
    // Session transitions
    // ------------------------------------------------------------------

    /// Enter the authenticated flow with a fresh or restored session.
    pub fn enter_session(&mut self, session: Session) {
        tracing::info!(username = session.username(), "Session active");
        self.session = Some(session);
        self.login_form = LoginForm::default();
        self.register_form = RegisterForm::default();
        self.screen = Screen::Categories;
        self.needs_redraw = true;
    }

    /// Drop the session and all data derived from it, back to Login.
    pub fn logout(&mut self) {
        if let Err(e) = self.session_store.clear() {
            tracing::warn!(error = %e, "Failed to clear stored session");
        }
        self.session = None;
        self.categories = Arc::new(Vec::new());
        self.articles = Arc::new(Vec::new());
        self.selection = CategorySelection::new();
        self.category_cursor = 0;
        self.engagement.clear();
        // Invalidate any fetch still in flight so its response cannot
        // land on the Login screen with the old user's data.
        self.next_fetch_generation();
        self.fetch_in_flight = false;
        self.cancel_media_load();
        self.controller.unload();
        self.sequencer.set_feed(Vec::new());
        self.pending_autoplay = None;
        self.tab = Tab::Feed;
        self.screen = Screen::Login;
        self.set_status("Logged out");
    }

    /// Change the Home tab. Leaving the feed silences it: playback
    /// pauses and a pending delayed auto-play is dropped, so audio never
    /// runs under another tab. Returning does not auto-resume.
    pub fn switch_tab(&mut self, tab: Tab) {
        if self.tab == Tab::Feed && tab != Tab::Feed {
            self.pending_autoplay = None;
            self.controller.pause();
        }
        self.tab = tab;
    }

    // ------------------------------------------------------------------
    // Feed mounting
    // ------------------------------------------------------------------

    /// Remount the feed from the current articles and selection. Returns
    /// the sequencer's verdict so the caller can drive playback.
    pub fn remount_feed(&mut self) -> SeqCommand {
        let filtered = self.selection.filter(&self.articles);
        let command = self.sequencer.set_feed(filtered);
        if !matches!(command, SeqCommand::Idle) {
            // Identity changed: local engagement counters start over.
            self.engagement = vec![Engagement::default(); self.sequencer.len()];
        }
        self.needs_redraw = true;
        command
    }

    pub fn active_engagement(&self) -> Engagement {
        self.engagement
            .get(self.sequencer.active_index())
            .copied()
            .unwrap_or_default()
    }

    pub fn like_active(&mut self) {
        let index = self.sequencer.active_index();
        if let Some(slot) = self.engagement.get_mut(index) {
            slot.likes += 1;
            self.needs_redraw = true;
        }
    }

    pub fn share_active(&mut self) {
        let index = self.sequencer.active_index();
        if let Some(slot) = self.engagement.get_mut(index) {
            slot.shares += 1;
            self.needs_redraw = true;
        }
    }

    // ------------------------------------------------------------------
    // Generations
    // ------------------------------------------------------------------

    /// Start a new fetch epoch; any in-flight category/article response
    /// becomes stale.
    pub fn next_fetch_generation(&mut self) -> u64 {
        self.fetch_generation = self.fetch_generation.wrapping_add(1);
        self.fetch_generation
    }

    /// Start a new media-load epoch, aborting the previous load task.
    pub fn next_media_load_generation(&mut self) -> u64 {
        self.cancel_media_load();
        self.media_load_generation = self.media_load_generation.wrapping_add(1);
        self.media_load_generation
    }

    pub fn cancel_media_load(&mut self) {
        if let Some(handle) = self.media_load_handle.take() {
            handle.abort();
        }
    }

    // ------------------------------------------------------------------
    // Theme
    // ------------------------------------------------------------------

    pub fn set_theme(&mut self, variant: ThemeVariant) {
        self.theme_variant = variant;
        self.theme = variant.palette();
        self.needs_redraw = true;
    }
}

// ============================================================================
// Tests
// ============================================================================
