//! Application state management for the postboard terminal client.
//!
//! This module contains the core `App` struct: the current route and its
//! guard, form state for each screen, the dashboard's post list, and the
//! background task channel that delivers post API results.

use std::path::PathBuf;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use postboard_core::auth::SessionStore;
use postboard_core::config::Config;
use postboard_core::forms::{can_add_char, Field, FormErrors, LoginForm, PostForm, RegisterForm};
use postboard_core::models::Post;
use postboard_core::routes::{AUTHENTICATED_LANDING, UNAUTHENTICATED_ENTRY};
use postboard_core::{ApiClient, ApiError, GuardView, Route, RouteGuard, Session};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task message channel.
const CHANNEL_BUFFER_SIZE: usize = 16;

// ============================================================================
// UI State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppState {
    Normal,
    /// Waiting for the user to confirm deleting this post id
    ConfirmingDelete(i64),
    ConfirmingQuit,
    Quitting,
}

/// Login form focus state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoginFocus {
    EmailOrUsername,
    Password,
    Button,
    RegisterLink,
}

impl LoginFocus {
    pub fn next(self) -> Self {
        match self {
            LoginFocus::EmailOrUsername => LoginFocus::Password,
            LoginFocus::Password => LoginFocus::Button,
            LoginFocus::Button => LoginFocus::RegisterLink,
            LoginFocus::RegisterLink => LoginFocus::EmailOrUsername,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            LoginFocus::EmailOrUsername => LoginFocus::RegisterLink,
            LoginFocus::Password => LoginFocus::EmailOrUsername,
            LoginFocus::Button => LoginFocus::Password,
            LoginFocus::RegisterLink => LoginFocus::Button,
        }
    }

    pub fn field(self) -> Option<Field> {
        match self {
            LoginFocus::EmailOrUsername => Some(Field::EmailOrUsername),
            LoginFocus::Password => Some(Field::Password),
            LoginFocus::Button | LoginFocus::RegisterLink => None,
        }
    }
}

/// Register form focus state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegisterFocus {
    Email,
    Username,
    Password,
    Button,
    LoginLink,
}

impl RegisterFocus {
    pub fn next(self) -> Self {
        match self {
            RegisterFocus::Email => RegisterFocus::Username,
            RegisterFocus::Username => RegisterFocus::Password,
            RegisterFocus::Password => RegisterFocus::Button,
            RegisterFocus::Button => RegisterFocus::LoginLink,
            RegisterFocus::LoginLink => RegisterFocus::Email,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            RegisterFocus::Email => RegisterFocus::LoginLink,
            RegisterFocus::Username => RegisterFocus::Email,
            RegisterFocus::Password => RegisterFocus::Username,
            RegisterFocus::Button => RegisterFocus::Password,
            RegisterFocus::LoginLink => RegisterFocus::Button,
        }
    }

    pub fn field(self) -> Option<Field> {
        match self {
            RegisterFocus::Email => Some(Field::Email),
            RegisterFocus::Username => Some(Field::Username),
            RegisterFocus::Password => Some(Field::Password),
            RegisterFocus::Button | RegisterFocus::LoginLink => None,
        }
    }
}

/// Dashboard focus state. `Posts` is also the navigation mode where the
/// sidebar shortcuts are active.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DashboardFocus {
    Title,
    Content,
    Publish,
    Posts,
}

impl DashboardFocus {
    pub fn next(self) -> Self {
        match self {
            DashboardFocus::Title => DashboardFocus::Content,
            DashboardFocus::Content => DashboardFocus::Publish,
            DashboardFocus::Publish => DashboardFocus::Posts,
            DashboardFocus::Posts => DashboardFocus::Title,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            DashboardFocus::Title => DashboardFocus::Posts,
            DashboardFocus::Content => DashboardFocus::Title,
            DashboardFocus::Publish => DashboardFocus::Content,
            DashboardFocus::Posts => DashboardFocus::Publish,
        }
    }

    pub fn field(self) -> Option<Field> {
        match self {
            DashboardFocus::Title => Some(Field::Title),
            DashboardFocus::Content => Some(Field::Content),
            DashboardFocus::Publish | DashboardFocus::Posts => None,
        }
    }
}

// ============================================================================
// Background Task Results
// ============================================================================

/// Results of post API calls made off the input loop.
enum BackgroundResult {
    Posts(Result<Vec<Post>, ApiError>),
    PostCreated(Result<Post, ApiError>),
    PostDeleted(i64, Result<(), ApiError>),
}

/// A background result tagged with the mount that requested it.
struct MountedResult {
    mount: u64,
    result: BackgroundResult,
}

// ============================================================================
// App
// ============================================================================

/// Main application state container
pub struct App {
    // Core services
    pub config: Config,
    pub session: SessionStore,
    pub api: ApiClient,

    // Navigation
    pub route: Route,
    guard: Option<RouteGuard>,
    /// Bumped on every navigation; results from older mounts are dropped
    mount: u64,
    /// Session snapshot the guard last rendered with; `None` means the
    /// protected screen must draw nothing
    pub protected: Option<Session>,
    pub state: AppState,

    // Login form state
    pub login_form: LoginForm,
    pub login_focus: LoginFocus,
    pub login_errors: FormErrors,
    pub login_error: Option<String>,

    // Register form state
    pub register_form: RegisterForm,
    pub register_focus: RegisterFocus,
    pub register_errors: FormErrors,
    pub register_error: Option<String>,

    // Dashboard state
    pub posts: Vec<Post>,
    pub posts_loading: bool,
    pub post_form: PostForm,
    pub post_errors: FormErrors,
    pub dashboard_focus: DashboardFocus,
    pub post_selection: usize,
    posts_requested: bool,

    // Background task channel
    task_rx: mpsc::Receiver<MountedResult>,
    task_tx: mpsc::Sender<MountedResult>,

    // Status message
    pub status_message: Option<String>,
}

impl App {
    /// Create a new application instance. The session is not restored yet;
    /// call `restore_session` once the terminal is ready.
    pub fn new(config: Config, data_dir: PathBuf) -> Result<Self> {
        let storage = config.session_storage(data_dir);
        let session = SessionStore::new(storage);
        let api = ApiClient::new(config.api_base_url.clone(), session.clone())?;
        debug!(base_url = api.base_url(), storage = ?config.storage, "API client configured");

        Ok(Self::with_services(config, session, api))
    }

    /// Build the app around already constructed services.
    pub fn with_services(config: Config, session: SessionStore, api: ApiClient) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        let login_form = LoginForm {
            email_or_username: config.last_username.clone().unwrap_or_default(),
            password: String::new(),
        };
        let login_focus = if login_form.email_or_username.is_empty() {
            LoginFocus::EmailOrUsername
        } else {
            LoginFocus::Password
        };

        let mut app = Self {
            config,
            session,
            api,

            route: AUTHENTICATED_LANDING,
            guard: None,
            mount: 0,
            protected: None,
            state: AppState::Normal,

            login_form,
            login_focus,
            login_errors: FormErrors::default(),
            login_error: None,

            register_form: RegisterForm::default(),
            register_focus: RegisterFocus::Email,
            register_errors: FormErrors::default(),
            register_error: None,

            posts: Vec::new(),
            posts_loading: false,
            post_form: PostForm::default(),
            post_errors: FormErrors::default(),
            dashboard_focus: DashboardFocus::Posts,
            post_selection: 0,
            posts_requested: false,

            task_rx: rx,
            task_tx: tx,

            status_message: None,
        };
        app.navigate(AUTHENTICATED_LANDING);
        app
    }

    /// Load the persisted session. Protected screens stay blank until this runs.
    pub fn restore_session(&self) {
        let outcome = self.session.restore();
        info!(?outcome, "Session restored");
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Switch screens. Protected routes get a freshly mounted guard.
    pub fn navigate(&mut self, route: Route) {
        debug!(from = self.route.path(), to = route.path(), "Navigate");
        self.route = route;
        self.mount = self.mount.wrapping_add(1);
        self.protected = None;
        self.state = AppState::Normal;
        self.guard = if route.is_protected() {
            Some(RouteGuard::mount(&self.session))
        } else {
            None
        };

        // Posts belong to the session that loaded them
        if !route.is_protected() {
            self.clear_posts();
        }

        match route {
            Route::Dashboard => {
                self.posts_requested = false;
                self.dashboard_focus = DashboardFocus::Posts;
            }
            Route::Login => {
                self.login_form.password.clear();
                self.login_errors = FormErrors::default();
                self.login_error = None;
            }
            Route::Register => {
                self.register_form.password.clear();
                self.register_errors = FormErrors::default();
                self.register_error = None;
            }
            Route::Profile => {}
        }
    }

    /// Re-evaluate the active guard. Called before every frame.
    pub fn tick(&mut self) {
        let Some(guard) = self.guard.as_mut() else {
            return;
        };

        match guard.render(|session| session.clone()) {
            GuardView::Pending => self.protected = None,
            GuardView::Redirect(target) => {
                debug!(from = self.route.path(), to = target.path(), "Guard redirect");
                self.navigate(target);
            }
            GuardView::Content(session) => {
                self.protected = Some(session);
                if self.route == Route::Dashboard && !self.posts_requested {
                    self.posts_requested = true;
                    self.fetch_posts_background();
                }
            }
        }
    }

    /// Whether a text field currently has focus (shortcuts are disabled)
    pub fn editing_text(&self) -> bool {
        match self.route {
            Route::Login => self.login_focus.field().is_some(),
            Route::Register => self.register_focus.field().is_some(),
            Route::Dashboard => self.dashboard_focus.field().is_some(),
            Route::Profile => false,
        }
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Attempt login with the credentials from the login form
    pub async fn attempt_login(&mut self) -> Result<()> {
        self.login_error = None;
        if let Err(errors) = self.login_form.validate() {
            self.login_errors = errors;
            return Err(anyhow::anyhow!("Login form is invalid"));
        }
        self.login_errors = FormErrors::default();

        let username = self.login_form.email_or_username.trim().to_string();
        let password = self.login_form.password.clone();
        match self.api.login(&username, &password).await {
            Ok(identity) => {
                info!(user = %identity.username, "Login successful");
                self.remember_username(username);
                self.login_form.password.clear();
                self.navigate(AUTHENTICATED_LANDING);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Login failed");
                self.login_error = Some(e.user_message());
                Err(e.into())
            }
        }
    }

    /// Register a new account and log straight in
    pub async fn attempt_register(&mut self) -> Result<()> {
        self.register_error = None;
        if let Err(errors) = self.register_form.validate() {
            self.register_errors = errors;
            return Err(anyhow::anyhow!("Register form is invalid"));
        }
        self.register_errors = FormErrors::default();

        let email = self.register_form.email.trim().to_string();
        let username = self.register_form.username.trim().to_string();
        let password = self.register_form.password.clone();
        match self.api.register(&email, &username, &password).await {
            Ok(identity) => {
                info!(user = %identity.username, "Registration successful");
                self.remember_username(email);
                self.register_form = RegisterForm::default();
                self.navigate(AUTHENTICATED_LANDING);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Registration failed");
                self.register_error = Some(e.user_message());
                Err(e.into())
            }
        }
    }

    fn remember_username(&mut self, username: String) {
        self.config.last_username = Some(username);
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }

    /// Explicit logout from the sidebar
    pub fn logout(&mut self) {
        self.session.logout();
        self.navigate(UNAUTHENTICATED_ENTRY);
    }

    // =========================================================================
    // Posts
    // =========================================================================

    fn clear_posts(&mut self) {
        self.posts.clear();
        self.post_selection = 0;
        self.posts_loading = false;
    }

    pub fn fetch_posts_background(&mut self) {
        let api = self.api.clone();
        let tx = self.task_tx.clone();
        let mount = self.mount;
        self.posts_loading = true;

        tokio::spawn(async move {
            let result = BackgroundResult::Posts(api.list_posts().await);
            let _ = tx.send(MountedResult { mount, result }).await;
        });
    }

    /// Validate the create form and submit it
    pub fn submit_post(&mut self) {
        let new_post = match self.post_form.to_new_post() {
            Ok(post) => post,
            Err(errors) => {
                self.post_errors = errors;
                return;
            }
        };
        self.post_errors = FormErrors::default();

        let api = self.api.clone();
        let tx = self.task_tx.clone();
        let mount = self.mount;
        self.status_message = Some("Publishing...".to_string());

        tokio::spawn(async move {
            let result = BackgroundResult::PostCreated(api.create_post(&new_post).await);
            let _ = tx.send(MountedResult { mount, result }).await;
        });
    }

    /// Ask for confirmation before deleting the selected post
    pub fn request_delete(&mut self) {
        if let Some(post) = self.posts.get(self.post_selection) {
            self.state = AppState::ConfirmingDelete(post.id);
        }
    }

    pub fn delete_post(&mut self, id: i64) {
        let api = self.api.clone();
        let tx = self.task_tx.clone();
        let mount = self.mount;

        tokio::spawn(async move {
            let result = BackgroundResult::PostDeleted(id, api.delete_post(id).await);
            let _ = tx.send(MountedResult { mount, result }).await;
        });
    }

    pub fn select_next_post(&mut self) {
        if !self.posts.is_empty() {
            self.post_selection = (self.post_selection + 1).min(self.posts.len() - 1);
        }
    }

    pub fn select_prev_post(&mut self) {
        self.post_selection = self.post_selection.saturating_sub(1);
    }

    // =========================================================================
    // Background Tasks
    // =========================================================================

    /// Drain finished background calls.
    pub fn check_background_tasks(&mut self) {
        let mut results = Vec::new();
        while let Ok(result) = self.task_rx.try_recv() {
            results.push(result);
        }
        for result in results {
            self.process_background_result(result);
        }
    }

    fn process_background_result(&mut self, MountedResult { mount, result }: MountedResult) {
        // A response can land after the user has left the dashboard mount
        // that asked for it. Its session side effects already happened in the
        // API client; the data is dropped.
        if mount != self.mount || self.route != Route::Dashboard {
            debug!(mount, current = self.mount, "Dropping background result for inactive mount");
            return;
        }

        match result {
            BackgroundResult::Posts(Ok(posts)) => {
                self.posts = posts;
                self.posts_loading = false;
                self.post_selection = self.post_selection.min(self.posts.len().saturating_sub(1));
            }
            BackgroundResult::Posts(Err(e)) => {
                self.posts_loading = false;
                error!(error = %e, "Failed to fetch posts");
                self.status_message = Some(e.user_message());
            }
            BackgroundResult::PostCreated(Ok(post)) => {
                info!(id = post.id, "Post created");
                self.post_form.reset();
                self.status_message = None;
                self.fetch_posts_background();
            }
            BackgroundResult::PostCreated(Err(e)) => {
                error!(error = %e, "Failed to create post");
                self.status_message = Some(e.user_message());
            }
            BackgroundResult::PostDeleted(id, Ok(())) => {
                info!(id = id, "Post deleted");
                self.fetch_posts_background();
            }
            BackgroundResult::PostDeleted(id, Err(e)) => {
                error!(id = id, error = %e, "Failed to delete post");
                self.status_message = Some(e.user_message());
            }
        }
    }

    // =========================================================================
    // Text Input
    // =========================================================================

    /// Field buffer that currently has focus, if any
    fn focused_buffer(&mut self) -> Option<(Field, &mut String)> {
        match self.route {
            Route::Login => match self.login_focus {
                LoginFocus::EmailOrUsername => {
                    Some((Field::EmailOrUsername, &mut self.login_form.email_or_username))
                }
                LoginFocus::Password => Some((Field::Password, &mut self.login_form.password)),
                _ => None,
            },
            Route::Register => match self.register_focus {
                RegisterFocus::Email => Some((Field::Email, &mut self.register_form.email)),
                RegisterFocus::Username => Some((Field::Username, &mut self.register_form.username)),
                RegisterFocus::Password => Some((Field::Password, &mut self.register_form.password)),
                _ => None,
            },
            Route::Dashboard => match self.dashboard_focus {
                DashboardFocus::Title => Some((Field::Title, &mut self.post_form.title)),
                DashboardFocus::Content => Some((Field::Content, &mut self.post_form.content)),
                _ => None,
            },
            Route::Profile => None,
        }
    }

    pub fn push_char(&mut self, c: char) {
        if let Some((field, buffer)) = self.focused_buffer() {
            if can_add_char(field, buffer.chars().count(), c) {
                buffer.push(c);
            }
        }
    }

    pub fn pop_char(&mut self) {
        if let Some((_, buffer)) = self.focused_buffer() {
            buffer.pop();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
