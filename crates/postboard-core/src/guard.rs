//! Mount-time gate for protected screens.
//!
//! A guard starts out `Unknown` and stays there until the session store
//! reports that the persisted session has been restored. It then either
//! renders the protected content or redirects to the login route. A
//! rendered screen is re-checked on every session change and redirects as
//! soon as the session is cleared. Once redirecting, a mount stays that way.
//!
//! Protected content is produced by a closure passed to
//! [`RouteGuard::render`], which is only called in the `Rendered` state.

use tokio::sync::watch;
use tracing::debug;

use crate::auth::{Session, SessionStore};
use crate::routes::{Route, UNAUTHENTICATED_ENTRY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// Restore has not finished; nothing may be shown
    Unknown,
    /// Not authenticated; navigate to the redirect target
    Redirecting,
    /// Authenticated; protected content is mounted
    Rendered,
}

impl GuardState {
    /// Transition for a given session snapshot.
    pub fn next(self, session: &Session) -> GuardState {
        match self {
            GuardState::Redirecting => GuardState::Redirecting,
            _ if !session.is_restored() => GuardState::Unknown,
            _ if session.is_authenticated() => GuardState::Rendered,
            _ => GuardState::Redirecting,
        }
    }
}

/// What a guarded screen should show this frame.
#[derive(Debug, PartialEq, Eq)]
pub enum GuardView<T> {
    /// Session not known yet; render nothing
    Pending,
    /// Navigate away to this route
    Redirect(Route),
    /// The protected content
    Content(T),
}

/// Guard for one mount of a protected screen.
pub struct RouteGuard {
    rx: watch::Receiver<Session>,
    state: GuardState,
    redirect_to: Route,
}

impl RouteGuard {
    /// Mount a guard that redirects to the login route.
    pub fn mount(store: &SessionStore) -> Self {
        Self::with_redirect(store, UNAUTHENTICATED_ENTRY)
    }

    pub fn with_redirect(store: &SessionStore, redirect_to: Route) -> Self {
        Self {
            rx: store.subscribe(),
            state: GuardState::Unknown,
            redirect_to,
        }
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    pub fn redirect_target(&self) -> Route {
        self.redirect_to
    }

    /// True when the session changed since the last evaluation.
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    fn apply(&mut self, session: &Session) -> GuardState {
        let next = self.state.next(session);
        if next != self.state {
            debug!(from = ?self.state, to = ?next, route = self.redirect_to.path(), "Guard transition");
            self.state = next;
        }
        next
    }

    /// Re-evaluate against the current session.
    pub fn evaluate(&mut self) -> GuardState {
        let session = self.rx.borrow_and_update().clone();
        self.apply(&session)
    }

    /// Wait for the store to finish restoring, then evaluate.
    pub async fn resolve(&mut self) -> GuardState {
        // An error means the store is gone; evaluate whatever was last seen
        let _ = self.rx.wait_for(|session| session.is_restored()).await;
        self.evaluate()
    }

    /// Wait for the next session change, then evaluate.
    pub async fn changed(&mut self) -> GuardState {
        if self.rx.changed().await.is_err() {
            return self.state;
        }
        self.evaluate()
    }

    /// Evaluate and, only when rendered, build the protected content from
    /// the same session snapshot the decision was made on.
    pub fn render<T>(&mut self, content: impl FnOnce(&Session) -> T) -> GuardView<T> {
        let session = self.rx.borrow_and_update().clone();
        match self.apply(&session) {
            GuardState::Unknown => GuardView::Pending,
            GuardState::Redirecting => GuardView::Redirect(self.redirect_to),
            GuardState::Rendered => GuardView::Content(content(&session)),
        }
    }
}
