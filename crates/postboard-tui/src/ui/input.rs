//! Keyboard input handling for the TUI.
//!
//! This module handles all keyboard events and translates them into
//! application state changes.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use postboard_core::routes::SIDEBAR_LINKS;
use postboard_core::Route;

use crate::app::{App, AppState, DashboardFocus, LoginFocus, RegisterFocus};

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    // Handle delete confirmation
    if let AppState::ConfirmingDelete(id) = app.state {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                app.state = AppState::Normal;
                app.delete_post(id);
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.state = AppState::Normal;
            }
            _ => {}
        }
        return Ok(false);
    }

    // Handle quit confirmation
    if matches!(app.state, AppState::ConfirmingQuit) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                app.state = AppState::Quitting;
                return Ok(true);
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.state = AppState::Normal;
            }
            _ => {}
        }
        return Ok(false);
    }

    match app.route {
        Route::Login => handle_login_input(app, key).await,
        Route::Register => handle_register_input(app, key).await,
        Route::Dashboard => Ok(handle_dashboard_input(app, key)),
        Route::Profile => Ok(handle_navigation_key(app, key)),
    }
}

/// Sidebar and global shortcuts, active whenever no text field has focus.
/// Returns true if the key was consumed.
fn handle_navigation_key(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') => {
            app.state = AppState::ConfirmingQuit;
        }
        KeyCode::Char('l') => {
            app.logout();
        }
        KeyCode::Char(c @ '1'..='9') => {
            let index = c as usize - '1' as usize;
            match SIDEBAR_LINKS.get(index) {
                Some(route) => app.navigate(*route),
                None => return false,
            }
        }
        _ => return false,
    }
    true
}

async fn handle_login_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            // Quit if on login screen
            app.state = AppState::Quitting;
            return Ok(true);
        }
        KeyCode::Down | KeyCode::Tab => {
            app.login_focus = app.login_focus.next();
        }
        KeyCode::Up | KeyCode::BackTab => {
            app.login_focus = app.login_focus.prev();
        }
        KeyCode::Enter => match app.login_focus {
            LoginFocus::EmailOrUsername | LoginFocus::Password => {
                app.login_focus = app.login_focus.next();
            }
            LoginFocus::Button => {
                // On failure login_error or login_errors is set
                let _ = app.attempt_login().await;
            }
            LoginFocus::RegisterLink => {
                app.navigate(Route::Register);
            }
        },
        KeyCode::Backspace => app.pop_char(),
        KeyCode::Char(c) => app.push_char(c),
        _ => {}
    }
    Ok(false)
}

async fn handle_register_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            app.navigate(Route::Login);
        }
        KeyCode::Down | KeyCode::Tab => {
            app.register_focus = app.register_focus.next();
        }
        KeyCode::Up | KeyCode::BackTab => {
            app.register_focus = app.register_focus.prev();
        }
        KeyCode::Enter => match app.register_focus {
            RegisterFocus::Email | RegisterFocus::Username | RegisterFocus::Password => {
                app.register_focus = app.register_focus.next();
            }
            RegisterFocus::Button => {
                let _ = app.attempt_register().await;
            }
            RegisterFocus::LoginLink => {
                app.navigate(Route::Login);
            }
        },
        KeyCode::Backspace => app.pop_char(),
        KeyCode::Char(c) => app.push_char(c),
        _ => {}
    }
    Ok(false)
}

fn handle_dashboard_input(app: &mut App, key: KeyEvent) -> bool {
    // Nothing is interactive until the guard has rendered the dashboard
    if app.protected.is_none() {
        if key.code == KeyCode::Char('q') {
            app.state = AppState::ConfirmingQuit;
        }
        return false;
    }

    match key.code {
        KeyCode::Tab => {
            app.dashboard_focus = app.dashboard_focus.next();
            return false;
        }
        KeyCode::BackTab => {
            app.dashboard_focus = app.dashboard_focus.prev();
            return false;
        }
        KeyCode::Esc => {
            app.dashboard_focus = DashboardFocus::Posts;
            return false;
        }
        _ => {}
    }

    match app.dashboard_focus {
        DashboardFocus::Title | DashboardFocus::Content => match key.code {
            KeyCode::Enter => app.dashboard_focus = app.dashboard_focus.next(),
            KeyCode::Backspace => app.pop_char(),
            KeyCode::Char(c) => app.push_char(c),
            _ => {}
        },
        DashboardFocus::Publish => match key.code {
            KeyCode::Enter => app.submit_post(),
            KeyCode::Up => app.dashboard_focus = app.dashboard_focus.prev(),
            KeyCode::Down => app.dashboard_focus = app.dashboard_focus.next(),
            _ => {
                handle_navigation_key(app, key);
            }
        },
        DashboardFocus::Posts => match key.code {
            KeyCode::Up | KeyCode::Char('k') => app.select_prev_post(),
            KeyCode::Down | KeyCode::Char('j') => app.select_next_post(),
            KeyCode::Char('d') | KeyCode::Delete => app.request_delete(),
            KeyCode::Char('r') => {
                app.status_message = None;
                app.fetch_posts_background();
            }
            KeyCode::Char('n') => app.dashboard_focus = DashboardFocus::Title,
            _ => {
                handle_navigation_key(app, key);
            }
        },
    }
    false
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crossterm::event::KeyModifiers;
    use postboard_core::auth::MemoryStorage;
    use postboard_core::config::Config;
    use postboard_core::models::Identity;
    use postboard_core::{ApiClient, SessionStore};

    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn signed_in_app() -> App {
        let session = SessionStore::new(Arc::new(MemoryStorage::default()));
        let api = ApiClient::new("http://127.0.0.1:9/api", session.clone()).unwrap();
        let mut app = App::with_services(Config::default(), session, api);
        app.restore_session();
        app.session.login(
            Identity {
                id: 1,
                username: "ana".to_string(),
                email: "ana@example.com".to_string(),
                role: "USER".to_string(),
            },
            "tok".to_string(),
        );
        app.navigate(Route::Profile);
        app.tick();
        app
    }

    #[tokio::test]
    async fn test_sidebar_shortcuts() {
        let mut app = signed_in_app();
        assert!(!handle_input(&mut app, key(KeyCode::Char('1'))).await.unwrap());
        assert_eq!(app.route, Route::Dashboard);

        app.navigate(Route::Profile);
        handle_input(&mut app, key(KeyCode::Char('l'))).await.unwrap();
        assert_eq!(app.route, Route::Login);
        assert!(!app.session.is_authenticated());
    }

    #[tokio::test]
    async fn test_quit_confirmation() {
        let mut app = signed_in_app();
        handle_input(&mut app, key(KeyCode::Char('q'))).await.unwrap();
        assert_eq!(app.state, AppState::ConfirmingQuit);

        handle_input(&mut app, key(KeyCode::Esc)).await.unwrap();
        assert_eq!(app.state, AppState::Normal);

        handle_input(&mut app, key(KeyCode::Char('q'))).await.unwrap();
        assert!(handle_input(&mut app, key(KeyCode::Char('y'))).await.unwrap());
    }

    #[tokio::test]
    async fn test_register_link_from_login() {
        let mut app = signed_in_app();
        app.navigate(Route::Login);
        app.login_focus = LoginFocus::RegisterLink;
        handle_input(&mut app, key(KeyCode::Enter)).await.unwrap();
        assert_eq!(app.route, Route::Register);

        handle_input(&mut app, key(KeyCode::Esc)).await.unwrap();
        assert_eq!(app.route, Route::Login);
    }

    #[tokio::test]
    async fn test_typing_on_dashboard_does_not_trigger_shortcuts() {
        let mut app = signed_in_app();
        app.navigate(Route::Dashboard);
        app.tick();
        app.dashboard_focus = DashboardFocus::Title;

        for c in "ql1".chars() {
            handle_input(&mut app, key(KeyCode::Char(c))).await.unwrap();
        }
        assert_eq!(app.post_form.title, "ql1");
        assert_eq!(app.route, Route::Dashboard);
        assert_eq!(app.state, AppState::Normal);

        handle_input(&mut app, key(KeyCode::Esc)).await.unwrap();
        assert_eq!(app.dashboard_focus, DashboardFocus::Posts);
    }
}
