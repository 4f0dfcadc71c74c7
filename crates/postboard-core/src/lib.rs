//! Core library for postboard.
//!
//! Provides the session and request-authorization layer shared by every
//! postboard front end:
//!
//! - `auth`: the session store and its persistence backends
//! - `api`: the HTTP client that authorizes requests and reacts to rejection
//! - `guard`: the gate that keeps protected screens hidden until the session
//!   is known
//! - `routes`, `forms`, `models`, `config`, `utils`: supporting types

pub mod api;
pub mod auth;
pub mod config;
pub mod forms;
pub mod guard;
pub mod models;
pub mod routes;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use auth::{RestoreOutcome, Session, SessionStore};
pub use guard::{GuardState, GuardView, RouteGuard};
pub use routes::Route;
