//! Data models for postboard entities.
//!
//! - `Identity`: the authenticated user carried by the session
//! - `AuthResponse`, `LoginRequest`, `RegisterRequest`: credential exchange bodies
//! - `Post`, `PostAuthor`, `NewPost`: dashboard posts

pub mod post;
pub mod user;

pub use post::{NewPost, Post, PostAuthor};
pub use user::{AuthResponse, Identity, LoginRequest, RegisterRequest};
