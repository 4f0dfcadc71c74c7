//! Form schemas for login, registration and post creation.
//!
//! Validation happens before any request is sent; server-side rejections
//! still come back through the API client as [`crate::api::ApiError`].

use crate::models::NewPost;

/// Minimum username length for registration
const MIN_USERNAME_LENGTH: usize = 3;

/// Minimum password length for registration
const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    EmailOrUsername,
    Email,
    Username,
    Password,
    Title,
    Content,
}

impl Field {
    pub fn label(&self) -> &'static str {
        match self {
            Field::EmailOrUsername => "Email or Username",
            Field::Email => "Email",
            Field::Username => "Username",
            Field::Password => "Password",
            Field::Title => "Title",
            Field::Content => "Content",
        }
    }

    /// Maximum number of characters accepted while typing.
    pub fn max_len(&self) -> usize {
        match self {
            Field::EmailOrUsername | Field::Email => 100,
            Field::Username => 50,
            // Accommodates password managers and passphrases
            Field::Password => 128,
            Field::Title => 120,
            Field::Content => 2000,
        }
    }

    pub fn is_secret(&self) -> bool {
        matches!(self, Field::Password)
    }
}

/// Check if a character is valid for input (no control characters)
fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

/// Check if a character should be accepted into a field that currently
/// holds `current_len` characters
pub fn can_add_char(field: Field, current_len: usize, c: char) -> bool {
    current_len < field.max_len() && is_valid_input_char(c)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub message: &'static str,
}

/// Validation failures, at most one per field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors(Vec<FieldError>);

impl FormErrors {
    fn check(&mut self, ok: bool, field: Field, message: &'static str) {
        if !ok && self.get(field).is_none() {
            self.0.push(FieldError { field, message });
        }
    }

    pub fn get(&self, field: Field) -> Option<&'static str> {
        self.0.iter().find(|e| e.field == field).map(|e| e.message)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    fn into_result(self) -> Result<(), FormErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

/// Loose structural email check: one `@`, something before it, and a
/// dotted domain after it.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email_or_username: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        errors.check(
            !self.email_or_username.trim().is_empty(),
            Field::EmailOrUsername,
            "Email or Username is required",
        );
        errors.check(!self.password.is_empty(), Field::Password, "Password is required");
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub email: String,
    pub username: String,
    pub password: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        errors.check(is_valid_email(self.email.trim()), Field::Email, "Invalid email");
        errors.check(
            self.username.trim().chars().count() >= MIN_USERNAME_LENGTH,
            Field::Username,
            "Username must be at least 3 characters",
        );
        errors.check(
            self.password.chars().count() >= MIN_PASSWORD_LENGTH,
            Field::Password,
            "Password must be at least 6 characters",
        );
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PostForm {
    pub title: String,
    pub content: String,
}

impl PostForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        errors.check(!self.title.trim().is_empty(), Field::Title, "Title is required");
        errors.check(!self.content.trim().is_empty(), Field::Content, "Content is required");
        errors.into_result()
    }

    /// Validate and build the request body.
    pub fn to_new_post(&self) -> Result<NewPost, FormErrors> {
        self.validate()?;
        Ok(NewPost {
            title: self.title.trim().to_string(),
            content: self.content.trim().to_string(),
        })
    }

    pub fn reset(&mut self) {
        self.title.clear();
        self.content.clear();
    }
}
