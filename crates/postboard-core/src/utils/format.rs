use chrono::{DateTime, Utc};

use crate::models::Identity;

/// Truncate a string to a maximum number of characters, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a timestamp as a short readable date, e.g. "Mar 04, 2025"
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%b %d, %Y").to_string()
}

/// Mask a secret for display, one `*` per character up to `max_len`
pub fn mask(secret: &str, max_len: usize) -> String {
    "*".repeat(secret.chars().count().min(max_len))
}

/// Name shown in the top bar, "User" when nobody is signed in
pub fn display_name(identity: Option<&Identity>) -> &str {
    identity.map(|i| i.username.as_str()).filter(|n| !n.is_empty()).unwrap_or("User")
}
