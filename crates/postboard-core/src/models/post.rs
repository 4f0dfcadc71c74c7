use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::format_date;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub published: bool,
    pub author: PostAuthor,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Byline shown under the title, e.g. "By ana on Mar 04, 2025".
    pub fn byline(&self) -> String {
        format!("By {} on {}", self.author.username, format_date(&self.created_at))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostAuthor {
    pub username: String,
}

/// Body for `POST /posts`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
}
