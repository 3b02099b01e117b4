pub mod answer;
pub mod config;
pub mod error;
pub mod server;
pub mod session;
pub mod transcript;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Who said what in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn in the conversation history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }
}

/// A timed caption fragment, as served by `GET /transcript`.
/// `offset` and `duration` are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    pub duration: f64,
    pub offset: f64,
}

/// Extract the 11-character video ID from the YouTube URL shapes we accept,
/// or from a bare ID.
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();

    if Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap().is_match(input) {
        return Some(input.to_string());
    }

    let patterns = [
        r"youtube\.com/watch\?(?:[^#\s]*&)?v=([A-Za-z0-9_-]{11})",
        r"youtu\.be/([A-Za-z0-9_-]{11})",
        r"youtube\.com/embed/([A-Za-z0-9_-]{11})",
        r"youtube\.com/shorts/([A-Za-z0-9_-]{11})",
    ];

    for pattern in patterns {
        if let Some(caps) = Regex::new(pattern).unwrap().captures(input) {
            return Some(caps[1].to_string());
        }
    }

    None
}
