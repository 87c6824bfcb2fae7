use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Cursor, ImageId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: ImageId,
    pub title: String,
    pub description: String,
    pub url: String,
    #[serde(rename = "ts", with = "chrono::serde::ts_microseconds")]
    pub created_at: DateTime<Utc>,
}

/// One batch of the list endpoint. `after` is `None` on the last page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePage {
    pub data: Vec<ImageRecord>,
    #[serde(default)]
    pub after: Option<Cursor>,
}

impl ImagePage {
    pub fn has_next(&self) -> bool {
        self.after.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateImageRequest {
    pub url: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostedFile {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostedFileResponse {
    pub data: HostedFile,
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
