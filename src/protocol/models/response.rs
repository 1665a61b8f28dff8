use serde::{Deserialize, Serialize};

use super::{ArbitraryJson, Item};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    InProgress,
    Completed,
    Cancelled,
    Failed,
    Incomplete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub id: String,
    pub status: Option<ResponseStatus>,
    #[serde(default)]
    pub output: Vec<Item>,
    pub usage: Option<ArbitraryJson>,
}

impl Response {
    /// The first output item; the only one this client acts on.
    #[must_use]
    pub fn first_output(&self) -> Option<&Item> {
        self.output.first()
    }
}
