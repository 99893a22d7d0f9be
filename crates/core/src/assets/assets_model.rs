//! Asset and portfolio domain models.

use serde::{Deserialize, Serialize};

/// An investable asset, identified by its unique name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub name: String,
}

impl Asset {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A portfolio, identified by its unique name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub name: String,
}

impl Portfolio {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
