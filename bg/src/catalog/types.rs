//! Catalog data types

use serde::{Deserialize, Serialize};

/// One autocomplete suggestion: a title and its authors, in endpoint order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCandidate {
    pub title: String,
    pub authors: Vec<String>,
}

impl SearchCandidate {
    pub fn new(title: impl Into<String>, authors: Vec<String>) -> Self {
        Self {
            title: title.into(),
            authors,
        }
    }

    /// Authors joined for display, e.g. "Neil Gaiman, Terry Pratchett"
    pub fn authors_display(&self) -> String {
        self.authors.join(", ")
    }
}
