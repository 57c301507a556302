//! Verse records

use serde::{Deserialize, Serialize};

/// One verse of scripture as served by the verse source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
    /// Bible version key, e.g. `KJV`
    pub version: String,
    /// Book name, e.g. `Genesis`
    pub book: String,
    /// Chapter number
    pub chapter: u32,
    /// Verse number within the chapter
    pub verse: u32,
    /// Verse text
    pub text: String,
}

impl Verse {
    /// Build a verse record
    pub fn new(
        version: impl Into<String>,
        book: impl Into<String>,
        chapter: u32,
        verse: u32,
        text: impl Into<String>,
    ) -> Self {
        Self {
            version: version.into(),
            book: book.into(),
            chapter,
            verse,
            text: text.into(),
        }
    }

    /// `Book chapter:verse`
    pub fn reference(&self) -> String {
        format!("{} {}:{}", self.book, self.chapter, self.verse)
    }
}
