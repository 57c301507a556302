//! Greedy chapter pagination
//!
//! Verses are packed in order: each verse's height is added to the running
//! total and the verse joins the current page; the page closes as soon as the
//! total reaches the budget, or at the chapter's last verse. The verse that
//! tips the total over the budget stays on the page it tipped, so a single
//! verse taller than the budget still gets a page of its own.

use serde::{Deserialize, Serialize};

use crate::verse::Verse;

/// A screenful of consecutive verses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterPage {
    /// 1-based position within the chapter
    pub page_number: u32,
    /// Non-empty, contiguous, in chapter order
    pub verses: Vec<Verse>,
    /// Verse number of `verses[0]`
    pub starts_at_verse: u32,
    /// Whether this page holds the chapter's final verse
    pub last_verse_visible: bool,
}

/// Pack `verses` into pages of at most `budget` height (see module docs).
///
/// `heights[i]` is the rendered height of `verses[i]`; negative or NaN
/// heights count as zero. Returns `None` when the heights do not cover every
/// verse or there are no verses, so a caller still collecting measurements
/// can simply retry.
pub fn paginate(verses: &[Verse], heights: &[f64], budget: f64) -> Option<Vec<ChapterPage>> {
    if verses.is_empty() || heights.len() != verses.len() {
        return None;
    }

    let last = verses.len() - 1;
    let mut pages = Vec::new();
    let mut current = Vec::new();
    let mut accumulated = 0.0;
    let mut starts_at = verses[0].verse;

    for (i, (verse, height)) in verses.iter().zip(heights).enumerate() {
        accumulated += height.max(0.0);
        current.push(verse.clone());

        let is_last = i == last;
        if accumulated >= budget || is_last {
            pages.push(ChapterPage {
                page_number: pages.len() as u32 + 1,
                verses: std::mem::take(&mut current),
                starts_at_verse: starts_at,
                last_verse_visible: is_last,
            });
            accumulated = 0.0;
            if let Some(next) = verses.get(i + 1) {
                starts_at = next.verse;
            }
        }
    }

    Some(pages)
}
