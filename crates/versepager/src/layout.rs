//! Paginated chapter and its verse index

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::page::ChapterPage;
use crate::verse::Verse;

/// Ordered pages of one chapter, as persisted in the large cache tier.
///
/// Serializes as a bare array of [`ChapterPage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChapterLayout {
    pages: Vec<ChapterPage>,
}

impl ChapterLayout {
    /// Wrap pages produced by [`crate::paginate`]
    pub fn new(pages: Vec<ChapterPage>) -> Self {
        Self { pages }
    }

    /// Paginate and wrap in one step
    pub fn from_heights(verses: &[Verse], heights: &[f64], budget: f64) -> Option<Self> {
        crate::page::paginate(verses, heights, budget).map(Self::new)
    }

    /// All pages in order
    pub fn pages(&self) -> &[ChapterPage] {
        &self.pages
    }

    /// Number of pages
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Whether there are no pages
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Page by 1-based number
    pub fn page(&self, page_number: u32) -> Option<&ChapterPage> {
        let index = page_number.checked_sub(1)? as usize;
        self.pages.get(index)
    }

    /// Verse number to the 1-based page it lands on.
    ///
    /// Used to jump straight to a verse; a verse appearing twice keeps its
    /// last page.
    pub fn verse_to_page_map(&self) -> BTreeMap<u32, u32> {
        self.pages
            .iter()
            .flat_map(|page| page.verses.iter().map(move |v| (v.verse, page.page_number)))
            .collect()
    }

    /// Page holding `verse`, if any
    pub fn page_for_verse(&self, verse: u32) -> Option<u32> {
        self.pages
            .iter()
            .rev()
            .find(|page| page.verses.iter().any(|v| v.verse == verse))
            .map(|page| page.page_number)
    }

    /// Sum of every page's verse count
    pub fn total_verse_count(&self) -> usize {
        self.pages.iter().map(|page| page.verses.len()).sum()
    }

    /// Verse number shown at the top of a 1-based page
    pub fn first_verse_on_page(&self, page_number: u32) -> Option<u32> {
        self.page(page_number).map(|page| page.starts_at_verse)
    }
}

impl From<Vec<ChapterPage>> for ChapterLayout {
    fn from(pages: Vec<ChapterPage>) -> Self {
        Self::new(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn layout() -> ChapterLayout {
        let verses: Vec<Verse> = (1..=5)
            .map(|n| Verse::new("KJV", "Ruth", 1, n, "text"))
            .collect();
        ChapterLayout::from_heights(&verses, &[40.0; 5], 100.0).unwrap()
    }

    #[test]
    fn test_verse_to_page_map() {
        let map = layout().verse_to_page_map();

        assert_eq!(map.len(), 5);
        assert_eq!(map[&1], 1);
        assert_eq!(map[&3], 1);
        assert_eq!(map[&4], 2);
        assert_eq!(map[&5], 2);
    }

    #[test]
    fn test_empty_layout() {
        let layout = ChapterLayout::new(Vec::new());

        assert!(layout.is_empty());
        assert!(layout.verse_to_page_map().is_empty());
        assert_eq!(layout.total_verse_count(), 0);
        assert_eq!(layout.first_verse_on_page(1), None);
    }

    #[test]
    fn test_lookups() {
        let layout = layout();

        assert_eq!(layout.page_count(), 2);
        assert_eq!(layout.total_verse_count(), 5);
        assert_eq!(layout.page_for_verse(4), Some(2));
        assert_eq!(layout.page_for_verse(9), None);
        assert_eq!(layout.first_verse_on_page(2), Some(4));
        assert_eq!(layout.first_verse_on_page(0), None);
        assert_eq!(layout.first_verse_on_page(3), None);
    }

    #[test]
    fn test_serializes_as_array() {
        let layout = layout();
        let json = serde_json::to_value(&layout).unwrap();

        assert!(json.is_array());
        assert_eq!(json.as_array().unwrap().len(), 2);

        let back: ChapterLayout = serde_json::from_value(json).unwrap();
        assert_eq!(back, layout);
    }

    proptest! {
        #[test]
        fn test_index_agrees_with_pages(
            heights in prop::collection::vec(0.0f64..300.0, 1..150),
            budget in 1.0f64..900.0,
        ) {
            let verses: Vec<Verse> = (1..=heights.len() as u32)
                .map(|n| Verse::new("KJV", "Psalms", 119, n, "text"))
                .collect();
            let pages = crate::page::paginate(&verses, &heights, budget).unwrap();
            let layout = ChapterLayout::new(pages);
            let map = layout.verse_to_page_map();

            for page in layout.pages() {
                for verse in &page.verses {
                    prop_assert_eq!(map[&verse.verse], page.page_number);
                    prop_assert_eq!(layout.page_for_verse(verse.verse), Some(page.page_number));
                }
            }
            prop_assert_eq!(map.len(), heights.len());
            prop_assert_eq!(layout.total_verse_count(), heights.len());
        }
    }
}
