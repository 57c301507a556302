//! Height collection for a chapter being laid out
//!
//! Renderers report verse heights one at a time and in any order. Once every
//! verse has a height the session can paginate; until then [`MeasurementSession::paginate`]
//! returns `None`.

use tracing::debug;

use crate::layout::ChapterLayout;
use crate::verse::Verse;

/// Heights gathered so far for one chapter
#[derive(Debug, Clone)]
pub struct MeasurementSession {
    key: String,
    verses: Vec<Verse>,
    heights: Vec<Option<f64>>,
    recorded: usize,
}

impl MeasurementSession {
    /// Start measuring `verses`; `key` identifies the chapter in logs and storage
    pub fn new(key: impl Into<String>, verses: Vec<Verse>) -> Self {
        let heights = vec![None; verses.len()];
        Self {
            key: key.into(),
            verses,
            heights,
            recorded: 0,
        }
    }

    /// Chapter identity
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Verses being measured
    pub fn verses(&self) -> &[Verse] {
        &self.verses
    }

    /// Record the height of `verses[index]`.
    ///
    /// Re-measuring replaces the earlier height. Returns `false` for an
    /// out-of-range index.
    pub fn record_height(&mut self, index: usize, height: f64) -> bool {
        let Some(slot) = self.heights.get_mut(index) else {
            debug!("Measure[{}]: index {} out of range", self.key, index);
            return false;
        };
        if slot.replace(height).is_none() {
            self.recorded += 1;
        }
        true
    }

    /// How many verses have a height
    pub fn recorded(&self) -> usize {
        self.recorded
    }

    /// Whether every verse has been measured
    pub fn is_complete(&self) -> bool {
        !self.verses.is_empty() && self.recorded == self.verses.len()
    }

    /// All heights in verse order, once complete
    pub fn heights(&self) -> Option<Vec<f64>> {
        if !self.is_complete() {
            return None;
        }
        self.heights.iter().copied().collect()
    }

    /// Paginate with the gathered heights
    pub fn paginate(&self, budget: f64) -> Option<ChapterLayout> {
        let heights = self.heights()?;
        ChapterLayout::from_heights(&self.verses, &heights, budget)
    }

    /// Forget every height, e.g. after a viewport or font change
    pub fn reset(&mut self) {
        self.heights.iter_mut().for_each(|h| *h = None);
        self.recorded = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(count: u32) -> MeasurementSession {
        let verses = (1..=count)
            .map(|n| Verse::new("KJV", "Jonah", 2, n, "text"))
            .collect();
        MeasurementSession::new("KJV:Jonah:2:pages", verses)
    }

    #[test]
    fn test_out_of_order_measurement() {
        let mut session = session(3);

        assert!(session.record_height(2, 40.0));
        assert!(session.paginate(100.0).is_none());
        assert!(session.record_height(0, 40.0));
        assert!(!session.is_complete());
        assert!(session.record_height(1, 40.0));

        assert!(session.is_complete());
        assert_eq!(session.heights(), Some(vec![40.0, 40.0, 40.0]));
        let layout = session.paginate(100.0).unwrap();
        assert_eq!(layout.page_count(), 1);
    }

    #[test]
    fn test_remeasure_does_not_double_count() {
        let mut session = session(2);

        session.record_height(0, 10.0);
        session.record_height(0, 30.0);
        assert_eq!(session.recorded(), 1);
        assert!(!session.is_complete());

        session.record_height(1, 80.0);
        assert_eq!(session.heights(), Some(vec![30.0, 80.0]));
    }

    #[test]
    fn test_out_of_range_index() {
        let mut session = session(2);
        assert!(!session.record_height(5, 10.0));
        assert_eq!(session.recorded(), 0);
    }

    #[test]
    fn test_reset() {
        let mut session = session(2);
        session.record_height(0, 10.0);
        session.record_height(1, 10.0);
        session.reset();

        assert_eq!(session.recorded(), 0);
        assert!(session.heights().is_none());
    }

    #[test]
    fn test_empty_chapter_never_completes() {
        let session = session(0);
        assert!(!session.is_complete());
        assert!(session.paginate(100.0).is_none());
    }
}
