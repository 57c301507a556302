//! Chapter lifecycle: cached layout or fresh measurement
//!
//! Opening a chapter first consults the cache. On a hit the stored layout is
//! ready to render. On a miss the verses are fetched and handed back as a
//! [`MeasurementSession`]; once the caller has measured every verse,
//! [`ChapterPager::finish`] paginates and stores the result.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};
use versecache::ttl::MONTH;
use versecache::{Backend, BlockingBackend, CacheStore};

use crate::layout::ChapterLayout;
use crate::measure::MeasurementSession;
use crate::verse::Verse;

/// Identity of one chapter in one Bible version
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChapterKey {
    /// Bible version key
    pub version: String,
    /// Book name
    pub book: String,
    /// Chapter number
    pub chapter: u32,
}

impl ChapterKey {
    /// Build a chapter key
    pub fn new(version: impl Into<String>, book: impl Into<String>, chapter: u32) -> Self {
        Self {
            version: version.into(),
            book: book.into(),
            chapter,
        }
    }

    /// `{version}:{book}:{chapter}:pages`
    ///
    /// Empty segments are kept.
    pub fn storage_key(&self) -> String {
        format!("{}:{}:{}:pages", self.version, self.book, self.chapter)
    }
}

impl fmt::Display for ChapterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.version, self.book, self.chapter)
    }
}

/// Where verses come from
#[async_trait]
pub trait VerseSource: Send + Sync {
    /// Fetch failure
    type Error: Send;

    /// All verses of a chapter in order
    async fn fetch_chapter(&self, key: &ChapterKey) -> Result<Vec<Verse>, Self::Error>;
}

/// Result of opening a chapter
#[derive(Debug, Clone)]
pub enum ChapterState {
    /// Layout found in the cache, or a chapter with no verses
    Ready(ChapterLayout),
    /// Verses fetched; heights still to be measured
    Measuring(MeasurementSession),
}

/// Opens chapters against a cache tier
pub struct ChapterPager<B> {
    cache: Arc<CacheStore<B>>,
    ttl: Duration,
}

impl<B: Backend> ChapterPager<B> {
    /// Pager storing layouts for a month
    pub fn new(cache: Arc<CacheStore<B>>) -> Self {
        Self::with_ttl(cache, MONTH)
    }

    /// Pager with a custom layout lifetime
    pub fn with_ttl(cache: Arc<CacheStore<B>>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    /// Underlying cache tier
    pub fn cache(&self) -> &Arc<CacheStore<B>> {
        &self.cache
    }

    /// Layout lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Stored layout for `key`, without fetching
    pub async fn cached_layout(&self, key: &ChapterKey) -> Option<ChapterLayout> {
        self.cache
            .get::<ChapterLayout>(&key.storage_key())
            .await
            .filter(|layout| !layout.is_empty())
    }

    /// Cached layout, or fetched verses ready for measuring.
    ///
    /// Fetch errors are returned as-is and nothing is cached.
    pub async fn open_chapter<S: VerseSource>(
        &self,
        key: &ChapterKey,
        source: &S,
    ) -> Result<ChapterState, S::Error> {
        if let Some(layout) = self.cached_layout(key).await {
            debug!("Pager[{}]: cached layout, {} pages", key, layout.page_count());
            return Ok(ChapterState::Ready(layout));
        }

        let verses = source.fetch_chapter(key).await?;
        if verses.is_empty() {
            debug!("Pager[{}]: chapter has no verses", key);
            return Ok(ChapterState::Ready(ChapterLayout::new(Vec::new())));
        }

        debug!("Pager[{}]: measuring {} verses", key, verses.len());
        Ok(ChapterState::Measuring(MeasurementSession::new(
            key.storage_key(),
            verses,
        )))
    }

    /// Paginate a fully measured session and store the layout.
    ///
    /// Returns `None` while heights are still missing.
    pub async fn finish(&self, session: &MeasurementSession, budget: f64) -> Option<ChapterLayout> {
        let layout = session.paginate(budget)?;
        self.cache.set(session.key(), &layout, Some(self.ttl)).await;
        info!(
            "Pager[{}]: {} verses on {} pages",
            session.key(),
            layout.total_verse_count(),
            layout.page_count()
        );
        Some(layout)
    }

    /// Drop the stored layout, e.g. after a font size change
    pub async fn forget(&self, key: &ChapterKey) {
        self.cache.remove(&key.storage_key()).await;
    }
}

impl<B: BlockingBackend> ChapterPager<B> {
    /// Stored layout read synchronously
    pub fn cached_layout_blocking(&self, key: &ChapterKey) -> Option<ChapterLayout> {
        self.cache
            .get_blocking::<ChapterLayout>(&key.storage_key())
            .filter(|layout| !layout.is_empty())
    }
}
