//! Command implementations
//!
//! Each command returns the text to print so it can be tested without a
//! terminal.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde_json::{json, Value};
use tracing::info;
use versecache::{Backend, CacheStore, CacheTiers, Ttl, Validity};
use versepager::{ChapterKey, ChapterLayout, ChapterPager, MeasurementSession, SafeArea, Verse};

/// Cache tier selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Tier {
    /// Preferences and small scalars
    Small,
    /// Chapter layouts and long generated text
    Large,
}

/// Sweep both tiers
pub async fn purge(tiers: &CacheTiers) -> String {
    let (small, large) = tiers.purge_expired().await;
    format!(
        "small: removed {}, kept {}\nlarge: removed {}, kept {}",
        small.removed, small.kept, large.removed, large.kept
    )
}

/// Stored value as pretty JSON, or `(nil)`
pub async fn get<B: Backend>(store: &CacheStore<B>, key: &str) -> Result<String> {
    match store.get::<Value>(key).await {
        Some(value) => Ok(serde_json::to_string_pretty(&value)?),
        None => Ok("(nil)".to_string()),
    }
}

/// Store a JSON value
pub async fn set<B: Backend>(
    store: &CacheStore<B>,
    key: &str,
    json: &str,
    ttl: Option<Ttl>,
) -> Result<String> {
    if key.is_empty() {
        bail!("key must not be empty");
    }
    let value: Value =
        serde_json::from_str(json).with_context(|| format!("value is not valid JSON: {}", json))?;

    let failures = store.stats().snapshot().write_failures;
    store.set(key, &value, ttl.map(Ttl::duration)).await;
    if store.stats().snapshot().write_failures > failures {
        bail!("write to {} tier failed, see log", store.backend().name());
    }
    Ok("OK".to_string())
}

/// Delete one key
pub async fn remove<B: Backend>(store: &CacheStore<B>, key: &str) -> String {
    store.remove(key).await;
    "OK".to_string()
}

/// Delete every key in a tier
pub async fn clear<B: Backend>(store: &CacheStore<B>) -> String {
    store.clear().await;
    "OK".to_string()
}

/// Every key in a tier, sorted, one per line
pub async fn keys<B: Backend>(store: &CacheStore<B>) -> Result<String> {
    let mut keys = store.backend().keys().await?;
    keys.sort();
    Ok(keys.join("\n"))
}

/// Raw entry with validity and expiry
pub async fn inspect<B: Backend>(store: &CacheStore<B>, key: &str) -> String {
    let Some(inspection) = store.inspect(key).await else {
        return "(nil)".to_string();
    };

    let expires = match inspection.expires_at {
        Some(millis) => format_millis(millis),
        None if inspection.validity == Validity::Malformed => "unknown".to_string(),
        None => "never".to_string(),
    };

    format!(
        "raw:      {}\nvalidity: {:?}\nversion:  {}\nexpires:  {}",
        inspection.raw,
        inspection.validity,
        inspection.version.as_deref().unwrap_or("unknown"),
        expires
    )
}

fn format_millis(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| format!("{} ms", millis))
}

/// Compact the large tier's log
pub fn compact(tiers: &CacheTiers) -> Result<String> {
    let store = tiers.large.backend().store();
    let reclaimed = store.compact()?;
    Ok(format!(
        "reclaimed {} bytes, log is now {} bytes ({} keys)",
        reclaimed,
        store.size_bytes(),
        store.len()
    ))
}

/// Where the page budget comes from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Budget {
    /// Usable height given directly
    Explicit(f64),
    /// Viewport height, reduced by the default safe area
    Viewport(f64),
}

impl Budget {
    /// Usable page height
    pub fn resolve(self) -> f64 {
        match self {
            Budget::Explicit(budget) => budget,
            Budget::Viewport(viewport) => SafeArea::default().page_height_budget(viewport),
        }
    }
}

/// Paginate a chapter from JSON files, optionally storing the layout
pub async fn paginate(
    tiers: &CacheTiers,
    verses_path: &Path,
    heights_path: &Path,
    budget: Budget,
    persist: bool,
) -> Result<String> {
    let verses: Vec<Verse> = read_json(verses_path)?;
    let heights: Vec<f64> = read_json(heights_path)?;
    let budget = budget.resolve();

    let first = verses
        .first()
        .ok_or_else(|| anyhow!("{} holds no verses", verses_path.display()))?;
    let key = ChapterKey::new(&first.version, &first.book, first.chapter);

    if heights.len() != verses.len() {
        bail!(
            "{} heights for {} verses; every verse needs a height",
            heights.len(),
            verses.len()
        );
    }

    let mut session = MeasurementSession::new(key.storage_key(), verses);
    for (index, height) in heights.into_iter().enumerate() {
        session.record_height(index, height);
    }

    let layout = if persist {
        ChapterPager::new(tiers.large.clone()).finish(&session, budget).await
    } else {
        session.paginate(budget)
    }
    .ok_or_else(|| anyhow!("pagination produced no layout"))?;
    if persist {
        info!("Stored layout for {} under {}", key, key.storage_key());
    }

    render_layout(&key, budget, &layout)
}

fn render_layout(key: &ChapterKey, budget: f64, layout: &ChapterLayout) -> Result<String> {
    let index: serde_json::Map<String, Value> = layout
        .verse_to_page_map()
        .into_iter()
        .map(|(verse, page)| (verse.to_string(), json!(page)))
        .collect();

    let output = json!({
        "key": key.storage_key(),
        "budget": budget,
        "pageCount": layout.page_count(),
        "totalVerses": layout.total_verse_count(),
        "pages": layout,
        "verseToPage": index,
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("Failed to parse {}", path.display()))
}
