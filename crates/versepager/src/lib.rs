//! # versepager
//!
//! Splits a chapter into screen-sized pages from measured verse heights.
//!
//! ## Flow
//! 1. [`ChapterPager::open_chapter`] returns a cached [`ChapterLayout`] or a
//!    [`MeasurementSession`] holding freshly fetched verses
//! 2. The renderer reports each verse's height with
//!    [`MeasurementSession::record_height`]
//! 3. [`ChapterPager::finish`] runs [`paginate`] against the budget from
//!    [`SafeArea`] and stores the layout in the large cache tier
//!
//! Layouts are keyed `{version}:{book}:{chapter}:pages` and live for a month.

#![warn(missing_docs)]

mod budget;
mod layout;
mod measure;
mod page;
mod pager;
mod verse;

pub use budget::{SafeArea, DEFAULT_BUFFER_FRACTION, DEFAULT_MIN_BUFFER};
pub use layout::ChapterLayout;
pub use measure::MeasurementSession;
pub use page::{paginate, ChapterPage};
pub use pager::{ChapterKey, ChapterPager, ChapterState, VerseSource};
pub use verse::Verse;
