// Copyright 2021 Datafuse Labs
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Keyset paging: pages are addressed by the value of an ordered key column.
//!
//! The first load of a session runs the boundary query once, which returns
//! the first key of every page of the whole data set. Every page is then a
//! `[begin_inclusive, end_exclusive)` range between two adjacent boundaries,
//! which avoids the offset drift of [`OffsetPager`](crate::OffsetPager)
//! under concurrent writes. Boundaries are never recomputed; a new session
//! has to be started to pick up a reshaped data set.

pub mod boundaries;

use std::fmt;
use std::sync::OnceLock;

use log::debug;
use log::info;
use log::warn;

pub use self::boundaries::PageBoundaries;
pub use self::boundaries::PageRange;
pub use self::boundaries::SortOrder;
use crate::config::PagingConfig;
use crate::config::Strategy;
use crate::errors::PagingError;
use crate::invalidation::InvalidationTracker;
use crate::key::PagingKey;
use crate::load::LoadParams;
use crate::load::LoadResult;
use crate::load::Page;
use crate::page_loader::PageLoader;
use crate::query::BoundaryProvider;
use crate::query::KeysetRowProvider;

/// Outcome of the one-time boundary computation.
///
/// The empty cell holding it is the `Uninitialized` state, a running
/// `OnceLock::get_or_init` is `Computing`.
#[derive(Debug)]
enum BoundaryState<K> {
    Ready(PageBoundaries<K>),
    Failed(String),
    /// The session was invalidated before the boundaries were computed.
    Abandoned,
}

/// Serves pages keyed by an ordered key value.
///
/// Jumping is not supported: every page is located within the boundaries
/// computed for the first load of the session.
pub struct KeysetPager<K, R> {
    config: PagingConfig,
    order: SortOrder,
    boundary_provider: BoundaryProvider<K>,
    rows: KeysetRowProvider<K, R>,
    boundaries: OnceLock<BoundaryState<K>>,
}

impl<K, R> fmt::Debug for KeysetPager<K, R>
where K: fmt::Debug
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeysetPager")
            .field("config", &self.config)
            .field("order", &self.order)
            .field("boundaries", &self.boundaries.get())
            .finish_non_exhaustive()
    }
}

impl<K, R> KeysetPager<K, R>
where K: PagingKey
{
    /// Create a keyset engine.
    ///
    /// - `boundary_provider` builds the query returning the first key of
    ///   every page of `page_size` rows, sorted in `order`.
    /// - `rows` builds the query returning the rows in
    ///   `[begin_inclusive, end_exclusive)`, sorted in `order`.
    ///
    /// `config.initial_load_size` must equal `config.page_size`.
    pub fn new(
        config: PagingConfig,
        order: SortOrder,
        boundary_provider: BoundaryProvider<K>,
        rows: KeysetRowProvider<K, R>,
    ) -> Result<Self, PagingError> {
        config.validate(Strategy::Keyset)?;
        Ok(Self {
            config,
            order,
            boundary_provider,
            rows,
            boundaries: OnceLock::new(),
        })
    }

    /// The boundaries, if they have been computed successfully.
    pub fn boundaries(&self) -> Option<&PageBoundaries<K>> {
        match self.boundaries.get() {
            Some(BoundaryState::Ready(b)) => Some(b),
            _ => None,
        }
    }

    /// Get the boundaries, computing them on the first call.
    ///
    /// Concurrent first calls block until the single computation finishes.
    /// Returns `Ok(None)` if the session can not be served any more.
    fn ensure_boundaries(
        &self,
        anchor: Option<&K>,
        tracker: &InvalidationTracker,
    ) -> Result<Option<&PageBoundaries<K>>, PagingError> {
        let mut computed_here = false;

        let state = self.boundaries.get_or_init(|| {
            computed_here = true;
            self.compute_boundaries(anchor, tracker)
        });

        match state {
            BoundaryState::Ready(b) => Ok(Some(b)),
            BoundaryState::Failed(msg) if computed_here => {
                // No usable boundaries for the rest of the session.
                tracker.invalidate();
                Err(PagingError::Boundaries(msg.clone()))
            }
            BoundaryState::Failed(_) | BoundaryState::Abandoned => Ok(None),
        }
    }

    fn compute_boundaries(
        &self,
        anchor: Option<&K>,
        tracker: &InvalidationTracker,
    ) -> BoundaryState<K> {
        let page_size = self.config.page_size;
        let query = (self.boundary_provider)(anchor, page_size);

        if tracker.track(&*query).is_err() {
            return BoundaryState::Abandoned;
        }

        let keys = match query.execute() {
            Ok(keys) => keys,
            Err(e) => {
                warn!("keyset boundary query failed: anchor={:?}: {}", anchor, e);
                return BoundaryState::Failed(e.to_string());
            }
        };

        match PageBoundaries::new(keys, self.order, page_size) {
            Ok(b) => {
                info!("keyset boundaries computed: {:?}", b);
                BoundaryState::Ready(b)
            }
            Err(msg) => {
                warn!("keyset boundary query returned bad keys: {}", msg);
                BoundaryState::Failed(msg)
            }
        }
    }
}

impl<K, R> PageLoader for KeysetPager<K, R>
where
    K: PagingKey,
    R: Send + 'static,
{
    type Key = K;
    type Row = R;

    fn strategy(&self) -> Strategy {
        Strategy::Keyset
    }

    fn config(&self) -> &PagingConfig {
        &self.config
    }

    fn load(
        &self,
        params: &LoadParams<K>,
        tracker: &InvalidationTracker,
    ) -> Result<LoadResult<K, R>, PagingError> {
        if params.load_size != self.config.page_size {
            return Err(PagingError::PageSizeMismatch {
                expected: self.config.page_size,
                actual: params.load_size,
            });
        }

        let Some(boundaries) = self.ensure_boundaries(params.key.as_ref(), tracker)? else {
            return Ok(LoadResult::Invalid);
        };

        let Some(range) = boundaries.locate(params.key.as_ref()) else {
            debug!("keyset {} load: no boundaries, empty data", params.load_type);
            return Ok(Page::empty().into());
        };

        debug!(
            "keyset {} load: key={:?} => page {} [{:?}, {:?})",
            params.load_type, params.key, range.index, range.begin_inclusive, range.end_exclusive
        );

        let query = (self.rows)(range.begin_inclusive, range.end_exclusive);
        if tracker.track(&*query).is_err() {
            return Ok(LoadResult::Invalid);
        }

        let data = query.execute().map_err(|e| {
            warn!(
                "keyset row query failed: [{:?}, {:?}): {}",
                range.begin_inclusive, range.end_exclusive, e
            );
            PagingError::query("rows", e)
        })?;

        if tracker.is_invalidated() {
            return Ok(LoadResult::Invalid);
        }

        let page = Page::new(data, range.prev.cloned(), range.end_exclusive.cloned());

        if !self.config.enable_placeholders {
            return Ok(page.into());
        }

        // Every page before this one is full.
        let before = range.index as u64 * boundaries.page_size();
        Ok(Page {
            items_before: Some(before),
            ..page
        }
        .into())
    }

    fn jumping_supported(&self) -> bool {
        false
    }
}
