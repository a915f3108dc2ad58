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

//! Offset paging: pages are addressed by row position.
//!
//! Every load first runs the count query, so a page is never requested past
//! the end of a data set that shrank since the previous load.

pub mod window;

use std::fmt;

use log::debug;
use log::warn;

pub use self::window::Window;
use crate::config::PagingConfig;
use crate::config::Strategy;
use crate::errors::PagingError;
use crate::invalidation::InvalidationTracker;
use crate::load::LoadParams;
use crate::load::LoadResult;
use crate::load::Page;
use crate::page_loader::PageLoader;
use crate::query::CountProvider;
use crate::query::OffsetRowProvider;

/// Serves pages keyed by an integer offset.
///
/// Supports jumping to any offset with a refresh.
pub struct OffsetPager<R> {
    config: PagingConfig,
    count: CountProvider,
    rows: OffsetRowProvider<R>,
}

impl<R> fmt::Debug for OffsetPager<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OffsetPager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<R> OffsetPager<R> {
    /// Create an offset engine.
    ///
    /// - `count` builds the query returning the total number of rows.
    /// - `rows` builds the query returning `limit` rows starting at `offset`.
    pub fn new(
        config: PagingConfig,
        count: CountProvider,
        rows: OffsetRowProvider<R>,
    ) -> Result<Self, PagingError> {
        config.validate(Strategy::Offset)?;
        Ok(Self {
            config,
            count,
            rows,
        })
    }

    fn count_rows(&self, tracker: &InvalidationTracker) -> Result<Option<u64>, PagingError> {
        let query = (self.count)();
        if tracker.track(&*query).is_err() {
            return Ok(None);
        }

        let got = query.execute().map_err(|e| {
            warn!("offset count query failed: {}", e);
            PagingError::query("row count", e)
        })?;

        // An empty count result means no rows
        Ok(Some(got.first().copied().unwrap_or_default()))
    }
}

impl<R> PageLoader for OffsetPager<R>
where R: Send + 'static
{
    type Key = u64;
    type Row = R;

    fn strategy(&self) -> Strategy {
        Strategy::Offset
    }

    fn config(&self) -> &PagingConfig {
        &self.config
    }

    fn load(
        &self,
        params: &LoadParams<u64>,
        tracker: &InvalidationTracker,
    ) -> Result<LoadResult<u64, R>, PagingError> {
        let Some(total) = self.count_rows(tracker)? else {
            return Ok(LoadResult::Invalid);
        };

        let win = Window::new(params.load_type, params.key, params.load_size, total);
        debug!(
            "offset {} load: key={:?} size={} total={} => {:?}",
            params.load_type, params.key, params.load_size, total, win
        );

        let page = if win.is_empty() {
            Page::empty()
        } else {
            let query = (self.rows)(win.limit, win.offset);
            if tracker.track(&*query).is_err() {
                return Ok(LoadResult::Invalid);
            }

            let mut data = query.execute().map_err(|e| {
                warn!("offset row query failed: {:?}: {}", win, e);
                PagingError::query("rows", e)
            })?;
            data.truncate(win.limit as usize);

            let len = data.len() as u64;
            Page::new(
                data,
                win.prev_key(self.config.page_size),
                win.next_key(len, total),
            )
        };

        // The data may have changed while the queries ran.
        if tracker.is_invalidated() {
            return Ok(LoadResult::Invalid);
        }

        if !self.config.enable_placeholders {
            return Ok(page.into());
        }

        let before = win.offset;
        let after = total - win.offset - page.data.len() as u64;
        Ok(page.with_counts(before, after).into())
    }

    fn jumping_supported(&self) -> bool {
        true
    }

    /// Center the initial load on the anchor, snapped down to a page start so
    /// that prepends from the refreshed page never overlap it.
    fn refresh_key(&self, anchor_position: u64) -> Option<u64> {
        let start = anchor_position.saturating_sub(self.config.initial_load_size / 2);
        let page_size = self.config.page_size;
        Some(start / page_size * page_size)
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::impls::memory::MemoryTable;
    use crate::impls::memory::QueryKind;

    type Row = (u64, u64);

    fn table(n: u64) -> MemoryTable<u64, u64> {
        MemoryTable::from_iter((0..n).map(|i| (i, i * 10)))
    }

    fn pager(t: &MemoryTable<u64, u64>, page_size: u64) -> OffsetPager<Row> {
        OffsetPager::new(
            PagingConfig::new(page_size),
            t.count_provider(),
            t.offset_provider(),
        )
        .unwrap()
    }

    fn rows(range: std::ops::Range<u64>) -> Vec<Row> {
        range.map(|i| (i, i * 10)).collect()
    }

    fn load_page(p: &OffsetPager<Row>, params: LoadParams<u64>) -> Page<u64, Row> {
        let tracker = InvalidationTracker::new();
        p.load(&params, &tracker).unwrap().into_page().unwrap()
    }

    #[test]
    fn test_sequential_pages() {
        let t = table(10);
        let p = pager(&t, 3);

        let page = load_page(&p, LoadParams::refresh(None, 3));
        assert_eq!(page.data, rows(0..3));
        assert_eq!(page.prev_key, None);
        assert_eq!(page.next_key, Some(3));
        assert_eq!((page.items_before, page.items_after), (Some(0), Some(7)));

        let page = load_page(&p, LoadParams::append(3, 3));
        assert_eq!(page.data, rows(3..6));
        assert_eq!(page.prev_key, Some(0));
        assert_eq!(page.next_key, Some(6));

        let page = load_page(&p, LoadParams::append(9, 3));
        assert_eq!(page.data, rows(9..10));
        assert_eq!(page.prev_key, Some(6));
        assert_eq!(page.next_key, None);
        assert_eq!((page.items_before, page.items_after), (Some(9), Some(0)));
    }

    #[test]
    fn test_refresh_jump_is_clamped() {
        let t = table(10);
        let p = pager(&t, 3);

        let page = load_page(&p, LoadParams::refresh(Some(9), 3));
        assert_eq!(page.data, rows(7..10));
        assert_eq!(page.prev_key, Some(4));
        assert_eq!(page.next_key, None);
    }

    #[test]
    fn test_prepend() {
        let t = table(10);
        let p = pager(&t, 3);

        let page = load_page(&p, LoadParams::prepend(0, 3));
        assert_eq!(page.data, rows(0..3));
        assert_eq!(page.prev_key, None);
        assert_eq!(page.next_key, Some(3));
    }

    #[test]
    fn test_empty_table() {
        let t = table(0);
        let p = pager(&t, 3);

        let page = load_page(&p, LoadParams::refresh(None, 3));
        assert_eq!(page.data, vec![]);
        assert!(page.is_first());
        assert!(page.is_last());
        assert_eq!(t.executions(QueryKind::Rows), 0, "no row query for an empty window");
    }

    #[test]
    fn test_append_past_shrunk_data() {
        let t = table(10);
        let p = pager(&t, 3);

        for k in 5..10 {
            t.remove(&k);
        }

        let page = load_page(&p, LoadParams::append(6, 3));
        assert_eq!(page.data, vec![]);
        assert_eq!(page.next_key, None);
    }

    #[test]
    fn test_count_is_executed_on_every_load() {
        let t = table(10);
        let p = pager(&t, 3);

        load_page(&p, LoadParams::refresh(None, 3));
        load_page(&p, LoadParams::append(3, 3));
        assert_eq!(t.executions(QueryKind::Count), 2);
        assert_eq!(t.executions(QueryKind::Rows), 2);
    }

    #[test]
    fn test_count_failure_is_an_error() {
        let t = table(10);
        let p = pager(&t, 3);
        t.fail_next(QueryKind::Count, io::Error::new(io::ErrorKind::Other, "disconnected"));

        let tracker = InvalidationTracker::new();
        let res = p.load(&LoadParams::refresh(None, 3), &tracker);

        let err = res.unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(err, PagingError::Query { what: "row count", .. }));
        assert_eq!(t.executions(QueryKind::Rows), 0);

        // Retrying the same load succeeds.
        let page = p.load(&LoadParams::refresh(None, 3), &tracker).unwrap();
        assert_eq!(page.into_page().unwrap().data, rows(0..3));
    }

    #[test]
    fn test_load_on_invalidated_tracker_runs_no_query() {
        let t = table(10);
        let p = pager(&t, 3);
        let tracker = InvalidationTracker::new();
        tracker.invalidate();

        let res = p.load(&LoadParams::refresh(None, 3), &tracker).unwrap();
        assert_eq!(res, LoadResult::Invalid);
        assert_eq!(t.executions(QueryKind::Count), 0);
        assert_eq!(t.listener_count(), 0);
    }

    #[test]
    fn test_tracks_row_query() {
        let t = table(10);
        let p = pager(&t, 3);
        let tracker = InvalidationTracker::new();

        p.load(&LoadParams::refresh(None, 3), &tracker).unwrap();
        assert_eq!(t.listener_count(), 1);

        t.insert(20, 200);
        assert!(tracker.is_invalidated());
        assert_eq!(t.listener_count(), 0);
    }

    #[test]
    fn test_change_during_row_query_is_invalid() {
        let t = table(10);
        let p = pager(&t, 3);
        let tracker = InvalidationTracker::new();
        t.change_during_next(QueryKind::Rows);

        let res = p.load(&LoadParams::refresh(None, 3), &tracker).unwrap();
        assert_eq!(res, LoadResult::Invalid);
        assert!(tracker.is_invalidated());
        assert_eq!(t.executions(QueryKind::Rows), 1);
        assert_eq!(t.listener_count(), 0);
    }

    #[test]
    fn test_change_during_count_query_is_invalid() {
        let t = table(10);
        let p = pager(&t, 3);
        let tracker = InvalidationTracker::new();
        t.change_during_next(QueryKind::Count);

        let res = p.load(&LoadParams::refresh(None, 3), &tracker).unwrap();
        assert_eq!(res, LoadResult::Invalid);
        assert_eq!(t.executions(QueryKind::Rows), 0);
        assert_eq!(t.listener_count(), 0);
    }

    #[test]
    fn test_without_placeholders() {
        let t = table(10);
        let p = OffsetPager::new(
            PagingConfig::new(3).with_placeholders(false),
            t.count_provider(),
            t.offset_provider(),
        )
        .unwrap();

        let page = load_page(&p, LoadParams::refresh(None, 3));
        assert_eq!(page.items_before, None);
        assert_eq!(page.items_after, None);
    }

    #[test]
    fn test_initial_load_size_larger_than_page() {
        let t = table(10);
        let p = OffsetPager::new(
            PagingConfig::new(3).with_initial_load_size(6),
            t.count_provider(),
            t.offset_provider(),
        )
        .unwrap();

        let page = load_page(&p, LoadParams::refresh(Some(4), 6));
        assert_eq!(page.data, rows(4..10));
        assert_eq!(page.prev_key, Some(1));
        assert_eq!(page.next_key, None);
    }

    #[test]
    fn test_refresh_key() {
        let t = table(10);
        let p = OffsetPager::new(
            PagingConfig::new(3).with_initial_load_size(6),
            t.count_provider(),
            t.offset_provider(),
        )
        .unwrap();

        assert!(p.jumping_supported());
        assert_eq!(p.refresh_key(0), Some(0));
        assert_eq!(p.refresh_key(2), Some(0));
        assert_eq!(p.refresh_key(7), Some(3));
        assert_eq!(p.refresh_key(10), Some(6));
    }

    #[test]
    fn test_prepend_after_refresh_key_does_not_overlap() {
        let t = table(10);
        let p = OffsetPager::new(
            PagingConfig::new(3).with_initial_load_size(3),
            t.count_provider(),
            t.offset_provider(),
        )
        .unwrap();

        let key = p.refresh_key(5);
        assert_eq!(key, Some(3));

        let page = load_page(&p, LoadParams::refresh(key, 3));
        assert_eq!(page.data, rows(3..6));

        let prev = load_page(&p, LoadParams::prepend(page.prev_key.unwrap(), 3));
        assert_eq!(prev.data, rows(0..3));
    }

    #[test]
    fn test_prepend_from_unaligned_refresh_overlaps() {
        let t = table(10);
        let p = pager(&t, 3);

        // A refresh at an offset that is not a page start hands out a
        // prev_key whose page reaches into the refreshed one.
        let page = load_page(&p, LoadParams::refresh(Some(1), 3));
        assert_eq!(page.data, rows(1..4));
        assert_eq!(page.prev_key, Some(0));

        let prev = load_page(&p, LoadParams::prepend(0, 3));
        assert_eq!(prev.data, rows(0..3));
    }

    #[test]
    fn test_invalid_config() {
        let t = table(10);
        let res = OffsetPager::new(PagingConfig::new(0), t.count_provider(), t.offset_provider());
        assert!(matches!(res, Err(PagingError::InvalidConfig(_))));
    }
}
