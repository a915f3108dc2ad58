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

use crate::load::LoadType;

/// The `(offset, limit)` of one offset page, clamped to the current row count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: u64,
    pub limit: u64,
}

impl Window {
    /// Compute the window of a load of `load_size` rows at `key` over `total` rows.
    ///
    /// A refresh is an anchored jump and is clamped to
    /// `[0, max(total - load_size, 0)]` so that it always fills a page when
    /// enough rows exist. Appends and prepends start exactly at the key the
    /// previous page handed out, clamped to `[0, total]` in case the data
    /// shrank.
    pub fn new(load_type: LoadType, key: Option<u64>, load_size: u64, total: u64) -> Self {
        let requested = key.unwrap_or(0);

        let offset = match load_type {
            LoadType::Refresh => requested.min(total.saturating_sub(load_size)),
            LoadType::Append | LoadType::Prepend => requested.min(total),
        };

        let limit = load_size.min(total - offset);

        Self { offset, limit }
    }

    pub fn is_empty(&self) -> bool {
        self.limit == 0
    }

    /// Key of the page before a page starting at `offset`:
    /// `max(offset - page_size, 0)`.
    ///
    /// If `offset` is not a multiple of `page_size`, the page at the returned
    /// key overlaps this one and a prepend delivers those rows again, e.g. a
    /// refresh at offset 1 with page size 3 yields rows `[1, 4)` and a prepend
    /// at 0 yields rows `[0, 3)`. Refresh keys from
    /// [`OffsetPager::refresh_key`](crate::OffsetPager) are page aligned.
    pub fn prev_key(&self, page_size: u64) -> Option<u64> {
        if self.offset > 0 {
            Some(self.offset.saturating_sub(page_size))
        } else {
            None
        }
    }

    /// Key of the page after this one, given it returned `len` rows.
    pub fn next_key(&self, len: u64, total: u64) -> Option<u64> {
        let end = self.offset + len;
        if end < total {
            Some(end)
        } else {
            None
        }
    }
}
