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

use std::cmp::Ordering;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Order of the key column the rows are sorted by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    /// Compare two keys by their position in the sorted rows.
    pub fn compare<K: Ord>(&self, a: &K, b: &K) -> Ordering {
        match self {
            SortOrder::Ascending => a.cmp(b),
            SortOrder::Descending => b.cmp(a),
        }
    }
}

/// The key range of one keyset page, borrowed from [`PageBoundaries`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange<'a, K> {
    /// Index of the page.
    pub index: usize,
    pub begin_inclusive: &'a K,
    /// `None` for the last page.
    pub end_exclusive: Option<&'a K>,
    /// First key of the page before, `None` for the first page.
    pub prev: Option<&'a K>,
}

/// The first key of every fixed-size page of the data set, as of the time
/// they were computed.
#[derive(Clone, PartialEq, Eq)]
pub struct PageBoundaries<K> {
    keys: Vec<K>,
    order: SortOrder,
    page_size: u64,
}

impl<K> fmt::Debug for PageBoundaries<K>
where K: fmt::Debug
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageBoundaries")
            .field("order", &self.order)
            .field("page_size", &self.page_size)
            .field("len", &self.keys.len())
            .field("first", &self.keys.first())
            .field("last", &self.keys.last())
            .finish()
    }
}

impl<K> PageBoundaries<K>
where K: Ord
{
    /// Build boundaries from keys returned by a boundary query.
    ///
    /// Returns an error message if `keys` are not strictly monotonic in `order`.
    pub fn new(keys: Vec<K>, order: SortOrder, page_size: u64) -> Result<Self, String> {
        for (i, pair) in keys.windows(2).enumerate() {
            if order.compare(&pair[0], &pair[1]) != Ordering::Less {
                return Err(format!(
                    "boundaries are not strictly {:?} at index {}",
                    order,
                    i + 1
                ));
            }
        }

        Ok(Self {
            keys,
            order,
            page_size,
        })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    /// Index of the page containing `key`: the last boundary not after `key`.
    ///
    /// A key sorting before every boundary resolves to the first page.
    /// Returns `None` only if there are no boundaries.
    pub fn position(&self, key: &K) -> Option<usize> {
        if self.keys.is_empty() {
            return None;
        }

        let not_after = self
            .keys
            .partition_point(|b| self.order.compare(b, key) != Ordering::Greater);

        Some(not_after.saturating_sub(1))
    }

    /// The key range of the page at `index`.
    pub fn page(&self, index: usize) -> Option<PageRange<'_, K>> {
        let begin_inclusive = self.keys.get(index)?;

        Some(PageRange {
            index,
            begin_inclusive,
            end_exclusive: self.keys.get(index + 1),
            prev: index.checked_sub(1).and_then(|i| self.keys.get(i)),
        })
    }

    /// The range of the page containing `key`, or of the first page if `key` is `None`.
    pub fn locate(&self, key: Option<&K>) -> Option<PageRange<'_, K>> {
        let index = match key {
            Some(k) => self.position(k)?,
            None => 0,
        };
        self.page(index)
    }
}
