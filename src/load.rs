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

//! Page load requests and their outcomes.

use std::fmt;

/// The direction of a page load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadType {
    /// Initial load, or a reload around an anchor.
    Refresh,
    /// Load the page after the last loaded one.
    Append,
    /// Load the page before the first loaded one.
    Prepend,
}

impl fmt::Display for LoadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadType::Refresh => write!(f, "refresh"),
            LoadType::Append => write!(f, "append"),
            LoadType::Prepend => write!(f, "prepend"),
        }
    }
}

/// A single page load request.
///
/// `key` is the anchor of a refresh (`None` for the start of the data), or
/// the `next_key`/`prev_key` of a previously loaded page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadParams<K> {
    pub load_type: LoadType,
    pub key: Option<K>,
    pub load_size: u64,
}

impl<K> LoadParams<K> {
    pub fn refresh(key: Option<K>, load_size: u64) -> Self {
        Self {
            load_type: LoadType::Refresh,
            key,
            load_size,
        }
    }

    pub fn append(key: K, load_size: u64) -> Self {
        Self {
            load_type: LoadType::Append,
            key: Some(key),
            load_size,
        }
    }

    pub fn prepend(key: K, load_size: u64) -> Self {
        Self {
            load_type: LoadType::Prepend,
            key: Some(key),
            load_size,
        }
    }
}

/// One loaded page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<K, R> {
    pub data: Vec<R>,

    /// Key to prepend the page before this one, `None` at the start of the data.
    pub prev_key: Option<K>,

    /// Key to append the page after this one, `None` at the end of the data.
    pub next_key: Option<K>,

    /// Number of rows before this page, if known.
    pub items_before: Option<u64>,

    /// Number of rows after this page, if known.
    pub items_after: Option<u64>,
}

impl<K, R> Page<K, R> {
    pub fn new(data: Vec<R>, prev_key: Option<K>, next_key: Option<K>) -> Self {
        Self {
            data,
            prev_key,
            next_key,
            items_before: None,
            items_after: None,
        }
    }

    /// An empty page with no further data in either direction.
    pub fn empty() -> Self {
        Self::new(vec![], None, None)
    }

    pub fn with_counts(mut self, items_before: u64, items_after: u64) -> Self {
        self.items_before = Some(items_before);
        self.items_after = Some(items_after);
        self
    }

    /// No more data can be appended after this page.
    pub fn is_last(&self) -> bool {
        self.next_key.is_none()
    }

    /// No more data can be prepended before this page.
    pub fn is_first(&self) -> bool {
        self.prev_key.is_none()
    }
}

/// Outcome of a page load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadResult<K, R> {
    Page(Page<K, R>),

    /// The session was invalidated; the consumer must discard it and start a
    /// new one. Never retried in place.
    Invalid,
}

impl<K, R> LoadResult<K, R> {
    pub fn is_invalid(&self) -> bool {
        matches!(self, LoadResult::Invalid)
    }

    pub fn page(&self) -> Option<&Page<K, R>> {
        match self {
            LoadResult::Page(p) => Some(p),
            LoadResult::Invalid => None,
        }
    }

    pub fn into_page(self) -> Option<Page<K, R>> {
        match self {
            LoadResult::Page(p) => Some(p),
            LoadResult::Invalid => None,
        }
    }
}

impl<K, R> From<Page<K, R>> for LoadResult<K, R> {
    fn from(p: Page<K, R>) -> Self {
        LoadResult::Page(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_terminal_flags() {
        let p: Page<u64, u64> = Page::empty();
        assert!(p.is_first());
        assert!(p.is_last());

        let p = Page::new(vec![3, 4, 5], Some(0), Some(6)).with_counts(3, 4);
        assert!(!p.is_first());
        assert!(!p.is_last());
        assert_eq!(p.items_before, Some(3));
        assert_eq!(p.items_after, Some(4));
    }

    #[test]
    fn test_load_result_accessors() {
        let r: LoadResult<u64, u64> = Page::new(vec![1], None, None).into();
        assert!(!r.is_invalid());
        assert_eq!(r.page().map(|p| p.data.len()), Some(1));

        let r: LoadResult<u64, u64> = LoadResult::Invalid;
        assert!(r.is_invalid());
        assert_eq!(r.into_page(), None);
    }

    #[test]
    fn test_load_params() {
        let p = LoadParams::append(6u64, 3);
        assert_eq!(p.load_type, LoadType::Append);
        assert_eq!(p.key, Some(6));
        assert_eq!(p.load_type.to_string(), "append");

        let p = LoadParams::<u64>::refresh(None, 9);
        assert_eq!(p.load_type, LoadType::Refresh);
        assert_eq!(p.key, None);
    }
}
