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

//! Defines the capability shared by the offset and keyset engines.

use crate::config::PagingConfig;
use crate::config::Strategy;
use crate::errors::PagingError;
use crate::invalidation::InvalidationTracker;
use crate::key::PagingKey;
use crate::load::LoadParams;
use crate::load::LoadResult;

/// A paging engine: turns a [`LoadParams`] into a bounded query, runs it and
/// computes the keys of the adjacent pages.
///
/// [`PageLoader::load`] blocks on query execution. It is run by a
/// [`PagingSource`](crate::PagingSource) inside its execution context and
/// must register every query it executes with `tracker` before executing it,
/// so that a data change during the load is never missed.
pub trait PageLoader: Send + Sync + 'static {
    type Key: PagingKey;
    type Row: Send + 'static;

    fn strategy(&self) -> Strategy;

    fn config(&self) -> &PagingConfig;

    /// Load one page.
    ///
    /// Returns [`LoadResult::Invalid`] if `tracker` is invalidated before or
    /// during the load.
    fn load(
        &self,
        params: &LoadParams<Self::Key>,
        tracker: &InvalidationTracker,
    ) -> Result<LoadResult<Self::Key, Self::Row>, PagingError>;

    /// Whether a refresh may jump to any position in the data.
    fn jumping_supported(&self) -> bool;

    /// The key a refresh should start from to keep the row at
    /// `anchor_position` visible, if the engine can derive one.
    fn refresh_key(&self, anchor_position: u64) -> Option<Self::Key> {
        let _ = anchor_position;
        None
    }
}
