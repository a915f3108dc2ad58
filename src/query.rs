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

//! Defines the query execution interface consumed by the paging engines.
//!
//! A [`Query`] is a re-executable request against the data source. Executing
//! it blocks on I/O; the engines only ever call it from inside the execution
//! context of a [`PagingSource`](crate::PagingSource).

use std::io;
use std::sync::Arc;

/// Callback invoked when data that a query depends on may have changed.
///
/// False positives are acceptable, false negatives are not.
pub type ChangeListener = Arc<dyn Fn() + Send + Sync>;

/// A registered [`ChangeListener`], removed by [`Subscription::unsubscribe`].
pub trait Subscription: Send {
    /// Remove the listener from the query it was registered on.
    fn unsubscribe(self: Box<Self>);
}

/// A parameterized, re-executable query producing an ordered sequence of rows.
///
/// # Contract
///
/// The listener passed to [`Query::subscribe`] must not be invoked
/// synchronously from within `subscribe()` or `unsubscribe()`: the
/// invalidation tracker holds its lock across both calls.
pub trait Query<T>: Send + Sync {
    /// Execute the query and return all rows in order.
    fn execute(&self) -> Result<Vec<T>, io::Error>;

    /// Register `listener` to be called whenever the data this query reads may change.
    fn subscribe(&self, listener: ChangeListener) -> Box<dyn Subscription>;
}

/// Builds the row query of an offset page: `(limit, offset)`.
pub type OffsetRowProvider<R> = Box<dyn Fn(u64, u64) -> Box<dyn Query<R>> + Send + Sync>;

/// Builds the query counting all rows of the result set.
pub type CountProvider = Box<dyn Fn() -> Box<dyn Query<u64>> + Send + Sync>;

/// Builds the row query of a keyset page: `(begin_inclusive, end_exclusive)`.
///
/// `end_exclusive` is `None` for the last page.
pub type KeysetRowProvider<K, R> =
    Box<dyn Fn(&K, Option<&K>) -> Box<dyn Query<R>> + Send + Sync>;

/// Builds the query returning the first key of every page: `(anchor, page_size)`.
pub type BoundaryProvider<K> = Box<dyn Fn(Option<&K>, u64) -> Box<dyn Query<K>> + Send + Sync>;

impl<T, Q> Query<T> for Box<Q>
where Q: Query<T> + ?Sized
{
    fn execute(&self) -> Result<Vec<T>, io::Error> {
        (**self).execute()
    }

    fn subscribe(&self, listener: ChangeListener) -> Box<dyn Subscription> {
        (**self).subscribe(listener)
    }
}
