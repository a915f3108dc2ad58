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

//! # Paging Source
//!
//! Incremental, bounded-memory pagination over a query result set that may
//! change between page loads.
//!
//! A consumer, such as a UI list, asks a [`PagingSource`] for the first page,
//! then for the page after or before a loaded one. Two engines compute the
//! bounded queries:
//!
//! - [`OffsetPager`]: pages are addressed by row offset. A count query runs
//!   on every load, and a refresh may jump to any offset.
//! - [`KeysetPager`]: pages are addressed by the value of an ordered key.
//!   The first key of every page is computed once per session; no jumps.
//!
//! Every query a load executes is observed for data changes. The first change
//! invalidates the session: later loads return [`LoadResult::Invalid`] without
//! touching the data source, and the consumer starts a new session.
//!
//! ## Core Components
//!
//! - [`Query`]: the data source seam, executing a query and reporting changes
//! - [`PageLoader`]: the capability shared by the two engines
//! - [`InvalidationTracker`]: the single listener registration of a session
//! - [`Executor`]: where blocking loads run, [`TokioExecutor`] by default
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use paging_source::impls::memory::MemoryTable;
//! use paging_source::OffsetPager;
//! use paging_source::PagingConfig;
//! use paging_source::PagingError;
//! use paging_source::PagingSource;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), PagingError> {
//!     let table = MemoryTable::from_iter((0..100u64).map(|i| (i, format!("item-{}", i))));
//!
//!     let pager = OffsetPager::new(
//!         PagingConfig::new(20),
//!         table.count_provider(),
//!         table.offset_provider(),
//!     )?;
//!     let source = PagingSource::new(pager);
//!
//!     let mut key = None;
//!     let mut res = source.refresh(key).await?;
//!     while let Some(page) = res.into_page() {
//!         println!("loaded {} rows", page.data.len());
//!         key = page.next_key;
//!         let Some(k) = key else { break };
//!         res = source.append(k).await?;
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod errors;
pub mod executor;
pub mod impls;
pub mod invalidation;
pub mod key;
pub mod keyset;
pub mod load;
pub mod offset;
pub mod page_loader;
pub mod query;
pub mod session;

pub use crate::config::PagingConfig;
pub use crate::config::Strategy;
pub use crate::errors::PagingError;
pub use crate::executor::Executor;
pub use crate::executor::InlineExecutor;
pub use crate::executor::TokioExecutor;
pub use crate::invalidation::InvalidationTracker;
pub use crate::key::PagingKey;
pub use crate::keyset::KeysetPager;
pub use crate::keyset::PageBoundaries;
pub use crate::keyset::SortOrder;
pub use crate::load::LoadParams;
pub use crate::load::LoadResult;
pub use crate::load::LoadType;
pub use crate::load::Page;
pub use crate::offset::OffsetPager;
pub use crate::page_loader::PageLoader;
pub use crate::query::ChangeListener;
pub use crate::query::Query;
pub use crate::query::Subscription;
pub use crate::session::PagingSource;

/// A loaded page of an offset session.
pub type OffsetPage<R> = Page<u64, R>;

/// The paging session type of an offset engine over rows `R`.
pub type OffsetPagingSource<R> = PagingSource<OffsetPager<R>>;

/// The paging session type of a keyset engine over keys `K` and rows `R`.
pub type KeysetPagingSource<K, R> = PagingSource<KeysetPager<K, R>>;
