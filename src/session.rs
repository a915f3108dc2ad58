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

//! The paging session: the uniform load contract consumed by a paging UI.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::channel::oneshot;
use futures_util::FutureExt;
use log::debug;

use crate::config::PagingConfig;
use crate::config::Strategy;
use crate::errors::PagingError;
use crate::executor::run_blocking;
use crate::executor::Executor;
use crate::executor::TokioExecutor;
use crate::invalidation::InvalidationTracker;
use crate::load::LoadParams;
use crate::load::LoadResult;
use crate::page_loader::PageLoader;

/// Result of [`PagingSource::load`].
pub type SourceLoadResult<L> =
    Result<LoadResult<<L as PageLoader>::Key, <L as PageLoader>::Row>, PagingError>;

/// One paging session over a query result set.
///
/// The paging strategy is the type of the loader `L` and can not change for
/// the life of the session. Once invalidated, by a data change or by
/// [`PagingSource::invalidate`], every load returns [`LoadResult::Invalid`]
/// without touching the data source and the consumer has to build a new
/// session.
///
/// Dropping the source discards the session: the listener on the current
/// query is removed and invalidation callbacks are not run.
///
/// # Examples
///
/// ```
/// use paging_source::impls::memory::MemoryTable;
/// use paging_source::InlineExecutor;
/// use paging_source::OffsetPager;
/// use paging_source::PagingConfig;
/// use paging_source::PagingSource;
///
/// # futures::executor::block_on(async {
/// let table = MemoryTable::from_iter((0..10u64).map(|i| (i, i)));
/// let pager = OffsetPager::new(
///     PagingConfig::new(3),
///     table.count_provider(),
///     table.offset_provider(),
/// )?;
/// let source = PagingSource::with_executor(pager, InlineExecutor);
///
/// let page = source.refresh(None).await?.into_page().unwrap();
/// assert_eq!(page.next_key, Some(3));
/// # Ok::<(), paging_source::PagingError>(())
/// # }).unwrap();
/// ```
pub struct PagingSource<L: PageLoader> {
    loader: Arc<L>,
    tracker: InvalidationTracker,
    executor: Arc<dyn Executor>,
}

impl<L> fmt::Debug for PagingSource<L>
where L: PageLoader + fmt::Debug
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PagingSource")
            .field("loader", &self.loader)
            .field("tracker", &self.tracker)
            .finish_non_exhaustive()
    }
}

impl<L: PageLoader> Drop for PagingSource<L> {
    fn drop(&mut self) {
        self.tracker.discard();
    }
}

impl<L: PageLoader> PagingSource<L> {
    /// Create a session running loads on the current tokio runtime's
    /// blocking pool.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn new(loader: L) -> Self {
        Self::with_executor(loader, TokioExecutor::current())
    }

    pub fn with_executor(loader: L, executor: impl Executor) -> Self {
        Self {
            loader: Arc::new(loader),
            tracker: InvalidationTracker::new(),
            executor: Arc::new(executor),
        }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn config(&self) -> &PagingConfig {
        self.loader.config()
    }

    pub fn strategy(&self) -> Strategy {
        self.loader.strategy()
    }

    pub fn jumping_supported(&self) -> bool {
        self.loader.jumping_supported()
    }

    /// See [`PageLoader::refresh_key`].
    pub fn refresh_key(&self, anchor_position: u64) -> Option<L::Key> {
        self.loader.refresh_key(anchor_position)
    }

    /// Load one page.
    ///
    /// The blocking part runs in the session's execution context. Dropping
    /// the returned future abandons the result; the listener registration
    /// stays bounded to the one held by the session.
    pub async fn load(&self, params: LoadParams<L::Key>) -> SourceLoadResult<L> {
        if self.tracker.is_invalidated() {
            debug!(
                "{} load on invalidated {:?} session",
                params.load_type,
                self.strategy()
            );
            return Ok(LoadResult::Invalid);
        }

        let loader = self.loader.clone();
        let tracker = self.tracker.clone();

        run_blocking(&*self.executor, move || loader.load(&params, &tracker)).await?
    }

    /// Load the first page, or the page around `key`, with the initial load size.
    pub async fn refresh(&self, key: Option<L::Key>) -> SourceLoadResult<L> {
        let size = self.config().initial_load_size;
        self.load(LoadParams::refresh(key, size)).await
    }

    /// Load the page starting at the `next_key` of a loaded page.
    pub async fn append(&self, key: L::Key) -> SourceLoadResult<L> {
        let size = self.config().page_size;
        self.load(LoadParams::append(key, size)).await
    }

    /// Load the page starting at the `prev_key` of a loaded page.
    pub async fn prepend(&self, key: L::Key) -> SourceLoadResult<L> {
        let size = self.config().page_size;
        self.load(LoadParams::prepend(key, size)).await
    }

    /// Invalidate the session, e.g. because the consumer knows the data changed.
    pub fn invalidate(&self) {
        self.tracker.invalidate();
    }

    pub fn is_invalidated(&self) -> bool {
        self.tracker.is_invalidated()
    }

    /// Register `callback` to run once when the session is invalidated.
    pub fn on_invalidated(&self, callback: impl FnOnce() + Send + 'static) {
        self.tracker.on_invalidated(callback);
    }

    /// A future that resolves when the session is invalidated or discarded.
    pub fn invalidated(&self) -> impl Future<Output = ()> + Send + 'static {
        let (tx, rx) = oneshot::channel::<()>();
        self.tracker.on_invalidated(move || {
            let _ = tx.send(());
        });
        // A discarded session drops the sender, which resolves the receiver too.
        rx.map(|_| ())
    }
}
