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

//! Execution contexts that run a blocking page load off the caller's task.

use std::fmt;
use std::panic;

use futures::channel::oneshot;
use log::warn;

use crate::errors::PagingError;

/// A unit of blocking work, such as executing a query.
pub type BlockingTask = Box<dyn FnOnce() + Send + 'static>;

/// Runs blocking work on behalf of a paging session.
///
/// Implementations decide where `task` runs. The default is
/// [`TokioExecutor`], which uses tokio's blocking thread pool.
#[async_trait::async_trait]
pub trait Executor: Send + Sync + 'static {
    /// Run `task` to completion.
    ///
    /// Returns an error if `task` could not be run or panicked.
    async fn run(&self, task: BlockingTask) -> Result<(), PagingError>;
}

/// Runs tasks with [`tokio::task::spawn_blocking`] on a runtime handle.
#[derive(Clone)]
pub struct TokioExecutor {
    handle: tokio::runtime::Handle,
}

impl fmt::Debug for TokioExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioExecutor").finish_non_exhaustive()
    }
}

impl TokioExecutor {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Use the runtime the caller is running in.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }
}

#[async_trait::async_trait]
impl Executor for TokioExecutor {
    async fn run(&self, task: BlockingTask) -> Result<(), PagingError> {
        self.handle.spawn_blocking(task).await.map_err(|e| {
            warn!("blocking page load did not complete: {}", e);
            if e.is_cancelled() {
                PagingError::Canceled
            } else {
                PagingError::Executor(e.to_string())
            }
        })
    }
}

/// Runs tasks directly on the thread polling the load.
///
/// Suitable for tests and for data sources that never block.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

#[async_trait::async_trait]
impl Executor for InlineExecutor {
    async fn run(&self, task: BlockingTask) -> Result<(), PagingError> {
        panic::catch_unwind(panic::AssertUnwindSafe(task)).map_err(|_| {
            warn!("inline page load panicked");
            PagingError::Executor("task panicked".to_string())
        })
    }
}

/// Run `f` on `executor` and return its output.
///
/// If the returned future is dropped the output of `f` is discarded.
pub async fn run_blocking<E, F, T>(executor: &E, f: F) -> Result<T, PagingError>
where
    E: Executor + ?Sized,
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let (tx, rx) = oneshot::channel();

    executor
        .run(Box::new(move || {
            // The receiver is gone if the load was canceled.
            let _ = tx.send(f());
        }))
        .await?;

    rx.await.map_err(|_| PagingError::Canceled)
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[tokio::test]
    async fn test_inline_executor() -> anyhow::Result<()> {
        let caller = thread::current().id();
        let got = run_blocking(&InlineExecutor, move || thread::current().id() == caller).await?;
        assert!(got);
        Ok(())
    }

    #[tokio::test]
    async fn test_inline_executor_panic() {
        let res: Result<u64, _> = run_blocking(&InlineExecutor, || panic!("boom")).await;
        assert!(matches!(res, Err(PagingError::Executor(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_tokio_executor_runs_off_thread() -> anyhow::Result<()> {
        let caller = thread::current().id();
        let got = run_blocking(&TokioExecutor::current(), move || {
            thread::current().id() != caller
        })
        .await?;
        assert!(got);
        Ok(())
    }

    #[tokio::test]
    async fn test_tokio_executor_panic() {
        let res: Result<u64, _> = run_blocking(&TokioExecutor::current(), || panic!("boom")).await;
        assert!(matches!(res, Err(PagingError::Executor(_))));
    }

    #[tokio::test]
    async fn test_dyn_executor() -> anyhow::Result<()> {
        let executor: Box<dyn Executor> = Box::new(InlineExecutor);
        let got = run_blocking(&*executor, || 3 + 4).await?;
        assert_eq!(got, 7);
        Ok(())
    }
}
