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

use std::io;

/// Errors returned by a page load.
///
/// An invalidated session is not an error: it is reported as
/// [`LoadResult::Invalid`](crate::LoadResult::Invalid).
#[derive(Debug, thiserror::Error)]
pub enum PagingError {
    /// A count or row query failed to execute.
    ///
    /// The same load may be retried.
    #[error("query failed while loading {what}: {source}")]
    Query {
        what: &'static str,
        #[source]
        source: io::Error,
    },

    /// The one-time page boundary query failed.
    ///
    /// The session is unusable after this and must be replaced.
    #[error("page boundaries query failed: {0}")]
    Boundaries(String),

    /// A keyset load asked for a page size other than the one the
    /// boundaries were computed with.
    #[error("PageSizeMismatch: boundaries computed with page size {expected}, load asked for {actual}")]
    PageSizeMismatch { expected: u64, actual: u64 },

    #[error("invalid paging config: {0}")]
    InvalidConfig(String),

    /// The execution context failed to run the load, e.g. the task panicked.
    #[error("executor failed: {0}")]
    Executor(String),

    /// The load was dropped by the execution context before producing a result.
    #[error("load canceled")]
    Canceled,
}

impl PagingError {
    pub fn query(what: &'static str, source: io::Error) -> Self {
        Self::Query { what, source }
    }

    /// Whether re-issuing the same load on the same session may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Query { .. } | Self::Executor(_) | Self::Canceled)
    }
}

#[cfg(test)]
mod tests {
    use std::io::ErrorKind;

    use super::*;

    #[test]
    fn test_query_error_is_retryable() {
        let e = PagingError::query("count", io::Error::new(ErrorKind::Other, "disconnected"));
        assert!(e.is_retryable());
        assert_eq!(
            e.to_string(),
            "query failed while loading count: disconnected"
        );
    }

    #[test]
    fn test_session_fatal_errors_are_not_retryable() {
        assert!(!PagingError::Boundaries("boom".to_string()).is_retryable());
        assert!(!PagingError::PageSizeMismatch {
            expected: 3,
            actual: 5
        }
        .is_retryable());
        assert!(!PagingError::InvalidConfig("page_size".to_string()).is_retryable());
    }
}
