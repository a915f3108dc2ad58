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

use std::fmt;

/// Trait for types that identify a position in keyset paging.
///
/// # Requirements
///
/// - **Ordering**: `Ord` locates a key among the page boundaries by binary search
/// - **Cloning**: `Clone` hands boundary keys out as `prev_key`/`next_key`
/// - **Threading**: `Send + Sync` lets loads run in the execution context
/// - **Debugging**: `Debug` is used in load logs
///
/// # Automatic Implementation
///
/// This trait is automatically implemented for any type that meets the trait bounds,
/// e.g. `u64`, `String`, `(i64, u64)` or a custom struct deriving the required traits.
/// Offset paging always uses `u64` keys.
pub trait PagingKey
where Self: Clone + Ord + fmt::Debug + Send + Sync + 'static
{
}

impl<K> PagingKey for K where K: Clone + Ord + fmt::Debug + Send + Sync + 'static {}
