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

use serde::Deserialize;
use serde::Serialize;

use crate::errors::PagingError;

pub const DEFAULT_PAGE_SIZE: u64 = 50;

/// Which engine a session pages with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Offset,
    Keyset,
}

/// Page sizing of a paging session.
///
/// ```
/// use paging_source::PagingConfig;
///
/// let config = PagingConfig::new(20).with_initial_load_size(60);
/// assert_eq!(config.prefetch_distance, 20);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagingConfig {
    /// Number of rows loaded by an append or prepend.
    pub page_size: u64,

    /// Number of rows loaded by the first refresh.
    ///
    /// Keyset sessions require this to equal `page_size`.
    pub initial_load_size: u64,

    /// How close to the edge of loaded data the consumer gets before it
    /// requests the next page. The core only carries it for the consumer.
    pub prefetch_distance: u64,

    /// Whether pages report `items_before`/`items_after` counts so the
    /// consumer can render placeholders.
    pub enable_placeholders: bool,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl PagingConfig {
    pub fn new(page_size: u64) -> Self {
        Self {
            page_size,
            initial_load_size: page_size,
            prefetch_distance: page_size,
            enable_placeholders: true,
        }
    }

    pub fn with_initial_load_size(mut self, size: u64) -> Self {
        self.initial_load_size = size;
        self
    }

    pub fn with_prefetch_distance(mut self, distance: u64) -> Self {
        self.prefetch_distance = distance;
        self
    }

    pub fn with_placeholders(mut self, enable: bool) -> Self {
        self.enable_placeholders = enable;
        self
    }

    /// Check the config is usable with `strategy`.
    pub fn validate(&self, strategy: Strategy) -> Result<(), PagingError> {
        if self.page_size == 0 {
            return Err(PagingError::InvalidConfig(
                "page_size must be greater than 0".to_string(),
            ));
        }
        if self.initial_load_size == 0 {
            return Err(PagingError::InvalidConfig(
                "initial_load_size must be greater than 0".to_string(),
            ));
        }

        // Boundaries are computed once with the initial load size and
        // every later page reuses them.
        if strategy == Strategy::Keyset && self.initial_load_size != self.page_size {
            return Err(PagingError::InvalidConfig(format!(
                "keyset paging requires initial_load_size({}) == page_size({})",
                self.initial_load_size, self.page_size
            )));
        }
        Ok(())
    }
}
