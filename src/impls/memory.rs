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

//! Provides a simple in-memory data source for the paging engines.
//!
//! [`MemoryTable`] stores rows in a [`BTreeMap`] ordered by key and hands out
//! [`Query`]s over it. Every write notifies the listeners subscribed on any of
//! its queries. It's primarily intended for testing and demonstration
//! purposes: it counts query executions and can inject query failures.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::io;
use std::ops::Bound;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use log::debug;

use crate::keyset::SortOrder;
use crate::query::BoundaryProvider;
use crate::query::ChangeListener;
use crate::query::CountProvider;
use crate::query::KeysetRowProvider;
use crate::query::OffsetRowProvider;
use crate::query::Query;
use crate::query::Subscription;

/// The kinds of query a [`MemoryTable`] serves, for counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum QueryKind {
    Count,
    Rows,
    Boundaries,
}

struct Inner<K, V> {
    rows: BTreeMap<K, V>,
    listeners: BTreeMap<u64, ChangeListener>,
    next_listener_id: u64,
    executions: BTreeMap<QueryKind, u64>,
    failures: BTreeMap<QueryKind, io::Error>,
    changes_during: BTreeSet<QueryKind>,
}

/// An in-memory, ordered table of `(K, V)` rows.
///
/// Cloning is cheap; clones share the same rows and listeners.
///
/// # Examples
///
/// ```
/// use paging_source::impls::memory::MemoryTable;
/// use paging_source::Query;
///
/// let table = MemoryTable::from_iter([(1u64, "a"), (2, "b"), (3, "c")]);
///
/// let rows = table.offset_query(2, 1).execute().unwrap();
/// assert_eq!(rows, vec![(2, "b"), (3, "c")]);
/// ```
pub struct MemoryTable<K, V> {
    inner: Arc<Mutex<Inner<K, V>>>,
}

impl<K, V> Clone for MemoryTable<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V> Default for MemoryTable<K, V> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                rows: BTreeMap::new(),
                listeners: BTreeMap::new(),
                next_listener_id: 0,
                executions: BTreeMap::new(),
                failures: BTreeMap::new(),
                changes_during: BTreeSet::new(),
            })),
        }
    }
}

impl<K, V> fmt::Debug for MemoryTable<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("MemoryTable")
            .field("rows", &inner.rows.len())
            .field("listeners", &inner.listeners.len())
            .field("executions", &inner.executions)
            .finish()
    }
}

impl<K, V> FromIterator<(K, V)> for MemoryTable<K, V>
where K: Ord
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let t = Self::default();
        t.lock().rows.extend(iter);
        t
    }
}

impl<K, V> MemoryTable<K, V> {
    fn lock(&self) -> MutexGuard<'_, Inner<K, V>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of listeners currently subscribed on queries of this table.
    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    /// Number of times a query of `kind` has been executed, including failed executions.
    pub fn executions(&self, kind: QueryKind) -> u64 {
        self.lock().executions.get(&kind).copied().unwrap_or_default()
    }

    /// Make the next execution of a query of `kind` fail with `err`.
    pub fn fail_next(&self, kind: QueryKind, err: io::Error) {
        self.lock().failures.insert(kind, err);
    }

    /// Make the next execution of a query of `kind` notify every listener
    /// after reading the rows, as if a write landed while it ran.
    pub fn change_during_next(&self, kind: QueryKind) {
        self.lock().changes_during.insert(kind);
    }

    /// Call every subscribed listener.
    ///
    /// Listeners run after the table lock is released, so they may
    /// unsubscribe or query the table.
    pub fn notify_changed(&self) {
        let listeners = self.lock().listeners.values().cloned().collect::<Vec<_>>();
        debug!("MemoryTable changed: notify {} listeners", listeners.len());

        for l in listeners {
            l();
        }
    }
}

impl<K, V> MemoryTable<K, V>
where K: Ord
{
    pub fn len(&self) -> usize {
        self.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().rows.is_empty()
    }

    pub fn insert(&self, key: K, value: V) -> Option<V> {
        let prev = self.lock().rows.insert(key, value);
        self.notify_changed();
        prev
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        let prev = self.lock().rows.remove(key);
        self.notify_changed();
        prev
    }
}

impl<K, V> MemoryTable<K, V>
where
    K: Ord + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn query<T, F>(&self, kind: QueryKind, run: F) -> Box<dyn Query<T>>
    where
        T: 'static,
        F: Fn(&BTreeMap<K, V>) -> Vec<T> + Send + Sync + 'static,
    {
        Box::new(MemoryQuery {
            table: self.clone(),
            kind,
            run: Box::new(run),
        })
    }

    /// `SELECT COUNT(*)`
    pub fn count_query(&self) -> Box<dyn Query<u64>> {
        self.query(QueryKind::Count, |rows| vec![rows.len() as u64])
    }

    /// `SELECT * ORDER BY key LIMIT limit OFFSET offset`
    pub fn offset_query(&self, limit: u64, offset: u64) -> Box<dyn Query<(K, V)>> {
        self.query(QueryKind::Rows, move |rows| {
            rows.iter()
                .skip(offset as usize)
                .take(limit as usize)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        })
    }

    /// Rows in `[begin_inclusive, end_exclusive)` in `order`.
    ///
    /// For [`SortOrder::Descending`] the range runs from `begin_inclusive`
    /// down to, but excluding, `end_exclusive`.
    pub fn range_query(
        &self,
        begin_inclusive: K,
        end_exclusive: Option<K>,
        order: SortOrder,
    ) -> Box<dyn Query<(K, V)>> {
        self.query(QueryKind::Rows, move |rows| {
            let b = begin_inclusive.clone();
            let end = end_exclusive.clone();
            let kv = |(k, v): (&K, &V)| (k.clone(), v.clone());

            match order {
                SortOrder::Ascending => {
                    let upper = end.map_or(Bound::Unbounded, Bound::Excluded);
                    rows.range((Bound::Included(b), upper)).map(kv).collect()
                }
                SortOrder::Descending => {
                    let lower = end.map_or(Bound::Unbounded, Bound::Excluded);
                    rows.range((lower, Bound::Included(b))).rev().map(kv).collect()
                }
            }
        })
    }

    /// The first key of every `page_size` rows in `order`.
    ///
    /// The window-function equivalent of
    /// `SELECT key FROM (SELECT key, ROW_NUMBER() OVER (ORDER BY key) AS rn) WHERE rn % page_size = 1`.
    pub fn boundaries_query(&self, page_size: u64, order: SortOrder) -> Box<dyn Query<K>> {
        let step = page_size.max(1) as usize;

        self.query(QueryKind::Boundaries, move |rows| match order {
            SortOrder::Ascending => rows.keys().step_by(step).cloned().collect(),
            SortOrder::Descending => rows.keys().rev().step_by(step).cloned().collect(),
        })
    }

    pub fn count_provider(&self) -> CountProvider {
        let t = self.clone();
        Box::new(move || t.count_query())
    }

    pub fn offset_provider(&self) -> OffsetRowProvider<(K, V)> {
        let t = self.clone();
        Box::new(move |limit, offset| t.offset_query(limit, offset))
    }

    pub fn range_provider(&self, order: SortOrder) -> KeysetRowProvider<K, (K, V)> {
        let t = self.clone();
        Box::new(move |begin: &K, end: Option<&K>| {
            t.range_query(begin.clone(), end.cloned(), order)
        })
    }

    /// The boundary provider ignores the anchor: boundaries always cover the
    /// whole table.
    pub fn boundary_provider(&self, order: SortOrder) -> BoundaryProvider<K> {
        let t = self.clone();
        Box::new(move |_anchor: Option<&K>, page_size: u64| {
            t.boundaries_query(page_size, order)
        })
    }
}

type RunFn<K, V, T> = Box<dyn Fn(&BTreeMap<K, V>) -> Vec<T> + Send + Sync>;

struct MemoryQuery<K, V, T> {
    table: MemoryTable<K, V>,
    kind: QueryKind,
    run: RunFn<K, V, T>,
}

impl<K, V, T> Query<T> for MemoryQuery<K, V, T>
where
    K: Send + 'static,
    V: Send + 'static,
{
    fn execute(&self) -> Result<Vec<T>, io::Error> {
        let mut inner = self.table.lock();
        *inner.executions.entry(self.kind).or_default() += 1;

        if let Some(err) = inner.failures.remove(&self.kind) {
            return Err(err);
        }

        let rows = (self.run)(&inner.rows);
        let changed = inner.changes_during.remove(&self.kind);
        drop(inner);

        if changed {
            self.table.notify_changed();
        }
        Ok(rows)
    }

    fn subscribe(&self, listener: ChangeListener) -> Box<dyn Subscription> {
        let mut inner = self.table.lock();
        let id = inner.next_listener_id;
        inner.next_listener_id += 1;
        inner.listeners.insert(id, listener);

        Box::new(MemorySubscription {
            table: self.table.clone(),
            id,
        })
    }
}

struct MemorySubscription<K, V> {
    table: MemoryTable<K, V>,
    id: u64,
}

impl<K, V> Subscription for MemorySubscription<K, V>
where
    K: Send + 'static,
    V: Send + 'static,
{
    fn unsubscribe(self: Box<Self>) {
        self.table.lock().listeners.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use pretty_assertions::assert_eq;

    use super::*;

    fn table() -> MemoryTable<u64, char> {
        MemoryTable::from_iter((0..10).map(|i| (i, (b'a' + i as u8) as char)))
    }

    #[test]
    fn test_count_and_offset() -> anyhow::Result<()> {
        let t = table();

        assert_eq!(t.count_query().execute()?, vec![10]);
        assert_eq!(t.offset_query(3, 8).execute()?, vec![(8, 'i'), (9, 'j')]);
        assert_eq!(t.offset_query(3, 20).execute()?, vec![]);

        assert_eq!(t.executions(QueryKind::Count), 1);
        assert_eq!(t.executions(QueryKind::Rows), 2);
        Ok(())
    }

    #[test]
    fn test_range_query() -> anyhow::Result<()> {
        let t = table();

        let got = t.range_query(3, Some(6), SortOrder::Ascending).execute()?;
        assert_eq!(got, vec![(3, 'd'), (4, 'e'), (5, 'f')]);

        let got = t.range_query(8, None, SortOrder::Ascending).execute()?;
        assert_eq!(got, vec![(8, 'i'), (9, 'j')]);

        let got = t.range_query(5, Some(2), SortOrder::Descending).execute()?;
        assert_eq!(got, vec![(5, 'f'), (4, 'e'), (3, 'd')]);

        let got = t.range_query(1, None, SortOrder::Descending).execute()?;
        assert_eq!(got, vec![(1, 'b'), (0, 'a')]);
        Ok(())
    }

    #[test]
    fn test_boundaries_query() -> anyhow::Result<()> {
        let t = table();

        assert_eq!(
            t.boundaries_query(3, SortOrder::Ascending).execute()?,
            vec![0, 3, 6, 9]
        );
        assert_eq!(
            t.boundaries_query(4, SortOrder::Descending).execute()?,
            vec![9, 5, 1]
        );
        assert_eq!(
            MemoryTable::<u64, char>::default()
                .boundaries_query(3, SortOrder::Ascending)
                .execute()?,
            Vec::<u64>::new()
        );
        Ok(())
    }

    #[test]
    fn test_fail_next() {
        let t = table();
        t.fail_next(QueryKind::Count, io::Error::new(io::ErrorKind::Other, "x"));

        // Only the matching kind fails, and only once.
        assert!(t.offset_query(1, 0).execute().is_ok());
        assert!(t.count_query().execute().is_err());
        assert!(t.count_query().execute().is_ok());
        assert_eq!(t.executions(QueryKind::Count), 2);
    }

    #[test]
    fn test_change_during_next() -> anyhow::Result<()> {
        let t = table();
        let n = Arc::new(AtomicUsize::new(0));

        let n2 = n.clone();
        let q = t.offset_query(3, 0);
        let _sub = q.subscribe(Arc::new(move || {
            n2.fetch_add(1, Ordering::SeqCst);
        }));
        t.change_during_next(QueryKind::Rows);

        // Rows are still returned; the listener learns they may be stale.
        assert_eq!(q.execute()?, vec![(0, 'a'), (1, 'b'), (2, 'c')]);
        assert_eq!(n.load(Ordering::SeqCst), 1);

        q.execute()?;
        assert_eq!(n.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[test]
    fn test_subscribe_and_notify() {
        let t = table();
        let n = Arc::new(AtomicUsize::new(0));

        let n2 = n.clone();
        let sub = t.count_query().subscribe(Arc::new(move || {
            n2.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(t.listener_count(), 1);

        t.insert(10, 'k');
        t.remove(&0);
        assert_eq!(n.load(Ordering::SeqCst), 2);

        sub.unsubscribe();
        assert_eq!(t.listener_count(), 0);

        t.insert(11, 'l');
        assert_eq!(n.load(Ordering::SeqCst), 2);
        assert_eq!(t.len(), 11);
    }
}
