//! Live queries over a `TodoStore`.
//!
//! A `LiveQuery` yields the current snapshot on its first poll and a fresh
//! snapshot after every store revision change. Revisions that land while a
//! snapshot is being read are coalesced into one follow-up emission.
//!
//! Stores bump the revision while still holding their write lock, so a read
//! that starts and ends on the same revision saw exactly that revision.

use super::{StoreError, StoreResult, TodoStore};
use crate::model::todo::{Quadrant, Todo};
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use tokio::sync::watch;

type Fetch<T> = Arc<dyn Fn() -> StoreResult<T> + Send + Sync>;

/// One emission of a live query.
#[derive(Debug)]
pub struct Revisioned<T> {
    /// Store revision the read started on.
    pub revision: u64,
    /// `false` when a write landed during the read; a follow-up emission
    /// is already pending.
    pub stable: bool,
    pub value: StoreResult<T>,
}

/// Continuously updated read over the store.
///
/// Dropping the query unsubscribes it.
pub struct LiveQuery<T> {
    changes: watch::Receiver<u64>,
    fetch: Fetch<T>,
    primed: bool,
}

impl<T: Send + 'static> LiveQuery<T> {
    pub fn new<F>(changes: watch::Receiver<u64>, fetch: F) -> Self
    where
        F: Fn() -> StoreResult<T> + Send + Sync + 'static,
    {
        Self {
            changes,
            fetch: Arc::new(fetch),
            primed: false,
        }
    }

    /// Waits for the next snapshot.
    ///
    /// Returns `None` once the store has been dropped.
    pub async fn next(&mut self) -> Option<StoreResult<T>> {
        self.next_revisioned().await.map(|emission| emission.value)
    }

    /// Like [`LiveQuery::next`], tagged with the revision it was read at.
    pub async fn next_revisioned(&mut self) -> Option<Revisioned<T>> {
        if self.primed {
            self.changes.changed().await.ok()?;
        }
        self.primed = true;
        // Mark the revision seen before reading so writes racing the read
        // trigger another emission.
        let revision = *self.changes.borrow_and_update();

        let fetch = Arc::clone(&self.fetch);
        let value = match tokio::task::spawn_blocking(move || fetch()).await {
            Ok(result) => result,
            Err(err) => Err(StoreError::Join(err.to_string())),
        };
        let stable = *self.changes.borrow() == revision;
        Some(Revisioned {
            revision,
            stable,
            value,
        })
    }

    /// Reads the current snapshot without waiting for a change.
    pub async fn snapshot(&self) -> StoreResult<T> {
        let fetch = Arc::clone(&self.fetch);
        tokio::task::spawn_blocking(move || fetch())
            .await
            .map_err(|err| StoreError::Join(err.to_string()))?
    }

    pub fn into_stream(self) -> BoxStream<'static, StoreResult<T>> {
        stream::unfold(self, |mut query| async move {
            let item = query.next().await?;
            Some((item, query))
        })
        .boxed()
    }

    pub fn into_revisioned_stream(self) -> BoxStream<'static, Revisioned<T>> {
        stream::unfold(self, |mut query| async move {
            let item = query.next_revisioned().await?;
            Some((item, query))
        })
        .boxed()
    }
}

/// Live `get_all`.
pub fn live_all<S: TodoStore>(store: &Arc<S>) -> LiveQuery<Vec<Todo>> {
    let store_ref = Arc::clone(store);
    LiveQuery::new(store.subscribe_changes(), move || store_ref.get_all())
}

/// Live `get_by_quadrant`.
pub fn live_by_quadrant<S: TodoStore>(store: &Arc<S>, quadrant: Quadrant) -> LiveQuery<Vec<Todo>> {
    let store_ref = Arc::clone(store);
    LiveQuery::new(store.subscribe_changes(), move || {
        store_ref.get_by_quadrant(quadrant)
    })
}

/// Live `search` for a fixed text.
pub fn live_search<S: TodoStore>(store: &Arc<S>, text: impl Into<String>) -> LiveQuery<Vec<Todo>> {
    let store_ref = Arc::clone(store);
    let text = text.into();
    LiveQuery::new(store.subscribe_changes(), move || store_ref.search(&text))
}

/// Live `get_upcoming`; `now_ms` is sampled on every re-read.
pub fn live_upcoming<S, N>(store: &Arc<S>, now_ms: N) -> LiveQuery<Vec<Todo>>
where
    S: TodoStore,
    N: Fn() -> i64 + Send + Sync + 'static,
{
    let store_ref = Arc::clone(store);
    LiveQuery::new(store.subscribe_changes(), move || {
        store_ref.get_upcoming(now_ms())
    })
}
