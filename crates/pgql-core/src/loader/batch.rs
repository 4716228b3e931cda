//! The batch entity loader.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, Instant};

use super::fifo::FifoCache;
use super::key::{EntityKey, GroupKey, LoadRequest};
use super::stats::{LoaderStats, LoaderStatsSnapshot};
use crate::config::LoaderConfig;
use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::query::{QueryBuilder, BATCH_KEY_COLUMN};

type Waiter = oneshot::Sender<Result<Option<Value>>>;

/// Commands for the background task.
#[derive(Debug)]
enum Command {
    /// Open a fresh batch window; flush when it closes.
    ///
    /// Sent for the first request after a flush, so any window still open
    /// belongs to requests an explicit flush already took.
    Arm,
    /// Stop after the running flushes finish. An open window is abandoned.
    Shutdown,
}

#[derive(Debug)]
struct LoaderState {
    /// Resolved entities, `None` for keys with no row.
    results: FifoCache<EntityKey, Option<Value>>,
    /// Queued keys in arrival order.
    pending: Vec<EntityKey>,
    /// Callers of queued keys.
    waiters: HashMap<EntityKey, Vec<Waiter>>,
    /// Callers of keys whose statement is running, by cache generation.
    in_flight: HashMap<(u64, EntityKey), Vec<Waiter>>,
    flush_armed: bool,
    /// Bumped by `clear_cache`; fetches of an older generation are not cached.
    generation: u64,
    closed: bool,
}

enum Registration {
    Ready(Option<Value>),
    Waiting(oneshot::Receiver<Result<Option<Value>>>),
}

struct LoaderInner {
    builder: Arc<QueryBuilder>,
    connection: Arc<dyn Connection>,
    config: LoaderConfig,
    state: Mutex<LoaderState>,
    stats: LoaderStats,
    commands: mpsc::UnboundedSender<Command>,
}

/// Coalesces single-entity lookups of one execution into grouped fetches.
///
/// Every `load` issued within one batch window is grouped by
/// `(type, key_field)` and resolved by a single `key_field IN (...)`
/// statement per group. Identical concurrent requests share one result and
/// resolved entities are kept in a bounded per-loader cache.
///
/// A loader belongs to one logical execution; create one per request.
/// Must be created inside a Tokio runtime.
pub struct BatchLoader {
    inner: Arc<LoaderInner>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl BatchLoader {
    /// Create a loader and start its batch window task.
    pub fn new(
        builder: Arc<QueryBuilder>,
        connection: Arc<dyn Connection>,
        config: LoaderConfig,
    ) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let inner = Arc::new(LoaderInner {
            builder,
            connection,
            state: Mutex::new(LoaderState {
                results: FifoCache::new(config.cache_capacity),
                pending: Vec::new(),
                waiters: HashMap::new(),
                in_flight: HashMap::new(),
                flush_armed: false,
                generation: 0,
                closed: false,
            }),
            config,
            stats: LoaderStats::default(),
            commands,
        });

        let worker = tokio::spawn(run_worker(
            Arc::downgrade(&inner),
            receiver,
            inner.config.batch_window,
        ));

        Self {
            inner,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Load one entity by key.
    ///
    /// Returns `Ok(None)` when no row has the key. The key is validated
    /// before the request joins a batch, so unknown types, non-key fields
    /// and malformed key literals fail immediately.
    pub async fn load(
        &self,
        type_name: &str,
        key_field: &str,
        key_value: &Value,
    ) -> Result<Option<Value>> {
        let key_text = self.inner.builder.batch_key(type_name, key_field, key_value)?;
        let key = EntityKey::new(type_name, key_field, key_text);

        match self.inner.register(key)? {
            Registration::Ready(value) => Ok(value),
            Registration::Waiting(receiver) => receiver.await.map_err(|_| Error::Cancelled)?,
        }
    }

    /// Load many entities concurrently. Results follow input order.
    pub async fn load_many<I, R>(&self, requests: I) -> Vec<Result<Option<Value>>>
    where
        I: IntoIterator<Item = R>,
        R: Into<LoadRequest>,
    {
        let requests: Vec<LoadRequest> = requests.into_iter().map(Into::into).collect();
        join_all(
            requests
                .iter()
                .map(|r| self.load(&r.type_name, &r.key_field, &r.key_value)),
        )
        .await
    }

    /// Fetch every queued request now instead of waiting for the window.
    pub async fn flush(&self) {
        self.inner.flush().await;
    }

    /// Drop cached results.
    ///
    /// Statements already running are detached from the cache: their
    /// callers still receive the rows, but nothing they return is stored,
    /// and later loads of the same keys issue a new fetch.
    pub fn clear_cache(&self) {
        let mut state = self.inner.state.lock();
        state.results.clear();
        state.generation += 1;
        tracing::debug!(generation = state.generation, "loader cache cleared");
    }

    /// Flush queued requests and stop the batch window task.
    ///
    /// Later loads fail with [`Error::Cancelled`].
    pub async fn close(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
        }

        let _ = self.inner.commands.send(Command::Shutdown);
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                tracing::warn!(error = %e, "loader task ended abnormally");
            }
        }
        self.inner.flush().await;
        tracing::debug!(stats = ?self.inner.stats.snapshot(), "loader closed");
    }

    /// Current counters.
    pub fn stats(&self) -> LoaderStatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Number of cached entities.
    pub fn cached_len(&self) -> usize {
        self.inner.state.lock().results.len()
    }
}

impl std::fmt::Debug for BatchLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchLoader")
            .field("config", &self.inner.config)
            .field("stats", &self.inner.stats.snapshot())
            .finish()
    }
}

impl LoaderInner {
    fn register(&self, key: EntityKey) -> Result<Registration> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(Error::Cancelled);
        }
        self.stats.record_request();

        if let Some(value) = state.results.get(&key) {
            self.stats.record_cache_hit();
            return Ok(Registration::Ready(value.clone()));
        }

        let (sender, receiver) = oneshot::channel();
        let generation = state.generation;
        if let Some(waiters) = state.in_flight.get_mut(&(generation, key.clone())) {
            waiters.push(sender);
            self.stats.record_dedup_hit();
            return Ok(Registration::Waiting(receiver));
        }
        if let Some(waiters) = state.waiters.get_mut(&key) {
            waiters.push(sender);
            self.stats.record_dedup_hit();
            return Ok(Registration::Waiting(receiver));
        }

        self.stats.record_cache_miss();
        state.pending.push(key.clone());
        state.waiters.insert(key, vec![sender]);

        if !state.flush_armed {
            state.flush_armed = true;
            drop(state);
            if self.commands.send(Command::Arm).is_err() {
                tracing::warn!("loader task is gone, requests wait for an explicit flush");
            }
        }
        Ok(Registration::Waiting(receiver))
    }

    async fn flush(&self) {
        let (generation, groups) = {
            let mut state = self.state.lock();
            state.flush_armed = false;
            let generation = state.generation;
            let keys = std::mem::take(&mut state.pending);

            let mut groups: Vec<(GroupKey, Vec<String>)> = Vec::new();
            let mut positions: HashMap<GroupKey, usize> = HashMap::new();
            for key in keys {
                let Some(mut waiters) = state.waiters.remove(&key) else {
                    continue;
                };
                // Callers that gave up before the fetch no longer need the key.
                waiters.retain(|w| !w.is_closed());
                if waiters.is_empty() {
                    continue;
                }

                let group = key.group();
                let position = *positions.entry(group.clone()).or_insert_with(|| {
                    groups.push((group, Vec::new()));
                    groups.len() - 1
                });
                groups[position].1.push(key.key_value.clone());
                state
                    .in_flight
                    .entry((generation, key))
                    .or_default()
                    .extend(waiters);
            }
            (generation, groups)
        };

        if groups.is_empty() {
            return;
        }

        let max = self.config.max_batch_size.max(1);
        let batches = groups.into_iter().flat_map(|(group, keys)| {
            keys.chunks(max)
                .map(|chunk| (group.clone(), chunk.to_vec()))
                .collect::<Vec<_>>()
        });
        join_all(batches.map(|(group, keys)| self.fetch_group(generation, group, keys))).await;
    }

    async fn fetch_group(&self, generation: u64, group: GroupKey, keys: Vec<String>) {
        let outcome = self.fetch_rows(&group, &keys).await;

        let mut state = self.state.lock();
        let cache_results = state.generation == generation;
        for key_value in keys {
            let key = EntityKey {
                type_name: group.type_name.clone(),
                key_field: group.key_field.clone(),
                key_value,
            };
            let result = match &outcome {
                Ok(rows) => Ok(rows.get(&key.key_value).cloned()),
                Err(e) => Err(e.clone()),
            };
            let waiters = state
                .in_flight
                .remove(&(generation, key.clone()))
                .unwrap_or_default();
            if cache_results {
                if let Ok(value) = &result {
                    state.results.insert(key, value.clone());
                }
            }
            for waiter in waiters {
                let _ = waiter.send(result.clone());
            }
        }
    }

    async fn fetch_rows(&self, group: &GroupKey, keys: &[String]) -> Result<HashMap<String, Value>> {
        let compiled = self
            .builder
            .build_batch_lookup(&group.type_name, &group.key_field, keys)?;

        self.stats.record_batch();
        tracing::debug!(
            type_name = %group.type_name,
            key_field = %group.key_field,
            keys = keys.len(),
            "issuing batch lookup"
        );

        let rows = self
            .connection
            .fetch(compiled.sql(), compiled.params())
            .await
            .inspect_err(|e| {
                tracing::debug!(type_name = %group.type_name, error = %e, "batch lookup failed");
            })?;

        let mut found = HashMap::with_capacity(rows.len());
        for row in &rows {
            let Some(key) = row.get(BATCH_KEY_COLUMN).and_then(key_text) else {
                tracing::warn!(type_name = %group.type_name, "batch row without a key column");
                continue;
            };
            if !found.contains_key(&key) {
                found.insert(key, compiled.shape_row(row)?);
            }
        }
        Ok(found)
    }
}

fn key_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

async fn run_worker(
    inner: Weak<LoaderInner>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    window: Duration,
) {
    let mut flushes = JoinSet::new();
    let mut deadline: Option<Instant> = None;
    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Arm) => {
                    deadline = Some(Instant::now() + window);
                }
                Some(Command::Shutdown) | None => break,
            },
            _ = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                deadline = None;
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                flushes.spawn(async move { inner.flush().await });
            }
            Some(joined) = flushes.join_next(), if !flushes.is_empty() => {
                if let Err(e) = joined {
                    tracing::warn!(error = %e, "loader flush task failed");
                }
            }
        }
    }
    while let Some(joined) = flushes.join_next().await {
        if let Err(e) = joined {
            tracing::warn!(error = %e, "loader flush task failed");
        }
    }
}
