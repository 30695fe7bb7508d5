//! DataLoader utilities for batch loading
//!
//! Implements the DataLoader pattern for preventing N+1 query problems.
//! See: https://github.com/graphql/dataloader

use async_trait::async_trait;
use std::collections::HashMap;
use std::hash::Hash;
use std::mem;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};

use crate::errors::ServiceError;

/// Batch loader trait for loading multiple items at once
#[async_trait]
pub trait BatchLoader<K, V>: Send + Sync
where
    K: Send + Sync + Clone + Eq + Hash,
    V: Send + Sync + Clone,
{
    /// Load batch of items by keys
    ///
    /// This method should fetch all items for the given keys in a single
    /// service call. Keys without a result are simply left out of the map.
    async fn load_batch(&self, keys: &[K]) -> Result<HashMap<K, V>, ServiceError>;
}

type Waiter<V> = oneshot::Sender<Result<Option<V>, ServiceError>>;

struct BatchState<K, V> {
    /// Fetched keys, including the ones the batch loader did not return
    cache: HashMap<K, Option<V>>,
    /// Keys waiting for the next dispatch, in first-request order
    pending: Vec<K>,
    /// Waiters for every key that is pending or in flight
    waiters: HashMap<K, Vec<Waiter<V>>>,
    dispatch_scheduled: bool,
}

/// DataLoader with caching and batching
///
/// Every `load` issued before the batch window closes joins the same batch.
/// A load for a key whose batch is already in flight waits on that batch.
/// The batch is dispatched from a spawned task, so loads must run inside a
/// tokio runtime. One loader is built per request and dropped with it.
pub struct DataLoader<K, V, L>
where
    K: Send + Sync + Clone + Eq + Hash + 'static,
    V: Send + Sync + Clone + 'static,
    L: BatchLoader<K, V> + 'static,
{
    name: &'static str,
    loader: Arc<L>,
    state: Arc<Mutex<BatchState<K, V>>>,
    delay: Duration,
    max_batch_size: usize,
}

impl<K, V, L> DataLoader<K, V, L>
where
    K: Send + Sync + Clone + Eq + Hash + 'static,
    V: Send + Sync + Clone + 'static,
    L: BatchLoader<K, V> + 'static,
{
    /// Create new DataLoader with a batch loader
    pub fn new(name: &'static str, loader: L) -> Self {
        Self {
            name,
            loader: Arc::new(loader),
            state: Arc::new(Mutex::new(BatchState {
                cache: HashMap::new(),
                pending: Vec::new(),
                waiters: HashMap::new(),
                dispatch_scheduled: false,
            })),
            delay: Duration::from_millis(1),
            max_batch_size: 100,
        }
    }

    /// How long the loader waits for more keys before dispatching
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Upper bound on the number of keys in one batch call
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size.max(1);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Load a single item by key
    ///
    /// Resolves once the batch holding this key has been fetched. A key the
    /// batch loader did not return resolves to `None`.
    pub async fn load(&self, key: K) -> Result<Option<V>, ServiceError> {
        let receiver = {
            let mut state = self.state.lock().await;
            if let Some(value) = state.cache.get(&key) {
                return Ok(value.clone());
            }
            self.enqueue(&mut state, key)
        };

        self.wait(receiver).await
    }

    /// Load multiple items by keys
    ///
    /// All uncached keys join the current batch together.
    pub async fn load_many(&self, keys: Vec<K>) -> Result<HashMap<K, V>, ServiceError> {
        let mut result = HashMap::new();
        let mut receivers = Vec::new();

        {
            let mut state = self.state.lock().await;
            for key in keys {
                match state.cache.get(&key) {
                    Some(Some(value)) => {
                        result.insert(key, value.clone());
                    }
                    Some(None) => {}
                    None => {
                        let receiver = self.enqueue(&mut state, key.clone());
                        receivers.push((key, receiver));
                    }
                }
            }
        }

        for (key, receiver) in receivers {
            if let Some(value) = self.wait(receiver).await? {
                result.insert(key, value);
            }
        }

        Ok(result)
    }

    /// Clear the cache
    ///
    /// Loads already in flight still complete and repopulate their keys.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.cache.clear();
    }

    /// Prime the cache with a value
    ///
    /// Useful for seeding the cache with models a resolver already holds.
    pub async fn prime(&self, key: K, value: V) {
        let mut state = self.state.lock().await;
        state.cache.insert(key, Some(value));
    }

    fn enqueue(
        &self,
        state: &mut BatchState<K, V>,
        key: K,
    ) -> oneshot::Receiver<Result<Option<V>, ServiceError>> {
        let (sender, receiver) = oneshot::channel();

        if let Some(waiters) = state.waiters.get_mut(&key) {
            waiters.push(sender);
            return receiver;
        }

        state.waiters.insert(key.clone(), vec![sender]);
        state.pending.push(key);

        if !state.dispatch_scheduled {
            state.dispatch_scheduled = true;
            tokio::spawn(dispatch(
                self.name,
                self.loader.clone(),
                self.state.clone(),
                self.delay,
                self.max_batch_size,
            ));
        }

        receiver
    }

    async fn wait(
        &self,
        receiver: oneshot::Receiver<Result<Option<V>, ServiceError>>,
    ) -> Result<Option<V>, ServiceError> {
        receiver.await.map_err(|_| {
            ServiceError::internal(format!("dataloader {} dropped a pending load", self.name))
        })?
    }
}

#[tracing::instrument(level = "debug", skip(loader, state))]
async fn dispatch<K, V, L>(
    name: &'static str,
    loader: Arc<L>,
    state: Arc<Mutex<BatchState<K, V>>>,
    delay: Duration,
    max_batch_size: usize,
) where
    K: Send + Sync + Clone + Eq + Hash + 'static,
    V: Send + Sync + Clone + 'static,
    L: BatchLoader<K, V> + 'static,
{
    tokio::time::sleep(delay).await;

    // Waiters stay registered until their batch settles, so later loads of
    // these keys join them instead of queueing a second fetch
    let keys = {
        let mut state = state.lock().await;
        state.dispatch_scheduled = false;
        mem::take(&mut state.pending)
    };

    for chunk in keys.chunks(max_batch_size) {
        tracing::debug!(loader = name, keys = chunk.len(), "dispatching batch");

        let result = loader.load_batch(chunk).await;
        let mut state = state.lock().await;

        match result {
            Ok(mut values) => {
                for key in chunk {
                    let value = values.remove(key);
                    state.cache.insert(key.clone(), value.clone());
                    for waiter in state.waiters.remove(key).unwrap_or_default() {
                        let _ = waiter.send(Ok(value.clone()));
                    }
                }
            }
            Err(err) => {
                tracing::debug!(loader = name, error = %err, "batch load failed");
                for key in chunk {
                    for waiter in state.waiters.remove(key).unwrap_or_default() {
                        let _ = waiter.send(Err(err.clone()));
                    }
                }
            }
        }
    }
}

impl<K, V, L> Clone for DataLoader<K, V, L>
where
    K: Send + Sync + Clone + Eq + Hash + 'static,
    V: Send + Sync + Clone + 'static,
    L: BatchLoader<K, V> + 'static,
{
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            loader: self.loader.clone(),
            state: self.state.clone(),
            delay: self.delay,
            max_batch_size: self.max_batch_size,
        }
    }
}
