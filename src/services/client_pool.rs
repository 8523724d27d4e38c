//! Credential-scoped upstream clients
//!
//! Each distinct API key gets its own `ZyfaiClient` (the key travels as a
//! default header). Instances are kept in a bounded cache; once it is full
//! the oldest inserted key is evicted (strict FIFO, lookups do not refresh
//! an entry's position).

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::zyfai::ApiError;
use crate::services::zyfai_api::ZyfaiClient;

struct PoolInner {
    clients: HashMap<String, ZyfaiClient>,
    insertion_order: VecDeque<String>,
}

#[derive(Clone)]
pub struct ClientPool {
    base_url: String,
    timeout: Duration,
    capacity: usize,
    inner: Arc<Mutex<PoolInner>>,
}

impl ClientPool {
    pub fn new(base_url: String, timeout: Duration, capacity: usize) -> Self {
        Self {
            base_url,
            timeout,
            capacity: capacity.max(1),
            inner: Arc::new(Mutex::new(PoolInner {
                clients: HashMap::new(),
                insertion_order: VecDeque::new(),
            })),
        }
    }

    /// Client bound to `api_key`, created on first use
    pub fn client_for(&self, api_key: &str) -> Result<ZyfaiClient, ApiError> {
        let mut inner = self.inner.lock();
        if let Some(client) = inner.clients.get(api_key) {
            return Ok(client.clone());
        }

        let client = ZyfaiClient::new(&self.base_url, api_key, self.timeout)?;

        while inner.clients.len() >= self.capacity {
            let Some(oldest) = inner.insertion_order.pop_front() else {
                break;
            };
            inner.clients.remove(&oldest);
            tracing::debug!(capacity = self.capacity, "Evicted oldest credential-scoped client");
        }

        inner.clients.insert(api_key.to_string(), client.clone());
        inner.insertion_order.push_back(api_key.to_string());
        Ok(client)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, api_key: &str) -> bool {
        self.inner.lock().clients.contains_key(api_key)
    }
}
