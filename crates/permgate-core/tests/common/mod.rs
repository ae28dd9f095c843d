//! In-memory store driver with call counters for lookup tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use permgate_core::{KvDriver, PermError, PermResult};

const WRONGTYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";

enum Stored {
    Hash(Vec<(String, String)>),
    Plain(String),
}

pub struct MemoryDriver {
    data: Mutex<HashMap<String, Stored>>,
    broken_hash_keys: Mutex<HashSet<String>>,
    broken_scalar_keys: Mutex<HashSet<String>>,
    undecodable_keys: Mutex<HashSet<String>>,
    replication_info: Option<String>,
    ping_ok: bool,
    latency: Option<Duration>,
    hash_calls: AtomicUsize,
    scalar_calls: AtomicUsize,
    closed: AtomicBool,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(HashMap::new()),
            broken_hash_keys: Mutex::new(HashSet::new()),
            broken_scalar_keys: Mutex::new(HashSet::new()),
            undecodable_keys: Mutex::new(HashSet::new()),
            replication_info: Some("# Replication\r\nrole:master\r\nconnected_slaves:0\r\n".into()),
            ping_ok: true,
            latency: None,
            hash_calls: AtomicUsize::new(0),
            scalar_calls: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    pub fn with_hash(self, key: &str, fields: &[(&str, &str)]) -> Self {
        let fields = fields
            .iter()
            .map(|(f, v)| (f.to_string(), v.to_string()))
            .collect();
        self.data.lock().insert(key.to_string(), Stored::Hash(fields));
        self
    }

    pub fn with_plain(self, key: &str, value: &str) -> Self {
        self.data
            .lock()
            .insert(key.to_string(), Stored::Plain(value.to_string()));
        self
    }

    /// Make the hash read for `key` fail regardless of what is stored.
    pub fn with_broken_hash_read(self, key: &str) -> Self {
        self.broken_hash_keys.lock().insert(key.to_string());
        self
    }

    pub fn with_broken_scalar_read(self, key: &str) -> Self {
        self.broken_scalar_keys.lock().insert(key.to_string());
        self
    }

    /// Make the hash read for `key` return bytes that are not valid UTF-8.
    pub fn with_undecodable_hash(self, key: &str) -> Self {
        self.undecodable_keys.lock().insert(key.to_string());
        self
    }

    pub fn with_replication_info(mut self, info: &str) -> Self {
        self.replication_info = Some(info.to_string());
        self
    }

    pub fn with_failing_info(mut self) -> Self {
        self.replication_info = None;
        self
    }

    pub fn with_failing_ping(mut self) -> Self {
        self.ping_ok = false;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn hash_calls(&self) -> usize {
        self.hash_calls.load(Ordering::SeqCst)
    }

    pub fn scalar_calls(&self) -> usize {
        self.scalar_calls.load(Ordering::SeqCst)
    }

    pub fn store_calls(&self) -> usize {
        self.hash_calls() + self.scalar_calls()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl KvDriver for MemoryDriver {
    async fn ping(&self) -> PermResult<()> {
        if self.ping_ok {
            Ok(())
        } else {
            Err(PermError::Transport("connection refused".into()))
        }
    }

    async fn replication_info(&self) -> PermResult<String> {
        self.replication_info
            .clone()
            .ok_or_else(|| PermError::Transport("ERR unknown command 'INFO'".into()))
    }

    async fn hash_fields(&self, key: &str) -> PermResult<Vec<(String, String)>> {
        self.hash_calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;

        if self.broken_hash_keys.lock().contains(key) {
            return Err(PermError::Transport("connection reset by peer".into()));
        }
        if self.undecodable_keys.lock().contains(key) {
            let flat = vec![b"data".to_vec(), vec![0xc3, 0x28], b"version".to_vec(), b"1".to_vec()];
            return permgate_core::record::pair_fields(flat)
                .map_err(|e| PermError::decode(key, format!("hash reply is not valid UTF-8: {e}")));
        }
        match self.data.lock().get(key) {
            Some(Stored::Hash(fields)) => Ok(fields.clone()),
            Some(Stored::Plain(_)) => Err(PermError::Transport(WRONGTYPE.into())),
            None => Ok(Vec::new()),
        }
    }

    async fn scalar(&self, key: &str) -> PermResult<Option<String>> {
        self.scalar_calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;

        if self.broken_scalar_keys.lock().contains(key) {
            return Err(PermError::Transport("connection reset by peer".into()));
        }
        match self.data.lock().get(key) {
            Some(Stored::Plain(value)) => Ok(Some(value.clone())),
            Some(Stored::Hash(_)) => Err(PermError::Transport(WRONGTYPE.into())),
            None => Ok(None),
        }
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
