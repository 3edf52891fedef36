//! Backend registry.
//!
//! Backends are registered explicitly at start-up and looked up by the driver
//! name given in the configuration.

use async_trait::async_trait;
use log::{debug, warn};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::RunError;

/// A database backend able to open sessions from a connection descriptor.
#[async_trait]
pub trait Backend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn open(&self, descriptor: &str) -> Result<Box<dyn Session>, RunError>;
}

/// One exclusively owned connection.
#[async_trait]
pub trait Session: Send {
    /// Runs `query` and scans the single text column of its single row.
    async fn query_scalar(&mut self, query: &str) -> Result<String, RunError>;

    async fn close(self: Box<Self>) -> Result<(), RunError>;
}

#[derive(Default)]
pub struct DriverRegistry {
    backends: BTreeMap<String, Arc<dyn Backend>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in backend.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(crate::db::MySqlBackend));
        registry
    }

    pub fn register(&mut self, backend: Arc<dyn Backend>) {
        let name = backend.name().to_string();
        debug!("Registering backend '{name}'");
        if self.backends.insert(name.clone(), backend).is_some() {
            warn!("Backend '{name}' was already registered and has been replaced");
        }
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Backend>, RunError> {
        self.backends
            .get(name)
            .cloned()
            .ok_or_else(|| RunError::UnknownDriver {
                name: name.to_string(),
                available: self.names().into_iter().map(String::from).collect(),
            })
    }

    pub fn names(&self) -> Vec<&str> {
        self.backends.keys().map(String::as_str).collect()
    }
}
