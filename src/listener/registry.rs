use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use super::{ConsumerFactory, ConsumerListener, ListenerLifecycleState};
use crate::utils::TextSink;
use crate::{AppResult, ListenerConfig};

/// Listeners by name, each with its own sink.
pub struct Listeners {
    factory: Arc<dyn ConsumerFactory>,
    listeners: DashMap<String, Arc<ConsumerListener>>,
}

impl Listeners {
    pub fn new(factory: Arc<dyn ConsumerFactory>) -> Self {
        Listeners {
            factory,
            listeners: DashMap::new(),
        }
    }

    /// Starts (or restarts) the listener named in `config`. `sink` is only
    /// used when the name is new.
    pub fn start(&self, config: ListenerConfig, sink: Arc<dyn TextSink>) -> AppResult<()> {
        let listener = self
            .listeners
            .entry(config.name.clone())
            .or_insert_with(|| Arc::new(ConsumerListener::new(Arc::clone(&self.factory), sink)))
            .clone();
        listener.start(config)
    }

    pub fn stop(&self, name: &str) {
        if let Some(listener) = self.get(name) {
            listener.stop();
        }
    }

    pub fn stop_all(&self) {
        let listeners: Vec<_> = self
            .listeners
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        info!("stopping {} listeners", listeners.len());
        for listener in listeners {
            listener.stop();
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<ConsumerListener>> {
        self.listeners.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn state(&self, name: &str) -> ListenerLifecycleState {
        self.get(name)
            .map_or(ListenerLifecycleState::Stopped, |listener| listener.state())
    }

    /// Stops the listener and forgets it.
    pub fn remove(&self, name: &str) -> bool {
        match self.listeners.remove(name) {
            Some((_, listener)) => {
                listener.stop();
                true
            }
            None => false,
        }
    }

    pub fn running(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .listeners
            .iter()
            .filter(|entry| entry.value().is_running())
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}
