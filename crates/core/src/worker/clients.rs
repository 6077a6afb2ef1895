//! Open pages and the worker generation controlling each of them.

use std::collections::HashMap;

use tokio::sync::RwLock;

/// Registry of open clients.
///
/// Lives only in memory; a restarted host starts with no clients.
#[derive(Debug, Default)]
pub struct Clients {
    controllers: RwLock<HashMap<String, Option<String>>>,
}

impl Clients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client; an already-known client keeps its controller.
    pub async fn connect(&self, id: &str) {
        self.controllers.write().await.entry(id.to_string()).or_insert(None);
    }

    /// Forget a closed client. Returns false if it was unknown.
    pub async fn disconnect(&self, id: &str) -> bool {
        self.controllers.write().await.remove(id).is_some()
    }

    /// Put a client under `generation`, registering it if needed.
    pub async fn control(&self, id: &str, generation: &str) {
        self.controllers
            .write()
            .await
            .insert(id.to_string(), Some(generation.to_string()));
    }

    pub async fn controller(&self, id: &str) -> Option<String> {
        self.controllers.read().await.get(id).cloned().flatten()
    }

    /// Take control of every open client.
    ///
    /// Returns how many clients changed controller.
    pub async fn claim(&self, generation: &str) -> usize {
        let mut controllers = self.controllers.write().await;
        let mut claimed = 0;
        for controller in controllers.values_mut() {
            if controller.as_deref() != Some(generation) {
                *controller = Some(generation.to_string());
                claimed += 1;
            }
        }
        claimed
    }

    /// Whether any client is still controlled by a different generation.
    pub async fn controlled_by_other(&self, generation: &str) -> bool {
        self.controllers
            .read()
            .await
            .values()
            .any(|c| c.as_deref().is_some_and(|g| g != generation))
    }

    pub async fn len(&self) -> usize {
        self.controllers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.controllers.read().await.is_empty()
    }
}
