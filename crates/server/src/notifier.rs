use async_trait::async_trait;
use parking_lot::RwLock;
use rmcp::service::{Peer, RoleServer};
use std::collections::HashMap;

/// Receives the catalog-changed signal. There is no payload: clients re-list.
#[async_trait]
pub trait ToolListNotifier: Send + Sync {
    async fn notify_tool_list_changed(&self);
}

/// Broadcasts `notifications/tools/list_changed` to every connected MCP session.
///
/// Peers whose send fails are assumed gone and forgotten.
#[derive(Debug, Default)]
pub struct ContractNotifier {
    peers: RwLock<HashMap<String, Peer<RoleServer>>>,
}

impl ContractNotifier {
    pub fn observe_peer(&self, session_id: &str, peer: Peer<RoleServer>) {
        self.peers.write().insert(session_id.to_string(), peer);
    }

    pub fn forget_peer(&self, session_id: &str) {
        self.peers.write().remove(session_id);
    }

    /// Sessions that will receive the next notification.
    #[must_use]
    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.peers.read().keys().cloned().collect();
        ids.sort_unstable();
        ids
    }
}

#[async_trait]
impl ToolListNotifier for ContractNotifier {
    async fn notify_tool_list_changed(&self) {
        let peers: Vec<(String, Peer<RoleServer>)> = self
            .peers
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        tracing::debug!(sessions = peers.len(), "sending tools list_changed");

        let mut dead: Vec<String> = Vec::new();
        for (session_id, peer) in peers {
            if let Err(e) = peer.notify_tool_list_changed().await {
                tracing::debug!(mcp_session_id = %session_id, error = %e, "failed to send tools list_changed");
                dead.push(session_id);
            }
        }

        if !dead.is_empty() {
            let mut map = self.peers.write();
            for id in dead {
                map.remove(&id);
            }
        }
    }
}
