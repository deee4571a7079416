//! Request/response channel to a trusted parent frame.
//!
//! When the ledger runs embedded in a page that cannot reach the store's
//! context endpoint itself, the parent frame answers on its behalf. Every
//! request carries a correlation id; replies are matched against the
//! pending table by that id and accepted only from the trusted origin.

use crate::domain::ports::TokenProvider;
use crate::utils::error::{LedgerError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

pub const DIGEST_ACTION: &str = "request_digest";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeRequest {
    pub id: u64,
    pub action: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeReply {
    pub id: u64,
    pub origin: String,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl BridgeReply {
    pub fn ok(id: u64, origin: &str, result: Value) -> Self {
        Self {
            id,
            origin: origin.to_string(),
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(id: u64, origin: &str, error: &str) -> Self {
        Self {
            id,
            origin: origin.to_string(),
            result: None,
            error: Some(error.to_string()),
        }
    }

    fn into_result(self) -> Result<Value> {
        match (self.error, self.result) {
            (Some(error), _) => Err(LedgerError::Bridge {
                message: format!("parent frame reported: {}", error),
            }),
            (None, Some(result)) => Ok(result),
            (None, None) => Ok(Value::Null),
        }
    }
}

pub struct FrameBridge {
    outbound: mpsc::Sender<BridgeRequest>,
    pending: Mutex<HashMap<u64, oneshot::Sender<BridgeReply>>>,
    next_id: AtomicU64,
    trusted_origin: String,
    timeout: Duration,
}

impl FrameBridge {
    pub fn new(
        outbound: mpsc::Sender<BridgeRequest>,
        trusted_origin: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            outbound,
            pending: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            trusted_origin: trusted_origin.into(),
            timeout,
        }
    }

    fn pending(&self) -> Result<MutexGuard<'_, HashMap<u64, oneshot::Sender<BridgeReply>>>> {
        self.pending.lock().map_err(|_| LedgerError::Bridge {
            message: "pending request table is poisoned".to_string(),
        })
    }

    fn forget(&self, id: u64) {
        if let Ok(mut pending) = self.pending() {
            pending.remove(&id);
        }
    }

    /// Number of requests still waiting for a reply.
    pub fn in_flight(&self) -> usize {
        self.pending().map(|p| p.len()).unwrap_or(0)
    }

    pub async fn call(&self, action: &str, payload: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = oneshot::channel();
        self.pending()?.insert(id, tx);

        let request = BridgeRequest {
            id,
            action: action.to_string(),
            payload,
        };
        if self.outbound.send(request).await.is_err() {
            self.forget(id);
            return Err(LedgerError::Bridge {
                message: "parent frame channel is closed".to_string(),
            });
        }
        tracing::debug!(id, action, "Bridge request sent");

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(reply)) => reply.into_result(),
            Ok(Err(_)) => Err(LedgerError::Bridge {
                message: format!("request {} was dropped before a reply arrived", id),
            }),
            Err(_) => {
                self.forget(id);
                tracing::warn!(id, action, timeout = ?self.timeout, "Bridge request timed out");
                Err(LedgerError::Bridge {
                    message: format!("no reply to {} within {:?}", action, self.timeout),
                })
            }
        }
    }

    /// Routes a reply coming back from the parent frame to its caller.
    pub fn deliver(&self, reply: BridgeReply) -> Result<()> {
        if reply.origin != self.trusted_origin {
            tracing::warn!(origin = %reply.origin, "Rejected bridge reply from untrusted origin");
            return Err(LedgerError::Bridge {
                message: format!("untrusted origin {}", reply.origin),
            });
        }

        let id = reply.id;
        let sender = self.pending()?.remove(&id).ok_or_else(|| LedgerError::Bridge {
            message: format!("no pending request with id {}", id),
        })?;

        sender.send(reply).map_err(|_| LedgerError::Bridge {
            message: format!("caller of request {} is no longer waiting", id),
        })
    }
}

/// Obtains request digests through the parent frame.
pub struct BridgeTokenProvider {
    bridge: Arc<FrameBridge>,
}

impl BridgeTokenProvider {
    pub fn new(bridge: Arc<FrameBridge>) -> Self {
        Self { bridge }
    }
}

#[async_trait]
impl TokenProvider for BridgeTokenProvider {
    async fn request_digest(&self) -> Result<String> {
        let result = self.bridge.call(DIGEST_ACTION, Value::Null).await?;
        result
            .as_str()
            .or_else(|| result.get("digest").and_then(Value::as_str))
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .ok_or_else(|| LedgerError::TokenMissing {
                reason: "parent frame answered without a digest".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PARENT: &str = "https://contoso.sharepoint.com";

    fn bridge(timeout: Duration) -> (Arc<FrameBridge>, mpsc::Receiver<BridgeRequest>) {
        let (tx, rx) = mpsc::channel(8);
        (Arc::new(FrameBridge::new(tx, PARENT, timeout)), rx)
    }

    /// Plays the parent frame: answers every request with `answer`.
    fn spawn_parent(
        bridge: Arc<FrameBridge>,
        mut rx: mpsc::Receiver<BridgeRequest>,
        answer: fn(&BridgeRequest) -> BridgeReply,
    ) {
        tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                let _ = bridge.deliver(answer(&request));
            }
        });
    }

    #[tokio::test]
    async fn test_digest_round_trip() {
        let (bridge, rx) = bridge(Duration::from_secs(1));
        spawn_parent(bridge.clone(), rx, |req| {
            BridgeReply::ok(req.id, PARENT, json!({"digest": "0xPARENT"}))
        });

        let provider = BridgeTokenProvider::new(bridge.clone());
        assert_eq!(provider.request_digest().await.unwrap(), "0xPARENT");
        assert_eq!(bridge.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_replies_are_matched_by_id() {
        let (bridge, rx) = bridge(Duration::from_secs(1));
        spawn_parent(bridge.clone(), rx, |req| {
            BridgeReply::ok(req.id, PARENT, json!(req.id))
        });

        let (a, b) = tokio::join!(
            bridge.call("echo", Value::Null),
            bridge.call("echo", Value::Null)
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_untrusted_origin_is_rejected() {
        let (bridge, mut rx) = bridge(Duration::from_millis(200));
        let caller = {
            let bridge = bridge.clone();
            tokio::spawn(async move { bridge.call(DIGEST_ACTION, Value::Null).await })
        };

        let request = rx.recv().await.unwrap();
        let forged = BridgeReply::ok(request.id, "https://evil.example", json!("0xFORGED"));
        assert!(bridge.deliver(forged).is_err());

        // the caller is still waiting and eventually times out
        assert!(matches!(
            caller.await.unwrap(),
            Err(LedgerError::Bridge { .. })
        ));
        assert_eq!(bridge.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_timeout_clears_pending_entry() {
        let (bridge, _rx) = bridge(Duration::from_millis(50));
        let result = bridge.call(DIGEST_ACTION, Value::Null).await;
        assert!(matches!(result, Err(LedgerError::Bridge { .. })));
        assert_eq!(bridge.in_flight(), 0);

        // late replies find nothing to match
        assert!(bridge.deliver(BridgeReply::ok(1, PARENT, json!("late"))).is_err());
    }

    #[tokio::test]
    async fn test_parent_error_and_empty_digest() {
        let (bridge_a, rx) = bridge(Duration::from_secs(1));
        spawn_parent(bridge_a.clone(), rx, |req| {
            BridgeReply::failed(req.id, PARENT, "not signed in")
        });
        let provider = BridgeTokenProvider::new(bridge_a);
        assert!(matches!(
            provider.request_digest().await,
            Err(LedgerError::Bridge { .. })
        ));

        let (bridge_b, rx) = bridge(Duration::from_secs(1));
        spawn_parent(bridge_b.clone(), rx, |req| {
            BridgeReply::ok(req.id, PARENT, json!(""))
        });
        let provider = BridgeTokenProvider::new(bridge_b);
        assert!(matches!(
            provider.request_digest().await,
            Err(LedgerError::TokenMissing { .. })
        ));
    }

    #[tokio::test]
    async fn test_closed_channel() {
        let (bridge, rx) = bridge(Duration::from_secs(1));
        drop(rx);
        assert!(bridge.call(DIGEST_ACTION, Value::Null).await.is_err());
        assert_eq!(bridge.in_flight(), 0);
    }
}
