//! # In-process transport.
//!
//! [`MemoryTransport`] stands in for a broker: it records every connect,
//! subscription and publish, and lets the caller inject inbound messages or
//! simulate the broker firing the last will. Used by the demo and the tests.
//!
//! ## Example
//! ```rust
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! use std::sync::Arc;
//! use rtmngr::{MemoryTransport, QoS, Transport};
//!
//! let bus = Arc::new(MemoryTransport::new());
//! bus.publish("realm/proc/reg", "{}".into(), QoS::AtMostOnce, false).await.ok();
//! assert!(bus.published().await.is_empty()); // not connected yet
//! # }
//! ```

use std::collections::BTreeSet;

use async_trait::async_trait;
use tokio::sync::{RwLock, mpsc};

use crate::error::TransportError;

use super::{ConnectOptions, Inbound, QoS, Transport};

/// A message handed to the transport for publishing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
    pub payload: String,
    pub qos: QoS,
    pub retained: bool,
}

#[derive(Default)]
struct State {
    options: Option<ConnectOptions>,
    inbound: Option<mpsc::Sender<Inbound>>,
    subscriptions: BTreeSet<String>,
    subscribe_log: Vec<String>,
    published: Vec<Published>,
    refuse_connect: Option<String>,
}

/// Broker double kept entirely in memory.
#[derive(Default)]
pub struct MemoryTransport {
    state: RwLock<State>,
}

impl MemoryTransport {
    /// Creates a transport that accepts connections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport whose `connect` fails with `reason`.
    pub fn refusing(reason: impl Into<String>) -> Self {
        let state = State {
            refuse_connect: Some(reason.into()),
            ..State::default()
        };
        Self {
            state: RwLock::new(state),
        }
    }

    /// Delivers `payload` on `topic` to the connected client.
    ///
    /// Returns `false` when nobody is connected or the client stopped listening.
    /// Delivery does not check subscriptions.
    pub async fn inject(&self, topic: &str, payload: impl Into<String>) -> bool {
        let tx = self.state.read().await.inbound.clone();
        match tx {
            Some(tx) => tx.send(Inbound::new(topic, payload)).await.is_ok(),
            None => false,
        }
    }

    /// Simulates an unclean disconnect: the broker publishes the armed last will.
    pub async fn fire_last_will(&self) -> bool {
        let mut st = self.state.write().await;
        let Some(will) = st.options.as_ref().map(|o| o.last_will.clone()) else {
            return false;
        };
        st.published.push(Published {
            topic: will.topic,
            payload: will.payload,
            qos: will.qos,
            retained: will.retained,
        });
        st.inbound = None;
        true
    }

    /// Options of the last successful connect.
    pub async fn connect_options(&self) -> Option<ConnectOptions> {
        self.state.read().await.options.clone()
    }

    /// Currently active subscriptions, sorted.
    pub async fn subscriptions(&self) -> Vec<String> {
        self.state.read().await.subscriptions.iter().cloned().collect()
    }

    /// Every subscribe call in order, including repeats.
    pub async fn subscribe_log(&self) -> Vec<String> {
        self.state.read().await.subscribe_log.clone()
    }

    /// Every publish in order.
    pub async fn published(&self) -> Vec<Published> {
        self.state.read().await.published.clone()
    }

    /// Publishes on `topic`, in order.
    pub async fn published_on(&self, topic: &str) -> Vec<Published> {
        self.state
            .read()
            .await
            .published
            .iter()
            .filter(|p| p.topic == topic)
            .cloned()
            .collect()
    }

    /// Forgets recorded publishes.
    pub async fn clear_published(&self) {
        self.state.write().await.published.clear();
    }

    async fn ensure_connected(&self) -> Result<(), TransportError> {
        if self.state.read().await.options.is_some() {
            Ok(())
        } else {
            Err(TransportError::NotConnected)
        }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(
        &self,
        opts: ConnectOptions,
        inbound: mpsc::Sender<Inbound>,
    ) -> Result<(), TransportError> {
        let mut st = self.state.write().await;
        if let Some(reason) = &st.refuse_connect {
            return Err(TransportError::ConnectFailed(reason.clone()));
        }
        st.options = Some(opts);
        st.inbound = Some(inbound);
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<(), TransportError> {
        self.ensure_connected().await?;
        let mut st = self.state.write().await;
        st.subscriptions.insert(topic.to_string());
        st.subscribe_log.push(topic.to_string());
        Ok(())
    }

    async fn unsubscribe(&self, topic: &str) -> Result<(), TransportError> {
        self.ensure_connected().await?;
        self.state.write().await.subscriptions.remove(topic);
        Ok(())
    }

    async fn publish(
        &self,
        topic: &str,
        payload: String,
        qos: QoS,
        retained: bool,
    ) -> Result<(), TransportError> {
        self.ensure_connected().await?;
        self.state.write().await.published.push(Published {
            topic: topic.to_string(),
            payload,
            qos,
            retained,
        });
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::LastWill;

    fn options() -> ConnectOptions {
        ConnectOptions {
            client_id: "rt-test".into(),
            host: "mem://".into(),
            username: "noauth".into(),
            token: "noauth".into(),
            reconnect: true,
            last_will: LastWill::new("realm/proc/reg", "bye"),
        }
    }

    #[tokio::test]
    async fn test_operations_require_connect() {
        let t = MemoryTransport::new();
        assert_eq!(
            t.subscribe("a").await,
            Err(TransportError::NotConnected)
        );
        assert_eq!(
            t.publish("a", "x".into(), QoS::AtMostOnce, false).await,
            Err(TransportError::NotConnected)
        );
    }

    #[tokio::test]
    async fn test_records_and_delivers() {
        let t = MemoryTransport::new();
        let (tx, mut rx) = mpsc::channel(4);
        t.connect(options(), tx).await.unwrap();

        t.subscribe("a").await.unwrap();
        t.subscribe("b").await.unwrap();
        t.unsubscribe("a").await.unwrap();
        assert_eq!(t.subscriptions().await, vec!["b"]);
        assert_eq!(t.subscribe_log().await, vec!["a", "b"]);

        t.publish("b", "p".into(), QoS::AtLeastOnce, false).await.unwrap();
        assert_eq!(t.published_on("b").await.len(), 1);

        assert!(t.inject("b", "hello").await);
        assert_eq!(rx.recv().await, Some(Inbound::new("b", "hello")));
    }

    #[tokio::test]
    async fn test_refusing_connect() {
        let t = MemoryTransport::refusing("no broker");
        let (tx, _rx) = mpsc::channel(1);
        assert_eq!(
            t.connect(options(), tx).await,
            Err(TransportError::ConnectFailed("no broker".into()))
        );
    }

    #[tokio::test]
    async fn test_fire_last_will_publishes_armed_message() {
        let t = MemoryTransport::new();
        let (tx, _rx) = mpsc::channel(1);
        assert!(!t.fire_last_will().await);

        t.connect(options(), tx).await.unwrap();
        assert!(t.fire_last_will().await);

        let will = t.published_on("realm/proc/reg").await;
        assert_eq!(will.len(), 1);
        assert_eq!(will[0].payload, "bye");
        assert_eq!(will[0].qos, QoS::ExactlyOnce);
        assert!(!t.inject("x", "y").await);
    }
}
