//! Delivers queued [`OutboundMessage`]s to the chat surface (spec §4.F).

use async_trait::async_trait;
use otto_core::OutboundMessage;

use crate::error::TransportError;

#[async_trait]
pub trait MessageTransport: Send + Sync + 'static {
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError>;
}

/// Logs instead of delivering. No concrete Telegram (or other chat-surface)
/// adapter is in scope here (spec §6 names `MessageTransport` as an external
/// collaborator interface only); a real deployment supplies its own
/// implementation and wires it in place of this one.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTransport;

#[async_trait]
impl MessageTransport for NoopTransport {
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        tracing::info!(chat_id = message.chat_id, kind = ?message.kind, "noop transport: would send message");
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Debug, Clone, Default)]
    pub struct FakeMessageTransport {
        sent: Arc<Mutex<Vec<OutboundMessage>>>,
        fail_next: Arc<Mutex<u32>>,
    }

    impl FakeMessageTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make the next `n` sends fail before reverting to success.
        pub fn fail_next(&self, n: u32) {
            *self.fail_next.lock() = n;
        }

        pub fn sent(&self) -> Vec<OutboundMessage> {
            self.sent.lock().clone()
        }
    }

    #[async_trait]
    impl MessageTransport for FakeMessageTransport {
        async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError> {
            let mut remaining = self.fail_next.lock();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(TransportError::DeliveryFailed("fake transport failure".into()));
            }
            drop(remaining);
            self.sent.lock().push(message.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeMessageTransport;
    use super::*;
    use otto_core::{NewOutboundMessage, OutboundId};

    #[tokio::test]
    async fn fake_transport_records_successful_sends() {
        let transport = FakeMessageTransport::new();
        let msg = NewOutboundMessage::text(1, "hi").into_record(OutboundId::new(), 0);
        transport.send(&msg).await.unwrap();
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn fake_transport_fails_on_demand_then_recovers() {
        let transport = FakeMessageTransport::new();
        transport.fail_next(1);
        let msg = NewOutboundMessage::text(1, "hi").into_record(OutboundId::new(), 0);
        assert!(transport.send(&msg).await.is_err());
        assert!(transport.send(&msg).await.is_ok());
    }
}
