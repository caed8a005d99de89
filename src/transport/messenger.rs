use async_trait::async_trait;

use crate::core::error::TransportError;
use crate::models::event::BotAction;

/// Outbound port to the messaging platform
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Deliver a single action. One attempt, no retries.
    async fn deliver(&self, action: &BotAction) -> Result<(), TransportError>;
}
