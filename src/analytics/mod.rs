//! Analytics events and the sinks that receive them.

pub mod sinks;

use crate::error::ReceiptError;
use crate::models::Order;
use async_trait::async_trait;
use serde::Serialize;

pub use sinks::{HttpSink, JsonLinesSink, LogSink, NullSink};

/// Event emitted once a receipt has been rendered.
pub const COMPLETED_ORDER: &str = "Completed Order";

/// Payload of the "Completed Order" event.
///
/// Fields are copied verbatim from the order; amounts stay strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedOrder {
    pub order_id: String,
    pub total: String,
    pub currency: String,
}

impl From<&Order> for CompletedOrder {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.number.clone(),
            total: order.total_excl_tax.clone(),
            currency: order.currency.clone(),
        }
    }
}

/// Destination for analytics events.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn track(&self, event: &str, properties: serde_json::Value) -> Result<(), ReceiptError>;
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::order_json;

    #[test]
    fn test_completed_order_payload_shape() {
        let order: Order = serde_json::from_value(order_json(true)).unwrap();
        let payload = serde_json::to_value(CompletedOrder::from(&order)).unwrap();

        assert_eq!(
            payload,
            serde_json::json!({
                "orderId": "EDX-123456",
                "total": "10.00",
                "currency": "USD"
            })
        );
    }
}
