//! Completed-order notification.

use crate::analytics::{AnalyticsSink, CompletedOrder, COMPLETED_ORDER};
use crate::error::ReceiptError;
use crate::models::Order;
use std::sync::Arc;
use tracing::debug;

/// Sends the "Completed Order" event through an injected sink.
#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn AnalyticsSink>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn AnalyticsSink>) -> Self {
        Self { sink }
    }

    /// Emit one "Completed Order" event for `order`.
    pub async fn order_completed(&self, order: &Order) -> Result<(), ReceiptError> {
        let payload = CompletedOrder::from(order);
        debug!(order = %payload.order_id, "sending completed order event");

        let properties = serde_json::to_value(&payload)
            .map_err(|e| ReceiptError::Analytics(format!("encode payload: {e}")))?;
        self.sink.track(COMPLETED_ORDER, properties).await
    }
}
