//! Order → course → provider aggregation.
//!
//! Each fetch depends on data extracted from the previous response, so the
//! requests are issued strictly one after another. The first failure aborts
//! the whole pipeline and no view model is produced.

use crate::api::endpoints::{fetch_course, fetch_order, fetch_provider};
use crate::api::ApiTransport;
use crate::error::ReceiptError;
use crate::models::ReceiptViewModel;
use tracing::{debug, info};

/// Fetch everything a receipt needs and merge it into a view model.
pub async fn aggregate(
    transport: &dyn ApiTransport,
    order_number: &str,
) -> Result<ReceiptViewModel, ReceiptError> {
    let order = fetch_order(transport, order_number).await?;
    info!(
        order = %order.number,
        status = %order.status,
        lines = order.lines.len(),
        "fetched order"
    );

    let course = match order.course_key() {
        Some(key) => {
            let course = fetch_course(transport, key).await?;
            debug!(course = %course.id, "fetched course");
            Some(course)
        }
        None => {
            debug!("order references no course");
            None
        }
    };

    let provider = match order.credit_provider_id() {
        Some(id) => {
            let provider = fetch_provider(transport, id).await?;
            debug!(provider = %provider.id, "fetched credit provider");
            Some(provider)
        }
        None => None,
    };

    let model = ReceiptViewModel::new(order, course, provider);
    info!(verified = model.is_verified, "receipt data complete");
    Ok(model)
}
