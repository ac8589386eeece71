//! Receipt aggregation, rendering and notification.

pub mod aggregator;
pub mod notifier;
pub mod page;
pub mod render;
pub mod templates;
pub mod view;

pub use templates::TemplateSet;
pub use view::{ReceiptView, DEFAULT_CONTAINER_ID};
