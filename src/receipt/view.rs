//! One receipt page: aggregate, render, mount, notify.

use crate::analytics::AnalyticsSink;
use crate::api::ApiTransport;
use crate::error::ReceiptError;
use crate::models::{Order, ReceiptViewModel};
use crate::receipt::aggregator::aggregate;
use crate::receipt::notifier::Notifier;
use crate::receipt::page::mount;
use crate::receipt::render::render_receipt;
use crate::receipt::templates::TemplateSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

pub const DEFAULT_CONTAINER_ID: &str = "receipt-container";

/// Result of a render that reached the page.
#[derive(Debug)]
pub struct RenderedReceipt {
    pub model: ReceiptViewModel,
    pub markup: String,
    /// Outcome of the "Completed Order" event. The markup stays mounted
    /// when this is an error.
    pub notification: Result<(), ReceiptError>,
}

/// A host page with a receipt container.
///
/// Overlapping `render` calls follow a latest-wins policy: every call takes
/// a generation number, and only the newest generation may mount its markup
/// or send analytics. Older calls return [`ReceiptError::Superseded`].
pub struct ReceiptView {
    transport: Arc<dyn ApiTransport>,
    templates: TemplateSet,
    notifier: Notifier,
    container_id: String,
    document: Mutex<String>,
    generation: AtomicU64,
}

impl ReceiptView {
    pub fn new(
        transport: Arc<dyn ApiTransport>,
        templates: TemplateSet,
        sink: Arc<dyn AnalyticsSink>,
        container_id: impl Into<String>,
    ) -> Self {
        let container_id = container_id.into();
        let document = templates.page_shell(&container_id);

        Self {
            transport,
            templates,
            notifier: Notifier::new(sink),
            container_id,
            document: Mutex::new(document),
            generation: AtomicU64::new(0),
        }
    }

    /// Current page content.
    pub fn document(&self) -> String {
        self.lock_document().clone()
    }

    /// Fetch, render and mount the receipt for `order_number`, then notify.
    ///
    /// Nothing is mounted and no event is sent unless every fetch succeeded.
    /// A sink failure does not undo the mount; it is carried in
    /// [`RenderedReceipt::notification`].
    pub async fn render(&self, order_number: &str) -> Result<RenderedReceipt, ReceiptError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(generation, order = order_number, "render started");

        let model = aggregate(self.transport.as_ref(), order_number).await?;
        let markup = render_receipt(&model, &self.templates)?;

        {
            let mut document = self.lock_document();
            if !self.is_current(generation) {
                warn!(generation, order = order_number, "render superseded, discarding");
                return Err(ReceiptError::Superseded);
            }
            let mounted = mount(document.as_str(), &self.container_id, &markup)?;
            *document = mounted;
        }
        info!(order = %model.order.number, "receipt mounted");

        let notification = self.notify_if_current(generation, &model.order).await;
        if let Err(ref e) = notification {
            warn!(order = %model.order.number, "notification failed: {}", e);
        }

        Ok(RenderedReceipt {
            model,
            markup,
            notification,
        })
    }

    async fn notify_if_current(&self, generation: u64, order: &Order) -> Result<(), ReceiptError> {
        if !self.is_current(generation) {
            return Err(ReceiptError::Superseded);
        }
        self.notifier.order_completed(order).await
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn lock_document(&self) -> MutexGuard<'_, String> {
        self.document.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::testing::RecordingSink;
    use crate::api::testing::ScriptedTransport;
    use crate::models::fixtures::*;
    use serde_json::json;
    use tokio::sync::Notify;

    const ORDER_PATH: &str = "/api/commerce/v1/orders/EDX-123456/";
    const COURSE_PATH: &str = "/api/course_structure/v0/courses/course-v1:edx+dummy+2015_T3/";
    const PROVIDER_PATH: &str = "/api/credit/v1/providers/edx/";

    fn transport(verified: bool) -> ScriptedTransport {
        ScriptedTransport::new()
            .json(ORDER_PATH, order_json(verified))
            .json(COURSE_PATH, course_json())
            .json(PROVIDER_PATH, provider_json())
    }

    fn view(transport: ScriptedTransport, sink: Arc<RecordingSink>) -> ReceiptView {
        ReceiptView::new(
            Arc::new(transport),
            TemplateSet::builtin(),
            sink,
            DEFAULT_CONTAINER_ID,
        )
    }

    fn expected_event() -> (String, serde_json::Value) {
        (
            "Completed Order".to_string(),
            json!({"orderId": "EDX-123456", "total": "10.00", "currency": "USD"}),
        )
    }

    #[tokio::test]
    async fn test_verified_receipt_renders_and_notifies() {
        let sink = Arc::new(RecordingSink::default());
        let view = view(transport(true), sink.clone());

        let rendered = view.render(ORDER_NUMBER).await.unwrap();

        assert!(rendered.markup.contains("receipt test"));
        assert!(rendered.markup.contains("provider-info"));
        let page = view.document();
        assert!(page.contains(r#"<div id="receipt-container"><div class="receipt-wrapper""#));
        assert!(page.contains("receipt test"));
        assert_eq!(sink.events(), vec![expected_event()]);
    }

    #[tokio::test]
    async fn test_non_verified_receipt_omits_provider_but_notifies() {
        let sink = Arc::new(RecordingSink::default());
        let view = view(transport(false), sink.clone());

        let rendered = view.render(ORDER_NUMBER).await.unwrap();

        assert!(!rendered.model.is_verified);
        assert!(!view.document().contains("provider-info"));
        assert_eq!(sink.events(), vec![expected_event()]);
    }

    #[tokio::test]
    async fn test_fetch_failure_mounts_nothing_and_stays_silent() {
        for failing in [ORDER_PATH, COURSE_PATH, PROVIDER_PATH] {
            let sink = Arc::new(RecordingSink::default());
            let view = view(transport(true).status(failing, 503), sink.clone());
            let before = view.document();

            let err = view.render(ORDER_NUMBER).await.unwrap_err();

            assert!(err.is_network(), "{failing}: {err}");
            assert_eq!(view.document(), before);
            assert!(sink.events().is_empty());
        }
    }

    #[tokio::test]
    async fn test_missing_template_mounts_nothing() {
        let sink = Arc::new(RecordingSink::default());
        let view = ReceiptView::new(
            Arc::new(transport(true)),
            TemplateSet::new(Some("r".into()), None, None),
            sink.clone(),
            DEFAULT_CONTAINER_ID,
        );
        let before = view.document();

        let err = view.render(ORDER_NUMBER).await.unwrap_err();

        assert!(matches!(err, ReceiptError::TemplateMissing(_)));
        assert_eq!(view.document(), before);
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_rerender_is_idempotent() {
        let sink = Arc::new(RecordingSink::default());
        let view = view(transport(true), sink.clone());

        view.render(ORDER_NUMBER).await.unwrap();
        let first = view.document();
        view.render(ORDER_NUMBER).await.unwrap();

        assert_eq!(view.document(), first);
        assert_eq!(sink.events().len(), 2);
    }

    #[tokio::test]
    async fn test_sink_failure_still_mounts() {
        let sink = Arc::new(RecordingSink::failing());
        let view = view(transport(true), sink.clone());

        let rendered = view.render(ORDER_NUMBER).await.unwrap();

        assert!(matches!(
            rendered.notification,
            Err(ReceiptError::Analytics(_))
        ));
        assert!(rendered.markup.contains("receipt test"));
        assert!(view.document().contains("receipt test"));
        assert_eq!(sink.events().len(), 1);
    }

    #[tokio::test]
    async fn test_no_notification_once_superseded_after_mount() {
        let sink = Arc::new(RecordingSink::default());
        let view = view(transport(true), sink.clone());
        let order: Order = serde_json::from_value(order_json(true)).unwrap();

        let generation = view.generation.fetch_add(1, Ordering::SeqCst) + 1;
        view.generation.fetch_add(1, Ordering::SeqCst);

        let err = view.notify_if_current(generation, &order).await.unwrap_err();
        assert!(matches!(err, ReceiptError::Superseded));
        assert!(sink.events().is_empty());

        view.notify_if_current(generation + 1, &order).await.unwrap();
        assert_eq!(sink.events(), vec![expected_event()]);
    }

    #[tokio::test]
    async fn test_escaped_container_id_still_mounts() {
        let sink = Arc::new(RecordingSink::default());
        let view = ReceiptView::new(
            Arc::new(transport(true)),
            TemplateSet::builtin(),
            sink.clone(),
            "a&b",
        );

        let rendered = view.render(ORDER_NUMBER).await.unwrap();

        rendered.notification.unwrap();
        assert!(view
            .document()
            .contains(r#"<div id="a&amp;b"><div class="receipt-wrapper""#));
    }

    #[tokio::test]
    async fn test_newer_render_supersedes_older() {
        let gate = Arc::new(Notify::new());
        let other_path = "/api/commerce/v1/orders/EDX-999/";
        let mut other = order_json(false);
        other["number"] = "EDX-999".into();

        let transport = transport(true)
            .gate(ORDER_PATH, gate.clone())
            .json(other_path, other);
        let sink = Arc::new(RecordingSink::default());
        let view = Arc::new(view(transport, sink.clone()));

        let slow = {
            let view = Arc::clone(&view);
            tokio::spawn(async move { view.render(ORDER_NUMBER).await })
        };
        // Let the slow render take its generation and park on the gate.
        tokio::task::yield_now().await;
        while view.generation.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        let fast = view.render("EDX-999").await.unwrap();
        assert_eq!(fast.model.order.number, "EDX-999");

        gate.notify_one();
        let err = slow.await.unwrap().unwrap_err();
        assert!(matches!(err, ReceiptError::Superseded));

        let page = view.document();
        assert!(page.contains(r#"data-order-number="EDX-999""#));
        assert!(!page.contains(r#"data-order-number="EDX-123456""#));

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].1["orderId"], "EDX-999");
    }
}
