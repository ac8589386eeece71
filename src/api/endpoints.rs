//! Typed wrappers for the three LMS endpoints the receipt needs.

use crate::api::client::{encode_path_segment, fetch_json, ApiTransport};
use crate::error::ReceiptError;
use crate::models::{Course, CreditProvider, Order};

/// GET /api/commerce/v1/orders/{order_number}/
pub fn order_path(order_number: &str) -> String {
    format!(
        "/api/commerce/v1/orders/{}/",
        encode_path_segment(order_number)
    )
}

/// GET /api/course_structure/v0/courses/{course_key}/
pub fn course_path(course_key: &str) -> String {
    format!(
        "/api/course_structure/v0/courses/{}/",
        encode_path_segment(course_key)
    )
}

/// GET /api/credit/v1/providers/{provider_id}/
pub fn provider_path(provider_id: &str) -> String {
    format!(
        "/api/credit/v1/providers/{}/",
        encode_path_segment(provider_id)
    )
}

pub async fn fetch_order(
    transport: &dyn ApiTransport,
    order_number: &str,
) -> Result<Order, ReceiptError> {
    fetch_json(transport, &order_path(order_number)).await
}

pub async fn fetch_course(
    transport: &dyn ApiTransport,
    course_key: &str,
) -> Result<Course, ReceiptError> {
    fetch_json(transport, &course_path(course_key)).await
}

pub async fn fetch_provider(
    transport: &dyn ApiTransport,
    provider_id: &str,
) -> Result<CreditProvider, ReceiptError> {
    fetch_json(transport, &provider_path(provider_id)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_match_lms_routes() {
        assert_eq!(
            order_path("EDX-123456"),
            "/api/commerce/v1/orders/EDX-123456/"
        );
        assert_eq!(
            course_path("course-v1:edx+dummy+2015_T3"),
            "/api/course_structure/v0/courses/course-v1:edx+dummy+2015_T3/"
        );
        assert_eq!(provider_path("edx"), "/api/credit/v1/providers/edx/");
    }

    #[test]
    fn test_paths_cannot_escape_route() {
        assert_eq!(
            order_path("../admin"),
            "/api/commerce/v1/orders/..%2Fadmin/"
        );
    }
}
