//! Data models for the receipt renderer.
//!
//! This module contains the records returned by the commerce, course
//! structure and credit APIs, plus the merged view model handed to the
//! renderer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Attribute name marking the certificate type of a seat.
pub const ATTR_CERTIFICATE_TYPE: &str = "certificate_type";
/// Attribute name carrying the course key of a seat.
pub const ATTR_COURSE_KEY: &str = "course_key";
/// Attribute name carrying the credit provider id.
pub const ATTR_CREDIT_PROVIDER: &str = "credit_provider";
/// Certificate type value that makes an order verified.
pub const VERIFIED_CERTIFICATE: &str = "verified";

/// Processing status of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Open,
    #[serde(rename = "Fulfillment Error")]
    FulfillmentError,
    Complete,
    Refunded,
    #[serde(other)]
    Other,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Open => write!(f, "Open"),
            OrderStatus::FulfillmentError => write!(f, "Fulfillment Error"),
            OrderStatus::Complete => write!(f, "Complete"),
            OrderStatus::Refunded => write!(f, "Refunded"),
            OrderStatus::Other => write!(f, "Unknown"),
        }
    }
}

/// Billing address attached to an order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BillingAddress {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub line1: Option<String>,
    #[serde(default)]
    pub line2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postcode: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl BillingAddress {
    /// Full name, skipping empty parts.
    pub fn full_name(&self) -> String {
        join_present(&[&self.first_name, &self.last_name], " ")
    }

    /// Single-line postal address, skipping empty parts.
    pub fn one_line(&self) -> String {
        join_present(
            &[
                &self.line1,
                &self.line2,
                &self.city,
                &self.state,
                &self.postcode,
                &self.country,
            ],
            ", ",
        )
    }
}

fn join_present(parts: &[&Option<String>], sep: &str) -> String {
    parts
        .iter()
        .filter_map(|p| p.as_deref())
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

/// A named attribute value on a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeValue {
    pub name: String,
    pub value: serde_json::Value,
}

impl AttributeValue {
    /// The value as a string, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        self.value.as_str()
    }
}

/// A partner stock record for a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRecord {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub partner_sku: Option<String>,
    #[serde(default)]
    pub price_currency: Option<String>,
    #[serde(default)]
    pub price_excl_tax: Option<String>,
}

/// The product a line item refers to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub product_class: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub attribute_values: Vec<AttributeValue>,
    #[serde(default)]
    pub stockrecords: Vec<StockRecord>,
}

impl Product {
    /// Look up a string attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attribute_values
            .iter()
            .find(|a| a.name == name)
            .and_then(AttributeValue::as_str)
    }
}

/// One purchased product entry within an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub unit_price_excl_tax: Option<String>,
    #[serde(default)]
    pub line_price_excl_tax: Option<String>,
    #[serde(default)]
    pub product: Product,
}

fn default_quantity() -> u32 {
    1
}

impl LineItem {
    /// Look up a string attribute on this line's product.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.product.attribute(name)
    }

    /// Whether this line is a verified certificate seat.
    pub fn is_verified(&self) -> bool {
        self.attribute(ATTR_CERTIFICATE_TYPE) == Some(VERIFIED_CERTIFICATE)
    }
}

/// A purchase record returned by the commerce API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub number: String,
    pub status: OrderStatus,
    pub currency: String,
    pub total_excl_tax: String,
    #[serde(default)]
    pub date_placed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub billed_to: Option<BillingAddress>,
    #[serde(default)]
    pub lines: Vec<LineItem>,
}

impl Order {
    /// First value of the named attribute across all lines, in line order.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.lines.iter().find_map(|line| line.attribute(name))
    }

    /// True iff any line carries `certificate_type = verified`.
    pub fn is_verified(&self) -> bool {
        self.lines.iter().any(LineItem::is_verified)
    }

    pub fn course_key(&self) -> Option<&str> {
        self.attribute(ATTR_COURSE_KEY)
    }

    pub fn credit_provider_id(&self) -> Option<&str> {
        self.attribute(ATTR_CREDIT_PROVIDER)
    }
}

/// A course record from the course structure API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub org: Option<String>,
    #[serde(default)]
    pub run: Option<String>,
    #[serde(default)]
    pub course: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

/// A credit provider record from the credit API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditProvider {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub status_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub enable_integration: bool,
    #[serde(default)]
    pub fulfillment_instructions: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

/// The merged, render-ready aggregate of order, course and provider data.
///
/// Only built once every required fetch has succeeded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceiptViewModel {
    pub order: Order,
    pub course: Option<Course>,
    pub provider: Option<CreditProvider>,
    pub is_verified: bool,
}

impl ReceiptViewModel {
    /// Merge fetched records into a view model.
    pub fn new(order: Order, course: Option<Course>, provider: Option<CreditProvider>) -> Self {
        let is_verified = order.is_verified();
        Self {
            order,
            course,
            provider,
            is_verified,
        }
    }

    /// The provider to display. Only verified orders show one.
    pub fn displayed_provider(&self) -> Option<&CreditProvider> {
        if self.is_verified {
            self.provider.as_ref()
        } else {
            None
        }
    }
}
