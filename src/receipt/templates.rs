//! Receipt templates and placeholder binding.
//!
//! Templates use `{{ name }}` placeholders. Text values are HTML-escaped
//! when bound; fragments rendered by the crate itself are inserted as-is.

use crate::error::ReceiptError;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

pub const RECEIPT_SLOT: &str = "receipt";
pub const PROVIDER_SLOT: &str = "provider";

const BUILTIN_RECEIPT: &str = include_str!("../../templates/receipt.html");
const BUILTIN_PROVIDER: &str = include_str!("../../templates/provider.html");
const BUILTIN_PAGE: &str = include_str!("../../templates/page.html");

/// The named templates a render needs.
///
/// `receipt` and `provider` are required slots; a missing one fails the
/// render rather than the load, so callers see `TemplateMissing` at the
/// point of use.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    receipt: Option<String>,
    provider: Option<String>,
    page: String,
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TemplateSet {
    /// Templates compiled into the binary.
    pub fn builtin() -> Self {
        Self {
            receipt: Some(BUILTIN_RECEIPT.to_string()),
            provider: Some(BUILTIN_PROVIDER.to_string()),
            page: BUILTIN_PAGE.to_string(),
        }
    }

    /// Build a set from explicit slot contents.
    pub fn new(receipt: Option<String>, provider: Option<String>, page: Option<String>) -> Self {
        Self {
            receipt,
            provider,
            page: page.unwrap_or_else(|| BUILTIN_PAGE.to_string()),
        }
    }

    /// Load `receipt.html`, `provider.html` and optionally `page.html` from a directory.
    pub fn from_dir(dir: &Path) -> Result<Self, ReceiptError> {
        info!("Loading templates from {}", dir.display());

        let receipt = read_optional(&dir.join("receipt.html"))?;
        let provider = read_optional(&dir.join("provider.html"))?;
        let page = read_optional(&dir.join("page.html"))?;

        Ok(Self::new(receipt, provider, page))
    }

    pub fn receipt(&self) -> Result<&str, ReceiptError> {
        self.receipt
            .as_deref()
            .ok_or_else(|| ReceiptError::TemplateMissing(RECEIPT_SLOT.to_string()))
    }

    pub fn provider(&self) -> Result<&str, ReceiptError> {
        self.provider
            .as_deref()
            .ok_or_else(|| ReceiptError::TemplateMissing(PROVIDER_SLOT.to_string()))
    }

    /// The host page with its container id filled in.
    pub fn page_shell(&self, container_id: &str) -> String {
        let mut b = Bindings::new();
        b.text("container_id", container_id);
        b.apply(&self.page)
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, ReceiptError> {
    if path.exists() {
        Ok(Some(std::fs::read_to_string(path)?))
    } else {
        debug!("Template not found: {}", path.display());
        Ok(None)
    }
}

/// Values bound into a template.
#[derive(Debug, Default)]
pub struct Bindings {
    values: HashMap<&'static str, String>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a text value, HTML-escaped.
    pub fn text(&mut self, name: &'static str, value: &str) -> &mut Self {
        self.values.insert(name, escape_html(value));
        self
    }

    /// Bind pre-rendered markup, inserted verbatim.
    pub fn raw(&mut self, name: &'static str, markup: String) -> &mut Self {
        self.values.insert(name, markup);
        self
    }

    /// Substitute every `{{ name }}` in `template`. Unknown names render empty.
    pub fn apply(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find("{{") {
            out.push_str(&rest[..open]);
            let after = &rest[open + 2..];

            match after.find("}}") {
                Some(close) => {
                    let name = after[..close].trim();
                    match self.values.get(name) {
                        Some(value) => out.push_str(value),
                        None => debug!(placeholder = name, "unbound placeholder"),
                    }
                    rest = &after[close + 2..];
                }
                None => {
                    // Unterminated: keep the text as written.
                    out.push_str(&rest[open..]);
                    rest = "";
                }
            }
        }

        out.push_str(rest);
        out
    }
}

/// Escape text for HTML element content and quoted attributes.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
