//! Receipt markup generation.
//!
//! Pure functions from a [`ReceiptViewModel`] to markup. Nothing here
//! touches the page or the network.

use crate::error::ReceiptError;
use crate::models::{CreditProvider, LineItem, ReceiptViewModel};
use crate::receipt::templates::{escape_html, Bindings, TemplateSet};
use chrono::{DateTime, Utc};

const DATE_FORMAT: &str = "%B %-d, %Y";

/// Render the receipt markup for a view model.
///
/// Both template slots must be present even when the provider block ends
/// up empty.
pub fn render_receipt(
    model: &ReceiptViewModel,
    templates: &TemplateSet,
) -> Result<String, ReceiptError> {
    let receipt_tpl = templates.receipt()?;
    let provider_tpl = templates.provider()?;

    let provider_block = match model.displayed_provider() {
        Some(provider) => render_provider(provider, model, provider_tpl),
        None => String::new(),
    };

    let order = &model.order;
    let billed_to = order.billed_to.clone().unwrap_or_default();

    let mut b = Bindings::new();
    b.text("order_number", &order.number)
        .text("order_status", &order.status.to_string())
        .text("order_date", &format_date(order.date_placed))
        .text("total", &order.total_excl_tax)
        .text("currency", &order.currency)
        .text("billed_to_name", &billed_to.full_name())
        .text("billed_to_address", &billed_to.one_line())
        .text("is_verified", if model.is_verified { "true" } else { "false" })
        .raw("lines", render_lines(&order.lines, &order.currency))
        .raw("provider", provider_block);

    bind_course(&mut b, model);

    Ok(b.apply(receipt_tpl))
}

fn bind_course(b: &mut Bindings, model: &ReceiptViewModel) {
    match model.course {
        Some(ref course) => {
            let end = course
                .end
                .map(|end| format!("Ends {}", format_date(Some(end))))
                .unwrap_or_default();
            b.text("course_name", &course.name)
                .text("course_key", &course.id)
                .text("course_start", &format_date(course.start))
                .text("course_end", &end);
        }
        None => {
            b.text("course_name", "")
                .text("course_key", "")
                .text("course_start", "")
                .text("course_end", "");
        }
    }
}

/// Render the provider block.
fn render_provider(
    provider: &CreditProvider,
    model: &ReceiptViewModel,
    template: &str,
) -> String {
    let course_name = model
        .course
        .as_ref()
        .map(|c| c.name.as_str())
        .unwrap_or_default();

    let mut b = Bindings::new();
    b.text("provider_id", &provider.id)
        .text("provider_name", &provider.display_name)
        .text("provider_description", opt(&provider.description))
        .text("provider_url", opt(&provider.url))
        .text("provider_status_url", opt(&provider.status_url))
        .text("provider_thumbnail_url", opt(&provider.thumbnail_url))
        .text(
            "provider_instructions",
            opt(&provider.fulfillment_instructions),
        )
        .text("course_name", course_name);

    b.apply(template)
}

/// Render one table row per line item.
fn render_lines(lines: &[LineItem], currency: &str) -> String {
    let mut rows = String::new();

    for line in lines {
        let title = line
            .title
            .as_deref()
            .or(line.product.title.as_deref())
            .unwrap_or_default();

        rows.push_str("      <tr class=\"order-line\">");
        rows.push_str(&format!("<td class=\"line-title\">{}</td>", escape_html(title)));
        rows.push_str(&format!("<td class=\"line-quantity\">{}</td>", line.quantity));
        rows.push_str(&format!(
            "<td class=\"line-unit-price\">{}</td>",
            money(line.unit_price_excl_tax.as_deref(), currency)
        ));
        rows.push_str(&format!(
            "<td class=\"line-price\">{}</td>",
            money(line.line_price_excl_tax.as_deref(), currency)
        ));
        rows.push_str("</tr>\n");
    }

    rows
}

fn money(amount: Option<&str>, currency: &str) -> String {
    match amount {
        Some(amount) => format!("{} {}", escape_html(amount), escape_html(currency)),
        None => String::new(),
    }
}

fn format_date(date: Option<DateTime<Utc>>) -> String {
    date.map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

fn opt(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or_default()
}
