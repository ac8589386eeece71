//! Inserting rendered markup into a host page.

use crate::error::ReceiptError;
use crate::receipt::templates::escape_html;

/// Replace the inner content of the element with `id="{container_id}"`.
///
/// The id is matched in its HTML-escaped form, as the page shell writes it.
/// Nested elements with the same tag name are balanced, so a container
/// that already holds a previous receipt is replaced wholesale.
pub fn mount(page: &str, container_id: &str, markup: &str) -> Result<String, ReceiptError> {
    let missing = || ReceiptError::ContainerMissing(container_id.to_string());

    let id_pos = find_id_attr(page, &escape_html(container_id)).ok_or_else(missing)?;
    let tag_start = page[..id_pos].rfind('<').ok_or_else(missing)?;
    let tag_name: String = page[tag_start + 1..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    if tag_name.is_empty() {
        return Err(missing());
    }

    let open_end = id_pos + page[id_pos..].find('>').ok_or_else(missing)? + 1;
    let close_start = find_matching_close(page, open_end, &tag_name).ok_or_else(missing)?;

    let mut out = String::with_capacity(page.len() + markup.len());
    out.push_str(&page[..open_end]);
    out.push_str(markup);
    out.push_str(&page[close_start..]);
    Ok(out)
}

/// Container ids are limited to `[A-Za-z0-9_:.-]`, which need no escaping.
pub fn is_valid_container_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
}

/// Position of an `id="..."` (or single-quoted) attribute naming `id`.
fn find_id_attr(page: &str, id: &str) -> Option<usize> {
    for quote in ['"', '\''] {
        let needle = format!("id={quote}{id}{quote}");
        let hit = page.match_indices(&needle).find(|(pos, _)| {
            page[..*pos]
                .chars()
                .next_back()
                .is_some_and(char::is_whitespace)
        });
        if let Some((pos, _)) = hit {
            return Some(pos);
        }
    }
    None
}

/// Find the `</tag>` that closes the element whose content starts at `from`.
fn find_matching_close(page: &str, from: usize, tag: &str) -> Option<usize> {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    let mut depth = 0usize;
    let mut pos = from;

    loop {
        let next_close = pos + page[pos..].find(&close)?;
        let next_open = page[pos..].find(&open).map(|p| pos + p);

        match next_open {
            Some(o) if o < next_close => {
                let after = o + open.len();
                if is_tag_boundary(page, after) {
                    depth += 1;
                }
                pos = after;
            }
            _ => {
                if depth == 0 {
                    return Some(next_close);
                }
                depth -= 1;
                pos = next_close + close.len();
            }
        }
    }
}

fn is_tag_boundary(page: &str, at: usize) -> bool {
    page[at..]
        .chars()
        .next()
        .is_some_and(|c| c.is_whitespace() || c == '>' || c == '/')
}
