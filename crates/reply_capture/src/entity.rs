use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A recommended item referenced from the reply text, identified by index.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_ref: Option<String>,
}

fn indexed_reference() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)product(\d+)","([^"]*)"\]"#).expect("indexed reference pattern")
    })
}

fn selections_start() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)"?selections"?\s*:?\s*\["#).expect("selections pattern")
    })
}

fn turn_identifier() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)"(turn\d+[^"\]]*)""#).expect("turn identifier pattern"))
}

/// Extracts products in order of first appearance of each index.
///
/// Returns `None` when the text references no products.
pub fn extract_products(text: &str) -> Option<Vec<Product>> {
    let mut products: Vec<Product> = Vec::new();

    for caps in indexed_reference().captures_iter(text) {
        let Ok(index) = caps[1].parse::<u32>() else {
            continue;
        };
        let value = caps[2].trim();
        let position = match products.iter().position(|p| p.index == index) {
            Some(position) => position,
            None => {
                products.push(Product {
                    index,
                    ..Product::default()
                });
                products.len() - 1
            }
        };
        if value.is_empty() {
            continue;
        }
        let product = &mut products[position];
        let slot = if looks_like_url(value) {
            &mut product.url
        } else {
            &mut product.name
        };
        if slot.is_none() {
            *slot = Some(value.to_string());
        }
    }

    if products.is_empty() {
        return None;
    }

    for (product, turn_ref) in products.iter_mut().zip(selection_turn_refs(text)) {
        if product.turn_ref.is_none() {
            product.turn_ref = Some(turn_ref);
        }
    }

    Some(products)
}

/// Turn identifiers listed in a `selections` block, in order. The block ends
/// at the first `]]` or at the end of the text.
fn selection_turn_refs(text: &str) -> Vec<String> {
    let Some(start) = selections_start().find(text) else {
        return Vec::new();
    };
    let block = &text[start.end()..];
    let block = match block.find("]]") {
        Some(end) => &block[..end],
        None => block,
    };
    turn_identifier()
        .captures_iter(block)
        .map(|caps| caps[1].to_string())
        .collect()
}

fn looks_like_url(value: &str) -> bool {
    let lower = value.get(..8).unwrap_or(value).to_ascii_lowercase();
    lower.starts_with("https://") || lower.starts_with("http://")
}
