//! Visible text extraction

use scraper::{Html, Node};

/// Elements whose text never reaches the reader
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "svg"];

/// Returns the text a reader would see, one space between text nodes
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut text = String::new();

    for node in document.root_element().descendants() {
        let Node::Text(fragment) = node.value() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map_or(false, |element| HIDDEN_ELEMENTS.contains(&element.name()))
        });
        if hidden {
            continue;
        }

        let fragment = fragment.trim();
        if !fragment.is_empty() {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(fragment);
        }
    }

    text
}

/// Collapses whitespace runs to single spaces and lower-cases
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
