//! Removal of navigation chrome and renderer metadata

use crate::config::TransformConfig;
use dom_query::{Document, Selection};

/// Attributes only meaningful to the rendering service
const RENDERER_ATTRIBUTES: [&str; 4] = ["data-parsoid", "data-mw", "typeof", "about"];

/// Attribute selector matching one class token
///
/// Quoting keeps arbitrary configured names from producing an invalid
/// selector.
fn class_selector(class: &str) -> String {
    format!(r#"[class~="{}"]"#, sanitize(class))
}

fn id_selector(id: &str) -> String {
    format!(r#"[id="{}"]"#, sanitize(id))
}

fn sanitize(value: &str) -> String {
    value.chars().filter(|c| *c != '"' && *c != '\\').collect()
}

/// Removes blacklisted elements
///
/// Returns the number of elements removed.
pub(crate) fn prune(doc: &Document, rules: &TransformConfig) -> usize {
    let mut removed = 0;

    for class in &rules.css_class_blacklist {
        let matched = doc.select(&class_selector(class));
        removed += matched.length();
        matched.remove();
    }

    for class in &rules.css_class_blacklist_if_no_link {
        for node in doc.select(&class_selector(class)).nodes() {
            let element = Selection::from(node.clone());
            if element.select("a").length() == 0 {
                element.remove();
                removed += 1;
            }
        }
    }

    for id in &rules.id_blacklist {
        let matched = doc.select(&id_selector(id));
        removed += matched.length();
        matched.remove();
    }

    removed
}

/// Strips renderer attributes, `mw:` relations and blacklisted class tokens
pub(crate) fn strip_metadata(doc: &Document, rules: &TransformConfig) {
    for attribute in RENDERER_ATTRIBUTES {
        doc.select(&format!("[{}]", attribute)).remove_attr(attribute);
    }

    for node in doc.select("[rel]").nodes() {
        let element = Selection::from(node.clone());
        let rel = element.attr("rel").unwrap_or_default();
        let kept: Vec<&str> = rel
            .split_whitespace()
            .filter(|token| !token.starts_with("mw:"))
            .collect();

        if kept.is_empty() {
            element.remove_attr("rel");
        } else {
            element.set_attr("rel", &kept.join(" "));
        }
    }

    for class in &rules.css_class_calls_blacklist {
        doc.select(&class_selector(class)).remove_class(class);
    }

    for node in doc.select("[class]").nodes() {
        let element = Selection::from(node.clone());
        let empty = element
            .attr("class")
            .map(|class| class.trim().is_empty())
            .unwrap_or(false);
        if empty {
            element.remove_attr("class");
        }
    }
}
