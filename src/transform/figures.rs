use crate::config::TextDirection;
use dom_query::{Document, Selection};

/// Turns reference markers into superscripts, dropping empty ones
pub(crate) fn convert_references(doc: &Document) {
    for node in doc.select(r#"span[rel="dc:references"]"#).nodes() {
        let span = Selection::from(node.clone());
        let inner = span.inner_html();
        if inner.trim().is_empty() {
            span.remove();
        } else {
            span.replace_with_html(format!("<sup>{}</sup>", inner));
        }
    }
}

/// Thumbnail class for a figure, and whether it has to be centered
fn alignment(figure: &Selection, direction: TextDirection) -> (String, bool) {
    if figure.has_class("mw-halign-left") {
        ("tleft".to_string(), false)
    } else if figure.has_class("mw-halign-right") {
        ("tright".to_string(), false)
    } else if figure.has_class("mw-halign-center") {
        ("tnone".to_string(), true)
    } else {
        (format!("t{}", direction.default_float()), false)
    }
}

/// Rebuilds figures as classic thumbnail boxes
///
/// ```text
/// div.thumb.<align>
///   div.thumbinner[style=width:(w+2)px]
///     img
///     div.thumbcaption
/// ```
pub(crate) fn convert_figures(doc: &Document, direction: TextDirection) {
    for node in doc.select("figure").nodes() {
        let figure = Selection::from(node.clone());
        let img = figure.select("img");
        if img.length() == 0 {
            continue;
        }

        let (align, centered) = alignment(&figure, direction);
        let style = img
            .attr("width")
            .and_then(|width| width.trim().parse::<u32>().ok())
            .map(|width| format!(r#" style="width:{}px""#, width.saturating_add(2)))
            .unwrap_or_default();
        let caption = figure.select("figcaption").inner_html();

        let thumb = format!(
            r#"<div class="thumb {align}"><div class="thumbinner"{style}>{img}<div class="thumbcaption" style="text-align: {text_align}">{caption}</div></div></div>"#,
            align = align,
            style = style,
            img = img.html(),
            text_align = direction.text_align(),
            caption = caption,
        );
        let html = if centered {
            format!(r#"<div class="center">{}</div>"#, thumb)
        } else {
            thumb
        };

        figure.replace_with_html(html);
    }
}
