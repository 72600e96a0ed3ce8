//! Page templates of the mirror
//!
//! Articles, redirect stubs and the entry point are plain HTML documents
//! linking the shared assets through relative URLs.

use crate::config::TextDirection;
use crate::paths::{
    asset_url, BODY_SCRIPT_PATH, DOCUMENT_DEPTH, FAVICON_PATH, HEAD_SCRIPT_PATH, STYLESHEET_PATH,
};

/// Escapes text for use in HTML content and attribute values
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Human readable title of an identifier
pub fn display_title(id: &str) -> String {
    id.replace('_', " ")
}

/// Embeds rewritten article content into the page template
pub fn article_page(title: &str, content: &str, direction: TextDirection) -> String {
    let title = escape_html(title);
    let dir = direction.as_str();

    format!(
        r#"<!DOCTYPE html>
<html dir="{dir}">
<head>
<meta charset="utf-8" />
<title>{title}</title>
<link rel="stylesheet" href="{style}" />
<link rel="icon" href="{favicon}" />
<script src="{head_js}"></script>
</head>
<body class="mediawiki {dir} sitedir-{dir}">
<div id="content" class="mw-body">
<h1 id="firstHeading" class="firstHeading">{title}</h1>
<div id="bodyContent" class="mw-body-content">
<div id="mw-content-text" dir="{dir}">
{content}
</div>
</div>
</div>
<script src="{body_js}"></script>
</body>
</html>
"#,
        dir = dir,
        title = title,
        content = content,
        style = asset_url(STYLESHEET_PATH, DOCUMENT_DEPTH),
        favicon = asset_url(FAVICON_PATH, DOCUMENT_DEPTH),
        head_js = asset_url(HEAD_SCRIPT_PATH, DOCUMENT_DEPTH),
        body_js = asset_url(BODY_SCRIPT_PATH, DOCUMENT_DEPTH),
    )
}

/// Attribution block appended to every article
pub fn footer(site_name: &str, source_url: &str, date: &str) -> String {
    format!(
        r#"<div id="mw-mirror-footer" class="mirror-footer"><p>This article is issued from <a class="external" href="{url}">{site}</a>, mirrored on {date}.</p></div>"#,
        url = escape_html(source_url),
        site = escape_html(site_name),
        date = escape_html(date),
    )
}

/// Minimal document sending the reader from `alias` to `target_url`
///
/// `target_url` must be relative to a sharded document, as returned by
/// [`crate::paths::ShardedPath::relative_url`].
pub fn redirect_stub(alias: &str, target_url: &str) -> String {
    refresh_page(&display_title(alias), target_url)
}

/// Entry point document sending the reader to the main page
///
/// `main_url` must be relative to the entry point itself.
pub fn index_stub(main_url: &str) -> String {
    refresh_page("Main Page", main_url)
}

fn refresh_page(title: &str, url: &str) -> String {
    let title = escape_html(title);
    let url = escape_html(url);

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8" />
<title>{title}</title>
<meta http-equiv="refresh" content="0;URL='{url}'" />
</head>
<body><a href="{url}">{title}</a></body>
</html>
"#
    )
}
