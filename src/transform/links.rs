//! Media extraction and link resolution

use crate::catalog::{normalize_identifier, Catalogs};
use crate::media::{MediaName, MediaRequest};
use crate::paths::{path_for, ResourceKind};
use crate::transform::TransformError;
use dom_query::{Document, Selection};
use url::Url;

/// How the wiki links of an article were resolved
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LinkCounts {
    /// Links pointing into the mirror
    pub rewritten: usize,
    /// Links to pages outside the mirror, replaced by their text
    pub unwrapped: usize,
    /// Links marked as leaving the mirror
    pub external: usize,
}

/// Registers every image as a media request and points it at the mirror
///
/// With `enabled` unset, images are removed instead.
pub(crate) fn extract_media(
    doc: &Document,
    site_url: &Url,
    enabled: bool,
) -> Result<Vec<MediaRequest>, TransformError> {
    let mut requests = Vec::new();

    for node in doc.select("img").nodes() {
        let img = Selection::from(node.clone());
        if !enabled {
            img.remove();
            continue;
        }

        let Some(src) = img.attr("src") else {
            tracing::debug!("Dropping image without src");
            img.remove();
            continue;
        };
        let url = site_url
            .join(src.trim())
            .map_err(|source| TransformError::InvalidUrl {
                url: src.to_string(),
                source,
            })?;
        if url.scheme() == "data" {
            continue;
        }

        let name = MediaName::from_url(&url)?;
        let path = path_for(ResourceKind::Media, &name.base)?;
        img.set_attr("src", &path.relative_url());
        img.remove_attr("srcset");
        img.remove_attr("resource");
        requests.push(MediaRequest {
            url: url.to_string(),
            name,
            path,
        });

        // A link around a lone image only leads to the file description page
        let parent = img.parent();
        if parent.is("a") && parent.children().length() == 1 && parent.text().trim().is_empty() {
            let html = img.html();
            parent.replace_with_html(html);
        }
    }

    Ok(requests)
}

/// Splits a wiki link href into the target identifier and its fragment
///
/// `./Kiwix%20Mobile#History` gives `("Kiwix_Mobile", "#History")`; a query
/// string (red links carry one) is dropped.
pub(crate) fn wiki_target(href: &str) -> (String, String) {
    let href = href.trim();
    let href = href.strip_prefix("./").unwrap_or(href);
    let (path, fragment) = match href.find('#') {
        Some(index) => href.split_at(index),
        None => (href, ""),
    };
    let path = path.split('?').next().unwrap_or(path);
    let decoded = urlencoding::decode(path)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| path.to_string());

    (normalize_identifier(&decoded), fragment.to_string())
}

/// Rewrites links according to their relation
///
/// Wiki links into the mirror point at the mirrored file, other wiki links
/// are unwrapped, and external links are tagged and made absolute.
pub(crate) fn resolve_links(
    doc: &Document,
    catalogs: &Catalogs,
    site_url: &Url,
) -> Result<LinkCounts, TransformError> {
    let mut counts = LinkCounts::default();

    for node in doc.select("a[rel]").nodes() {
        let link = Selection::from(node.clone());
        let rel = link.attr("rel").unwrap_or_default();
        let relations: Vec<&str> = rel.split_whitespace().collect();

        let external = relations
            .iter()
            .any(|r| r.starts_with("mw:ExtLink") || *r == "mw:WikiLink/Interwiki");

        if external {
            link.add_class("external");
            if let Some(href) = link.attr("href") {
                if href.starts_with('/') {
                    if let Ok(absolute) = site_url.join(&href) {
                        link.set_attr("href", absolute.as_str());
                    }
                }
            }
            counts.external += 1;
        } else if relations.contains(&"mw:WikiLink") {
            let href = link.attr("href").ok_or_else(|| TransformError::MissingHref {
                text: link.text().trim().to_string(),
            })?;
            let (target, fragment) = wiki_target(&href);

            match catalogs.resolve(&target) {
                Some(resolved) => {
                    let url = path_for(ResourceKind::Article, resolved)?.relative_url();
                    link.set_attr("href", &format!("{}{}", url, fragment));
                    counts.rewritten += 1;
                }
                None => {
                    tracing::debug!("{} is not mirrored, unwrapping link", target);
                    let inner = link.inner_html();
                    link.replace_with_html(inner);
                    counts.unwrapped += 1;
                }
            }
        }
    }

    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ArticleCatalog, RedirectCatalog};
    use crate::media::ORIGINAL_RESOLUTION;

    fn site() -> Url {
        Url::parse("https://en.wikipedia.org/wiki/").unwrap()
    }

    fn catalogs() -> Catalogs {
        let articles: ArticleCatalog = ["Kiwix", "Wikipedia"].iter().map(|s| s.to_string()).collect();
        let mut redirects = RedirectCatalog::new();
        redirects.insert("Kiwi_X".to_string(), "Kiwix".to_string());
        Catalogs::new(articles, redirects).unwrap()
    }

    #[test]
    fn test_wiki_target() {
        assert_eq!(wiki_target("./Kiwix"), ("Kiwix".to_string(), String::new()));
        assert_eq!(
            wiki_target("./Kiwix%20Mobile#History"),
            ("Kiwix_Mobile".to_string(), "#History".to_string())
        );
        assert_eq!(
            wiki_target("./Missing_Page?action=edit&redlink=1"),
            ("Missing_Page".to_string(), String::new())
        );
        assert_eq!(
            wiki_target("./Vend%C3%B4me"),
            ("Vendôme".to_string(), String::new())
        );
    }

    #[test]
    fn test_catalog_hit_is_rewritten() {
        let doc = Document::from(
            r##"<html><body>
            <a rel="mw:WikiLink" href="./Kiwix">self</a>
            <a rel="mw:WikiLink" href="./Wikipedia#History">history</a>
            <a rel="mw:WikiLink" href="./Kiwi_X">alias</a>
            </body></html>"##,
        );

        let counts = resolve_links(&doc, &catalogs(), &site()).unwrap();

        assert_eq!(counts.rewritten, 3);
        let hrefs: Vec<String> = doc
            .select("a")
            .nodes()
            .iter()
            .filter_map(|node| node.attr("href").map(|h| h.to_string()))
            .collect();
        assert_eq!(
            hrefs,
            vec![
                "../../../../../html/K/i/w/i/Kiwix.html",
                "../../../../../html/W/i/k/i/Wikipedia.html#History",
                "../../../../../html/K/i/w/i/Kiwix.html",
            ]
        );
    }

    #[test]
    fn test_catalog_miss_is_unwrapped() {
        let doc = Document::from(
            r#"<html><body><p>See <a rel="mw:WikiLink" href="./Missing_Page"><b>missing</b> page</a>.</p></body></html>"#,
        );

        let counts = resolve_links(&doc, &catalogs(), &site()).unwrap();

        assert_eq!(counts.unwrapped, 1);
        assert_eq!(doc.select("a").length(), 0);
        assert_eq!(
            doc.select("p").inner_html().to_string(),
            "See <b>missing</b> page."
        );
    }

    #[test]
    fn test_missing_href_is_fatal() {
        let doc = Document::from(r#"<html><body><a rel="mw:WikiLink">orphan</a></body></html>"#);
        let err = resolve_links(&doc, &catalogs(), &site()).unwrap_err();
        assert!(matches!(err, TransformError::MissingHref { text } if text == "orphan"));
    }

    #[test]
    fn test_external_links() {
        let doc = Document::from(
            r#"<html><body>
            <a rel="mw:ExtLink" href="https://kiwix.org">Kiwix</a>
            <a rel="mw:WikiLink/Interwiki" href="/wiki/fr:Kiwix">fr</a>
            </body></html>"#,
        );

        let counts = resolve_links(&doc, &catalogs(), &site()).unwrap();

        assert_eq!(counts.external, 2);
        assert_eq!(doc.select("a.external").length(), 2);
        let interwiki = doc.select(r#"a[rel="mw:WikiLink/Interwiki"]"#);
        assert_eq!(
            interwiki.attr("href").unwrap().to_string(),
            "https://en.wikipedia.org/wiki/fr:Kiwix"
        );
    }

    #[test]
    fn test_media_extraction() {
        let doc = Document::from(
            r#"<html><body>
            <a href="./File:Logo.png" class="mw-file-description"><img src="//upload.wikimedia.org/thumb/a/ab/Logo.png/200px-Logo.png" srcset="x 2x" resource="./File:Logo.png"/></a>
            <img src="https://upload.wikimedia.org/c/c9/Map.svg"/>
            </body></html>"#,
        );

        let media = extract_media(&doc, &site(), true).unwrap();

        assert_eq!(media.len(), 2);
        assert_eq!(
            media[0].url,
            "https://upload.wikimedia.org/thumb/a/ab/Logo.png/200px-Logo.png"
        );
        assert_eq!(media[0].name.base, "Logo.png");
        assert_eq!(media[0].name.resolution, 200);
        assert_eq!(media[1].name.resolution, ORIGINAL_RESOLUTION);

        // The file description link is gone, the image is kept
        assert_eq!(doc.select("a").length(), 0);
        let logo = doc.select(r#"img[src="../../../../../media/L/o/g/o/Logo.png"]"#);
        assert_eq!(logo.length(), 1);
        assert!(logo.attr("srcset").is_none());
        assert!(logo.attr("resource").is_none());
    }

    #[test]
    fn test_media_disabled_removes_images() {
        let doc = Document::from(r#"<html><body><img src="//upload.wikimedia.org/Logo.png"/></body></html>"#);
        let media = extract_media(&doc, &site(), false).unwrap();
        assert!(media.is_empty());
        assert_eq!(doc.select("img").length(), 0);
    }

    #[test]
    fn test_unparsable_media_name_is_fatal() {
        let doc = Document::from(r#"<html><body><img src="https://upload.wikimedia.org/"/></body></html>"#);
        let err = extract_media(&doc, &site(), true).unwrap_err();
        assert!(matches!(err, TransformError::BadMediaName(_)));
    }
}
