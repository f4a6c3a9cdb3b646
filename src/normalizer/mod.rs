//! HTML content normalization.
//!
//! Rewrites lazy-loaded images and relative links to absolute URLs so a
//! fragment lifted out of its page still renders. Nothing is stripped.

mod serialize;

use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::warn;
use url::Url;

pub use serialize::inner_html_with;
use serialize::{get_attr, remove_attr, set_attr, Attrs};

/// Lazy-loading attributes, in priority order.
pub const LAZY_IMAGE_ATTRS: [&str; 4] = ["data-original", "data-src", "data-url", "lazy-src"];

static BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("valid body selector"));

/// Normalize `html` against `base_url` and return the body's inner HTML.
///
/// Never fails: if the base URL cannot be parsed the input is returned
/// unchanged.
pub fn normalize(html: &str, base_url: &str) -> String {
    if html.is_empty() {
        return String::new();
    }

    let Some(origin) = origin_of(base_url) else {
        warn!(base_url, "Cannot normalize against an unparsable base URL");
        return html.to_string();
    };

    let document = Html::parse_document(html);
    let Some(body) = document.select(&BODY).next() else {
        return html.to_string();
    };

    inner_html_with(body, &|tag, attrs| match tag {
        "img" => fix_image(attrs, &origin),
        "a" => fix_anchor(attrs, &origin),
        _ => {}
    })
}

/// Text content of an HTML fragment, markup stripped.
pub fn plain_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text: String = fragment.root_element().text().collect();
    text.trim().to_string()
}

fn origin_of(base_url: &str) -> Option<Url> {
    Url::parse(base_url).ok()?.join("/").ok()
}

fn resolve(value: &str, origin: &Url) -> String {
    origin
        .join(value)
        .map(String::from)
        .unwrap_or_else(|_| value.to_string())
}

fn fix_image(attrs: &mut Attrs, origin: &Url) {
    let lazy = LAZY_IMAGE_ATTRS
        .iter()
        .find_map(|name| get_attr(attrs, name).filter(|v| !v.is_empty()))
        .map(str::to_string);

    match lazy {
        Some(lazy) => {
            let src = if is_absolute_image(&lazy) {
                lazy
            } else {
                resolve(&lazy, origin)
            };
            set_attr(attrs, "src", src);
            remove_attr(attrs, "srcset");
        }
        None => {
            if let Some(src) = get_attr(attrs, "src").filter(|s| !s.is_empty()) {
                if !is_absolute_image(src) {
                    let resolved = resolve(src, origin);
                    set_attr(attrs, "src", resolved);
                }
            }
        }
    }
}

fn fix_anchor(attrs: &mut Attrs, origin: &Url) {
    if let Some(href) = get_attr(attrs, "href").filter(|h| !h.is_empty()) {
        if !href.starts_with("http") && !href.starts_with('#') {
            let resolved = resolve(href, origin);
            set_attr(attrs, "href", resolved);
        }
    }
    set_attr(attrs, "target", "_blank".to_string());
    set_attr(attrs, "rel", "noopener noreferrer".to_string());
}

fn is_absolute_image(src: &str) -> bool {
    src.starts_with("http") || src.starts_with("data:")
}
