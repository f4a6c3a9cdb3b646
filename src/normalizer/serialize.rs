use html_escape::{encode_double_quoted_attribute, encode_text};
use scraper::{ElementRef, Node};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "plaintext", "noscript",
];

pub type Attrs = Vec<(String, String)>;

/// Serialize the children of `parent`, letting `rewrite` edit each
/// element's attributes on the way out. Attributes keep their source
/// order, with new ones appended, so a second pass is byte-identical.
pub fn inner_html_with<F>(parent: ElementRef<'_>, rewrite: &F) -> String
where
    F: Fn(&str, &mut Attrs),
{
    let mut out = String::new();
    write_children(&mut out, parent, rewrite);
    out
}

fn write_children<F>(out: &mut String, parent: ElementRef<'_>, rewrite: &F)
where
    F: Fn(&str, &mut Attrs),
{
    let raw = RAW_TEXT_ELEMENTS.contains(&parent.value().name());

    for child in parent.children() {
        match child.value() {
            Node::Text(text) if raw => out.push_str(text),
            Node::Text(text) => out.push_str(&encode_nbsp(&encode_text(&**text))),
            Node::Comment(comment) => {
                out.push_str("<!--");
                out.push_str(comment);
                out.push_str("-->");
            }
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(child) {
                    write_element(out, element, rewrite);
                }
            }
            _ => {}
        }
    }
}

fn write_element<F>(out: &mut String, element: ElementRef<'_>, rewrite: &F)
where
    F: Fn(&str, &mut Attrs),
{
    let name = element.value().name();
    let mut attrs: Attrs = element
        .value()
        .attrs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    rewrite(name, &mut attrs);

    out.push('<');
    out.push_str(name);
    for (key, value) in &attrs {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&encode_nbsp(&encode_double_quoted_attribute(value)));
        out.push('"');
    }
    out.push('>');

    if VOID_ELEMENTS.contains(&name) {
        return;
    }

    write_children(out, element, rewrite);
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn encode_nbsp(s: &str) -> String {
    s.replace('\u{a0}', "&nbsp;")
}

pub fn get_attr<'a>(attrs: &'a Attrs, key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

pub fn set_attr(attrs: &mut Attrs, key: &str, value: String) {
    match attrs.iter_mut().find(|(k, _)| k == key) {
        Some(slot) => slot.1 = value,
        None => attrs.push((key.to_string(), value)),
    }
}

pub fn remove_attr(attrs: &mut Attrs, key: &str) {
    attrs.retain(|(k, _)| k != key);
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn roundtrip(html: &str) -> String {
        let fragment = Html::parse_fragment(html);
        inner_html_with(fragment.root_element(), &|_, _| {})
    }

    #[test]
    fn test_void_elements_have_no_close_tag() {
        assert_eq!(roundtrip("<p>a<br>b</p>"), "<p>a<br>b</p>");
    }

    #[test]
    fn test_text_is_escaped() {
        assert_eq!(roundtrip("<p>a &amp; b &lt; c</p>"), "<p>a &amp; b &lt; c</p>");
    }

    #[test]
    fn test_script_text_is_raw() {
        assert_eq!(
            roundtrip("<script>if (a < b) {}</script>"),
            "<script>if (a < b) {}</script>"
        );
    }

    #[test]
    fn test_attribute_order_preserved() {
        assert_eq!(
            roundtrip(r#"<a title="t" href="/x">x</a>"#),
            r#"<a title="t" href="/x">x</a>"#
        );
    }

    #[test]
    fn test_nbsp_reencoded() {
        assert_eq!(
            roundtrip(r#"<p title="a&nbsp;b">a&nbsp;b</p>"#),
            r#"<p title="a&nbsp;b">a&nbsp;b</p>"#
        );
    }

    #[test]
    fn test_rewrite_hook_sees_tag_name() {
        let fragment = Html::parse_fragment(r#"<img src="a.png"><span></span>"#);
        let html = inner_html_with(fragment.root_element(), &|tag, attrs| {
            if tag == "img" {
                set_attr(attrs, "alt", "x".to_string());
            }
        });
        assert_eq!(html, r#"<img src="a.png" alt="x"><span></span>"#);
    }
}
