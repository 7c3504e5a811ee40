//! HTML import (via `scraper`) and serialization for [`MemoryDocument`].

use super::memory::{ElementData, NodeKind, Tree};
use super::{DomError, MemoryDocument, NodeId};
use scraper::{ElementRef, Html};
use std::cell::RefCell;

/// Elements that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose text content is emitted verbatim.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

impl MemoryDocument {
    /// Parse an HTML document.
    ///
    /// The parser is error-tolerant (html5ever), so malformed markup still
    /// yields a document with `<html>`, `<head>` and `<body>`.
    pub fn from_html(source: &str) -> Result<Self, DomError> {
        let parsed = Html::parse_document(source);
        let mut tree = Tree::empty();
        let root = tree.root;
        import_element(&mut tree, root, parsed.root_element())?;
        Ok(Self {
            tree: RefCell::new(tree),
        })
    }

    /// Serialize the attached tree back to HTML.
    pub fn to_html(&self) -> String {
        let tree = self.tree.borrow();
        let mut out = String::from("<!DOCTYPE html>\n");
        for child in &tree.nodes[tree.root.0].children {
            write_node(&tree, *child, &mut out, false);
        }
        out.push('\n');
        out
    }
}

fn import_element(tree: &mut Tree, parent: NodeId, element: ElementRef<'_>) -> Result<(), DomError> {
    let value = element.value();
    let mut data = ElementData::new(value.name());
    for (name, attr_value) in value.attrs() {
        if name.eq_ignore_ascii_case("style") {
            data.set_style_attr(attr_value);
        } else {
            data.set(&name.to_ascii_lowercase(), attr_value);
        }
    }
    let node = tree.create(NodeKind::Element(data));
    tree.append(parent, node)?;

    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            import_element(tree, node, child_element)?;
        } else if let Some(text) = child.value().as_text() {
            let text: &str = text;
            let text_node = tree.create(NodeKind::Text(text.to_string()));
            tree.append(node, text_node)?;
        }
    }
    Ok(())
}

fn escape(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

fn write_node(tree: &Tree, node: NodeId, out: &mut String, raw: bool) {
    match &tree.nodes[node.0].kind {
        NodeKind::Document => {}
        // An end-tag opener inside raw text would close the element early.
        NodeKind::Text(text) if raw => out.push_str(&text.replace("</", "<\\/")),
        NodeKind::Text(text) => out.push_str(&escape(text, false)),
        NodeKind::Element(el) => {
            out.push('<');
            out.push_str(&el.tag);
            for (name, value) in &el.attrs {
                // Live control values are written back as the default so the
                // output reflects what the user would see.
                let value = match (&el.value, name.as_str(), el.tag.as_str()) {
                    (Some(live), "value", "input") => live.as_str(),
                    _ => value.as_str(),
                };
                push_attr(out, name, value);
            }
            if el.tag == "input" && el.get("value").is_none() {
                if let Some(live) = el.value.as_deref().filter(|v| !v.is_empty()) {
                    push_attr(out, "value", live);
                }
            }
            if let Some(style) = el.style_attr() {
                push_attr(out, "style", &style);
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&el.tag.as_str()) {
                return;
            }
            let raw_children = RAW_TEXT_ELEMENTS.contains(&el.tag.as_str());
            for child in &tree.nodes[node.0].children {
                write_node(tree, *child, out, raw_children);
            }
            out.push_str("</");
            out.push_str(&el.tag);
            out.push('>');
        }
    }
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    if !value.is_empty() {
        out.push_str("=\"");
        out.push_str(&escape(value, true));
        out.push('"');
    }
}

#[cfg(test)]
mod tests {
    use crate::dom::{Dom, MemoryDocument};

    const PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>Pest Control | Acadiana</title></head>
<body>
  <header class="site-header"><a class="nav-link" href="contact.html">Contact &amp; Quote</a></header>
  <div class="faq-answer" style="max-height: 10px">Answer</div>
  <input type="email" name="email" required>
  <script>if (a < b) { go(); }</script>
</body></html>"#;

    #[test]
    fn import_preserves_structure_and_attributes() {
        let doc = MemoryDocument::from_html(PAGE).unwrap();
        let link = doc.query(".site-header .nav-link").unwrap().unwrap();
        assert_eq!(doc.attr(link, "href").as_deref(), Some("contact.html"));
        assert_eq!(doc.text(link), "Contact & Quote");
        let answer = doc.query(".faq-answer").unwrap().unwrap();
        assert_eq!(doc.style(answer, "max-height").as_deref(), Some("10px"));
        let title = doc.query("title").unwrap().unwrap();
        assert_eq!(doc.text(title), "Pest Control | Acadiana");
    }

    #[test]
    fn serialization_escapes_text_but_not_scripts() {
        let doc = MemoryDocument::from_html(PAGE).unwrap();
        let html = doc.to_html();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("Contact &amp; Quote"));
        assert!(html.contains("if (a < b) { go(); }"));
        assert!(html.contains(r#"<input type="email" name="email" required>"#));
        assert!(!html.contains("</input>"));
    }

    #[test]
    fn script_text_cannot_end_its_element() {
        let doc = MemoryDocument::from_html(PAGE).unwrap();
        let script = doc.query("script").unwrap().unwrap();
        doc.set_text(script, "var s = \"</script><b>x</b>\";").unwrap();
        let html = doc.to_html();
        assert!(!html.contains("</script><b>"));
        assert!(html.contains(r#"var s = "<\/script><b>x<\/b>";</script>"#));
        let reparsed = MemoryDocument::from_html(&html).unwrap();
        assert!(reparsed.query("b").unwrap().is_none());
    }

    #[test]
    fn serialization_writes_live_input_values() {
        let doc = MemoryDocument::from_html(PAGE).unwrap();
        let email = doc.query("input[name=email]").unwrap().unwrap();
        doc.set_value(email, "a@b.co").unwrap();
        assert!(doc.to_html().contains(r#"value="a@b.co""#));
    }
}
