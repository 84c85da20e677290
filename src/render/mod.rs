//! Render Contract - document to visual tree
//!
//! Templates build a [`Node`] tree; `to_html` turns it into markup for the
//! print hand-off. Rendering never mutates the document.

pub mod builtin;
pub mod format;
pub mod sections;

use serde::Serialize;
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Node {
    Element(Element),
    Text { text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Element {
    pub tag: String,
    pub classes: Vec<String>,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text { text: text.into() }
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    /// Concatenated text of the subtree, separated by single spaces.
    pub fn text_content(&self) -> String {
        let mut parts = Vec::new();
        self.collect_text(&mut parts);
        parts.join(" ")
    }

    /// Elements carrying `class`, depth first.
    pub fn find_by_class(&self, class: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        self.collect_class(class, &mut found);
        found
    }

    fn collect_text<'a>(&'a self, parts: &mut Vec<&'a str>) {
        match self {
            Node::Text { text } => parts.push(text),
            Node::Element(el) => el.children.iter().for_each(|c| c.collect_text(parts)),
        }
    }

    fn collect_class<'a>(&'a self, class: &str, found: &mut Vec<&'a Element>) {
        if let Node::Element(el) = self {
            if el.classes.iter().any(|c| c == class) {
                found.push(el);
            }
            el.children.iter().for_each(|c| c.collect_class(class, found));
        }
    }

    fn write_html(&self, out: &mut String) {
        match self {
            Node::Text { text } => out.push_str(&escape_html(text)),
            Node::Element(el) => {
                let _ = write!(out, "<{}", el.tag);
                if !el.classes.is_empty() {
                    let _ = write!(out, " class=\"{}\"", escape_html(&el.classes.join(" ")));
                }
                for (name, value) in &el.attributes {
                    let _ = write!(out, " {}=\"{}\"", name, escape_html(value));
                }
                out.push('>');
                for child in &el.children {
                    child.write_html(out);
                }
                let _ = write!(out, "</{}>", el.tag);
            }
        }
    }
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            classes: vec![],
            attributes: vec![],
            children: vec![],
        }
    }

    pub fn class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attributes.push((name.to_string(), value.into()));
        self
    }

    pub fn child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I, N>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    /// Appends a text child.
    pub fn text(self, text: impl Into<String>) -> Self {
        self.child(Node::text(text))
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Whether any descendant text is non-blank.
    pub fn has_text(&self) -> bool {
        self.children.iter().any(|child| match child {
            Node::Text { text } => !text.trim().is_empty(),
            Node::Element(el) => el.has_text(),
        })
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Node::Element(el)
    }
}

/// Shorthand for [`Element::new`].
pub fn el(tag: &str) -> Element {
    Element::new(tag)
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_html_escapes() {
        let node: Node = el("p")
            .class("note")
            .attr("title", "a\"b")
            .text("<script>&</script>")
            .into();
        assert_eq!(
            node.to_html(),
            "<p class=\"note\" title=\"a&quot;b\">&lt;script&gt;&amp;&lt;/script&gt;</p>"
        );
    }

    #[test]
    fn test_find_by_class_and_text_content() {
        let node: Node = el("div")
            .child(el("span").class("x").text("one"))
            .child(el("div").child(el("span").class("x").text("two")))
            .into();
        assert_eq!(node.find_by_class("x").len(), 2);
        assert_eq!(node.text_content(), "one two");
    }
}
