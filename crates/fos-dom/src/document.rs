//! Document shell
//!
//! Owns a [`DomTree`] pre-populated with `<html><head/><body/>` so hosts can
//! mount content under a known `<body>`.

use crate::{DomTree, NodeId};

#[derive(Debug)]
pub struct Document {
    tree: DomTree,
    url: String,
    html: NodeId,
    body: NodeId,
}

impl Document {
    pub fn new(url: &str) -> Self {
        let mut tree = DomTree::new();
        let html = tree.append_new_element(tree.root(), "html");
        tree.append_new_element(html, "head");
        let body = tree.append_new_element(html, "body");

        Self { tree, url: url.to_string(), html, body }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// The `<html>` element
    pub fn document_element(&self) -> NodeId {
        self.html
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut DomTree {
        &mut self.tree
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new("about:blank")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_structure() {
        let doc = Document::new("http://localhost/");
        assert_eq!(doc.url(), "http://localhost/");
        assert_eq!(doc.tree().tag_name(doc.body()), Some("body"));
        assert_eq!(doc.tree().parent(doc.body()), Some(doc.document_element()));
        assert_eq!(doc.tree().parent(doc.document_element()), Some(doc.tree().root()));

        let sections: Vec<_> = doc.tree()
            .child_ids(doc.document_element())
            .into_iter()
            .filter_map(|id| doc.tree().tag_name(id))
            .collect();
        assert_eq!(sections, ["head", "body"]);
    }
}
