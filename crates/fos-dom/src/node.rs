//! Arena nodes
//!
//! Links between nodes are `NodeId`s into the owning [`DomTree`](crate::DomTree).
//! `NodeId::NONE` marks a missing link.

use crate::NodeId;

/// One arena slot
#[derive(Debug, Clone)]
pub struct Node {
    pub parent: NodeId,
    pub first_child: NodeId,
    /// Kept so appends don't walk the sibling chain
    pub last_child: NodeId,
    pub prev_sibling: NodeId,
    pub next_sibling: NodeId,
    pub data: NodeData,
}

/// Node payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Element(ElementData),
    Text(String),
    Comment(String),
}

impl Node {
    pub fn new(data: NodeData) -> Self {
        Self {
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
            data,
        }
    }

    pub fn element(tag: &str) -> Self {
        Self::new(NodeData::Element(ElementData::new(tag)))
    }

    pub fn text(content: &str) -> Self {
        Self::new(NodeData::Text(content.to_string()))
    }

    pub fn comment(content: &str) -> Self {
        Self::new(NodeData::Comment(content.to_string()))
    }

    pub fn document() -> Self {
        Self::new(NodeData::Document)
    }

    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    pub fn as_element(&self) -> Option<&ElementData> {
        let NodeData::Element(element) = &self.data else {
            return None;
        };
        Some(element)
    }

    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        let NodeData::Element(element) = &mut self.data else {
            return None;
        };
        Some(element)
    }

    /// Content of a text node; `None` for every other kind
    pub fn as_text(&self) -> Option<&str> {
        let NodeData::Text(content) = &self.data else {
            return None;
        };
        Some(content)
    }
}

/// Element tag and attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    /// Always lowercase
    pub tag: String,
    /// In insertion order; replacing a value keeps its position
    pub attrs: Vec<Attribute>,
}

impl ElementData {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
        }
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.position(name).map(|i| self.attrs[i].value.as_str())
    }

    /// Returns the previous value
    pub fn set_attr(&mut self, name: &str, value: String) -> Option<String> {
        match self.position(name) {
            Some(i) => Some(std::mem::replace(&mut self.attrs[i].value, value)),
            None => {
                self.attrs.push(Attribute { name: name.to_string(), value });
                None
            }
        }
    }

    /// Returns the removed value
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        self.position(name).map(|i| self.attrs.remove(i).value)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.attrs.iter().position(|a| a.name == name)
    }
}

/// Name/value pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}
