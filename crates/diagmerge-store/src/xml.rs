//! XML element trees for the ocean request file and the field-definition catalog.
//!
//! Nodes live in an arena addressed by [`NodeId`] so that a node's parent is
//! one lookup away. Whitespace, comments and the prolog are kept as nodes and
//! written back verbatim; attribute order is preserved.

use crate::error::{read_file, StoreError, StoreResult};
use diagmerge_types::Attributes;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element {
        name: String,
        attributes: Attributes,
        /// Written as `<name/>` while it has no children.
        empty: bool,
    },
    /// Character data, still escaped as in the source.
    Text(String),
    Comment(String),
    /// Declarations, processing instructions, doctype and CDATA, as written.
    Raw(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct XmlTree {
    origin: String,
    nodes: Vec<Node>,
}

impl XmlTree {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            nodes: vec![Node {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn load(path: &Path) -> StoreResult<Self> {
        let text = read_file(path)?;
        Self::parse(&path.display().to_string(), &text)
    }

    pub fn parse(origin: &str, text: &str) -> StoreResult<Self> {
        let xml_error = |source: quick_xml::Error| StoreError::Xml {
            origin: origin.to_string(),
            source,
        };

        let mut tree = XmlTree::new(origin);
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(false);
        let mut stack = vec![tree.document()];

        loop {
            let parent = *stack.last().unwrap_or(&NodeId(0));
            match reader.read_event().map_err(xml_error)? {
                Event::Start(start) => {
                    let kind = element_kind(&start, false).map_err(xml_error)?;
                    let id = tree.push(parent, kind);
                    stack.push(id);
                }
                Event::Empty(start) => {
                    let kind = element_kind(&start, true).map_err(xml_error)?;
                    tree.push(parent, kind);
                }
                Event::End(_) => {
                    if stack.len() == 1 {
                        return Err(StoreError::Missing {
                            origin: origin.to_string(),
                            what: "matching start tag".to_string(),
                        });
                    }
                    stack.pop();
                }
                Event::Text(text) => {
                    let raw = String::from_utf8_lossy(&text).into_owned();
                    tree.push(parent, NodeKind::Text(raw));
                }
                Event::Comment(text) => {
                    let raw = String::from_utf8_lossy(&text).into_owned();
                    tree.push(parent, NodeKind::Comment(raw));
                }
                Event::CData(data) => {
                    let raw = String::from_utf8_lossy(&data).into_owned();
                    tree.push(parent, NodeKind::Raw(format!("<![CDATA[{}]]>", raw)));
                }
                Event::Decl(decl) => {
                    let raw = String::from_utf8_lossy(&decl).into_owned();
                    tree.push(parent, NodeKind::Raw(format!("<?{}?>", raw)));
                }
                Event::PI(pi) => {
                    let raw = String::from_utf8_lossy(&pi).into_owned();
                    tree.push(parent, NodeKind::Raw(format!("<?{}?>", raw)));
                }
                Event::DocType(doctype) => {
                    let raw = String::from_utf8_lossy(&doctype).into_owned();
                    tree.push(parent, NodeKind::Raw(format!("<!DOCTYPE {}>", raw)));
                }
                Event::Eof => break,
            }
        }

        if stack.len() != 1 {
            return Err(StoreError::Missing {
                origin: origin.to_string(),
                what: "closing tag for every element".to_string(),
            });
        }
        Ok(tree)
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn document(&self) -> NodeId {
        NodeId(0)
    }

    fn push(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        if let NodeKind::Element { empty, .. } = &mut self.nodes[parent.0].kind {
            *empty = false;
        }
        id
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn attributes(&self, id: NodeId) -> Option<&Attributes> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { attributes, .. } => Some(attributes),
            _ => None,
        }
    }

    pub fn attr(&self, id: NodeId, key: &str) -> Option<&str> {
        self.attributes(id).and_then(|attrs| attrs.get(key))
    }

    pub fn set_attr(&mut self, id: NodeId, key: &str, value: &str) {
        if let NodeKind::Element { attributes, .. } = &mut self.nodes[id.0].kind {
            attributes.insert(key, value);
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, key: &str) -> Option<String> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element { attributes, .. } => attributes.remove(key),
            _ => None,
        }
    }

    /// Element descendants of `id` in document order, `id` excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            if self.name(next).is_some() {
                out.push(next);
            }
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Elements below `id` named `tag`, optionally with `key == value`.
    pub fn find_all(&self, id: NodeId, tag: &str, filter: Option<(&str, &str)>) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&n| self.name(n) == Some(tag))
            .filter(|&n| match filter {
                Some((key, value)) => self.attr(n, key) == Some(value),
                None => true,
            })
            .collect()
    }

    pub fn find_first(&self, id: NodeId, tag: &str, filter: Option<(&str, &str)>) -> Option<NodeId> {
        self.find_all(id, tag, filter).into_iter().next()
    }

    /// Comment texts anywhere in the tree, in document order.
    pub fn comments(&self) -> Vec<&str> {
        let mut out = Vec::new();
        let mut stack = vec![self.document()];
        while let Some(next) = stack.pop() {
            if let NodeKind::Comment(text) = &self.nodes[next.0].kind {
                out.push(text.as_str());
            }
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    pub fn append_element(&mut self, parent: NodeId, name: &str, attributes: Attributes) -> NodeId {
        self.push(
            parent,
            NodeKind::Element {
                name: name.to_string(),
                attributes,
                empty: true,
            },
        )
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.push(parent, NodeKind::Text(text.to_string()))
    }

    /// Copies the subtree at `node` of `source` under `parent`.
    pub fn graft(&mut self, parent: NodeId, source: &XmlTree, node: NodeId) -> NodeId {
        let copy = self.push(parent, source.kind(node).clone());
        if let NodeKind::Element { empty, .. } = &mut self.nodes[copy.0].kind {
            *empty = true;
        }
        for &child in source.children(node) {
            self.graft(copy, source, child);
        }
        copy
    }

    /// Copies `node` under `parent` within this tree.
    pub fn duplicate(&mut self, parent: NodeId, node: NodeId) -> NodeId {
        let snapshot = self.clone();
        self.graft(parent, &snapshot, node)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for &child in self.children(self.document()) {
            self.render_node(child, &mut out);
        }
        out
    }

    fn render_node(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id.0].kind {
            NodeKind::Document => {}
            NodeKind::Element {
                name,
                attributes,
                empty,
            } => {
                out.push('<');
                out.push_str(name);
                for (key, value) in attributes.iter() {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    out.push_str(&quick_xml::escape::escape(value));
                    out.push('"');
                }
                let children = self.children(id);
                if *empty && children.is_empty() {
                    out.push_str("/>");
                    return;
                }
                out.push('>');
                for &child in children {
                    self.render_node(child, out);
                }
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeKind::Raw(text) => out.push_str(text),
        }
    }

    pub fn save(&self, path: &Path) -> StoreResult<()> {
        std::fs::write(path, self.render()).map_err(|e| StoreError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

fn element_kind(start: &BytesStart<'_>, empty: bool) -> Result<NodeKind, quick_xml::Error> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Attributes::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attributes.insert(key, value);
    }
    Ok(NodeKind::Element {
        name,
        attributes,
        empty,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<context id="nemo">
  <file_definition type="one_file" sync_freq="1mo">
    <file_group id="1m" output_freq="1mo">
      <file id="file1" name_suffix="_grid_T">
        <field field_ref="toce" name="thetao"/>
        <!-- <field field_ref="soce" name="so"/> -->
      </file>
    </file_group>
  </file_definition>
</context>
"#;

    #[test]
    fn test_find_and_parent() {
        let tree = XmlTree::parse("iodef.xml", SAMPLE).unwrap();
        let field = tree
            .find_first(tree.document(), "field", Some(("name", "thetao")))
            .unwrap();
        let file = tree.parent(field).unwrap();
        assert_eq!(tree.attr(file, "name_suffix"), Some("_grid_T"));
        assert_eq!(tree.find_all(tree.document(), "file", None).len(), 1);
    }

    #[test]
    fn test_comments_are_kept() {
        let tree = XmlTree::parse("iodef.xml", SAMPLE).unwrap();
        let comments = tree.comments();
        assert_eq!(comments.len(), 1);
        assert!(comments[0].contains("name=\"so\""));
    }

    #[test]
    fn test_unmodified_tree_round_trips() {
        let tree = XmlTree::parse("iodef.xml", SAMPLE).unwrap();
        assert_eq!(tree.render(), SAMPLE);
    }

    #[test]
    fn test_append_and_duplicate() {
        let mut tree = XmlTree::parse("iodef.xml", SAMPLE).unwrap();
        let group = tree
            .find_first(tree.document(), "file_group", None)
            .unwrap();
        let attrs: Attributes = [("id", "file2"), ("name_suffix", "_grid_T")]
            .into_iter()
            .collect();
        let file = tree.append_element(group, "file", attrs);
        let field = tree
            .find_first(tree.document(), "field", Some(("name", "thetao")))
            .unwrap();
        let copy = tree.duplicate(file, field);
        assert_eq!(tree.parent(copy), Some(file));
        assert_eq!(
            tree.find_all(tree.document(), "field", Some(("name", "thetao")))
                .len(),
            2
        );
        assert!(tree
            .render()
            .contains(r#"<file id="file2" name_suffix="_grid_T"><field field_ref="toce" name="thetao"/></file>"#));
    }

    #[test]
    fn test_attribute_values_are_escaped() {
        let mut tree = XmlTree::parse("x.xml", "<a/>").unwrap();
        let a = tree.find_first(tree.document(), "a", None).unwrap();
        tree.set_attr(a, "expr", "x < 1 & y");
        assert_eq!(tree.render(), r#"<a expr="x &lt; 1 &amp; y"/>"#);
    }

    #[test]
    fn test_unbalanced_tags_are_an_error() {
        assert!(XmlTree::parse("x.xml", "<a><b></a>").is_err());
    }
}
