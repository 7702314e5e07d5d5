//! Thin layer over [`kuchikiki`]'s HTML tree: parsing and serializing
//! documents and fragments, classifying nodes ([`ClassifiedNode`]), and the
//! depth-first [`walk`] that every other module drives its logic from.

use kuchikiki::traits::TendrilSink;
use kuchikiki::NodeRef;
use std::fmt;
use std::io::{self, Read};
use std::string::FromUtf8Error;

/// A lightweight semantic view of a [`NodeRef`] derived when the node is
/// visited. Non-element nodes have an empty `tag`, `id`, and `classes`.
#[derive(Debug, Clone)]
pub struct ClassifiedNode {
    /// The node being classified.
    pub node: NodeRef,

    /// The element's local tag name (e.g., `div`).
    pub tag: String,

    /// The element's `id` attribute.
    pub id: String,

    /// The element's `class` attribute, split on whitespace.
    pub classes: Vec<String>,
}

impl ClassifiedNode {
    /// Classifies `node`. This is a pure function of the node's current
    /// element name and attributes.
    pub fn classify(node: &NodeRef) -> ClassifiedNode {
        let mut classified = ClassifiedNode {
            node: node.clone(),
            tag: String::new(),
            id: String::new(),
            classes: Vec::new(),
        };
        if let Some(element) = node.as_element() {
            classified.tag = element.name.local.to_string();
            let attributes = element.attributes.borrow();
            if let Some(id) = attributes.get("id") {
                classified.id = id.to_owned();
            }
            if let Some(class) = attributes.get("class") {
                classified.classes =
                    class.split_whitespace().map(str::to_owned).collect();
            }
        }
        classified
    }

    /// Returns `true` if the node carries `class` in its class list.
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Returns `true` if the node is an element with the tag name `tag`.
    pub fn is(&self, tag: &str) -> bool {
        self.tag == tag
    }
}

/// Returns the value of the attribute `name` on `node`, or `None` if the node
/// isn't an element or has no such attribute.
pub fn attr(node: &NodeRef, name: &str) -> Option<String> {
    node.as_element()
        .and_then(|element| element.attributes.borrow().get(name).map(str::to_owned))
}

/// Whether a visit is entering a node (before its children) or exiting it
/// (after its children).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkEvent {
    Enter,
    Exit,
}

/// Receives the events of a [`walk`]. The return value is only meaningful
/// for [`WalkEvent::Enter`]: `true` descends into the node's children (and
/// later fires [`WalkEvent::Exit`] for it), `false` skips the subtree and
/// the node's own exit.
pub trait Visitor {
    fn visit(&mut self, node: &ClassifiedNode, event: WalkEvent) -> bool;
}

impl<F> Visitor for F
where
    F: FnMut(&ClassifiedNode, WalkEvent) -> bool,
{
    fn visit(&mut self, node: &ClassifiedNode, event: WalkEvent) -> bool {
        self(node, event)
    }
}

/// Walks the tree rooted at `root` depth-first in pre-order, classifying
/// each node and handing it to `visitor`.
///
/// The next sibling is looked up only after the current node's subtree has
/// been walked, so the visitor may rewire links of nodes other than the one
/// it's visiting. Mutating the visited node's own subtree during its
/// [`WalkEvent::Enter`] is not supported; collect the node and mutate it
/// after the walk instead.
pub fn walk<V: Visitor + ?Sized>(root: &NodeRef, visitor: &mut V) {
    let classified = ClassifiedNode::classify(root);
    if !visitor.visit(&classified, WalkEvent::Enter) {
        return;
    }

    let mut child = root.first_child();
    while let Some(current) = child {
        walk(&current, visitor);
        child = current.next_sibling();
    }

    visitor.visit(&classified, WalkEvent::Exit);
}

/// Parses a full HTML document from a string.
pub fn parse_document(input: &str) -> NodeRef {
    kuchikiki::parse_html().one(input)
}

/// Parses a full HTML document from a byte stream.
pub fn read_document<R: Read>(reader: &mut R) -> Result<NodeRef> {
    Ok(kuchikiki::parse_html().from_utf8().read_from(reader)?)
}

/// Parses `markup` as a fragment in the context of the element `context`
/// (so the same tree-building rules apply as if the markup were written
/// inside it) and returns the fragment's top-level nodes in order. The
/// returned nodes are not attached to any document.
pub fn parse_fragment(context: &NodeRef, markup: &str) -> Result<Vec<NodeRef>> {
    let name = match context.as_element() {
        Some(element) => element.name.clone(),
        None => return Err(Error::NotAnElement),
    };

    // The fragment parser wraps its output in a synthetic `<html>` root.
    let document = kuchikiki::parse_fragment(name, Vec::new()).one(markup);
    let root = document
        .children()
        .find(|child| child.as_element().is_some())
        .ok_or(Error::EmptyFragment)?;
    Ok(root.children().collect())
}

/// Serializes `node` (including the node itself) to markup.
pub fn render(node: &NodeRef) -> Result<String> {
    let mut buf: Vec<u8> = Vec::new();
    node.serialize(&mut buf)?;
    Ok(String::from_utf8(buf)?)
}

/// The result of a fallible HTML operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing or serializing HTML.
#[derive(Debug)]
pub enum Error {
    /// Returned for I/O errors while reading or serializing.
    Io(io::Error),

    /// Returned when serialized markup isn't valid UTF-8.
    Utf8(FromUtf8Error),

    /// Returned when a fragment is parsed in the context of a node that isn't
    /// an element.
    NotAnElement,

    /// Returned when the fragment parser produced no root element.
    EmptyFragment,
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(f),
            Error::Utf8(err) => err.fmt(f),
            Error::NotAnElement => {
                write!(f, "Fragment context must be an element")
            }
            Error::EmptyFragment => {
                write!(f, "Fragment parser produced no root element")
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Utf8(err) => Some(err),
            Error::NotAnElement => None,
            Error::EmptyFragment => None,
        }
    }
}

impl From<io::Error> for Error {
    /// Converts a [`io::Error`] into an [`Error`]. It allows us to use the
    /// `?` operator for reading and serializing.
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<FromUtf8Error> for Error {
    fn from(err: FromUtf8Error) -> Error {
        Error::Utf8(err)
    }
}
