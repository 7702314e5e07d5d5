//! Defines the [`Post`] type and the logic for extracting posts from a
//! microblog document.
//!
//! A post is any element with class `post` and an `id`. Its date lives in a
//! child element with class `date`, in the `datetime` attribute of the first
//! `time` element found there. Every other child of the post is carried
//! opaquely as content:
//!
//! ```html
//! <div class="post" id="hello">
//!     <div class="date">
//!         <a href="#hello" class="post-link"><time datetime="2024-01-01T00:00:00Z"><p>jan 1, 2024</p></time></a>
//!     </div>
//!     <p>Hello, world.</p>
//! </div>
//! ```

use crate::html::{attr, walk, ClassifiedNode, Visitor, WalkEvent};
use chrono::{DateTime, FixedOffset};
use kuchikiki::NodeRef;
use tracing::warn;

const POST_CLASS: &str = "post";
const DATE_CLASS: &str = "date";

/// A post extracted from the microblog document. `nodes` are handles into
/// the source tree and describe the post only until the tree is mutated.
#[derive(Debug, Clone)]
pub struct Post {
    /// The post container's `id` attribute.
    pub id: String,

    /// The timestamp parsed from the post's date block.
    pub date_posted: DateTime<FixedOffset>,

    /// The post's content nodes in document order, excluding the date block.
    pub nodes: Vec<NodeRef>,
}

/// The result of an extraction pass.
#[derive(Debug, Default)]
pub struct Extraction {
    /// The posts that had an id and a parsable date, in document order.
    pub posts: Vec<Post>,

    /// The ids of post containers that were dropped.
    pub skipped: Vec<String>,
}

/// The post currently being accumulated.
struct Pending {
    container: NodeRef,
    id: String,
    date: Option<DateTime<FixedOffset>>,
    date_seen: bool,
    nodes: Vec<NodeRef>,
}

/// The extraction automaton. Feed it a document with [`walk`] (it implements
/// [`Visitor`]) and collect the result with [`Extractor::finish`], or use
/// [`extract_posts`] to do both.
#[derive(Default)]
pub struct Extractor {
    current: Option<Pending>,
    in_date_block: bool,
    extraction: Extraction,
}

impl Extractor {
    pub fn new() -> Extractor {
        Extractor::default()
    }

    /// Consumes the extractor and returns what it collected.
    pub fn finish(self) -> Extraction {
        self.extraction
    }

    fn begin(&mut self, node: &ClassifiedNode) {
        self.current = Some(Pending {
            container: node.node.clone(),
            id: node.id.clone(),
            date: None,
            date_seen: false,
            nodes: Vec::new(),
        });
        self.in_date_block = false;
    }

    fn end(&mut self) {
        self.in_date_block = false;
        let pending = match self.current.take() {
            Some(pending) => pending,
            None => return,
        };

        if pending.id.is_empty() {
            warn!("post is missing an id, skipping");
            self.extraction.skipped.push(pending.id);
            return;
        }

        match pending.date {
            Some(date_posted) => self.extraction.posts.push(Post {
                id: pending.id,
                date_posted,
                nodes: pending.nodes,
            }),
            None => {
                warn!(post = %pending.id, "post is missing a date, skipping");
                self.extraction.skipped.push(pending.id);
            }
        }
    }
}

impl Visitor for Extractor {
    fn visit(&mut self, node: &ClassifiedNode, event: WalkEvent) -> bool {
        let container = match &self.current {
            Some(pending) => &pending.container,
            None => {
                if event == WalkEvent::Enter && node.has_class(POST_CLASS) {
                    self.begin(node);
                }
                return true;
            }
        };

        if event == WalkEvent::Exit && node.node == *container {
            self.end();
            return true;
        }

        if node.has_class(DATE_CLASS) {
            self.in_date_block = event == WalkEvent::Enter;
            return true;
        }

        if event != WalkEvent::Enter {
            return true;
        }

        let in_date_block = self.in_date_block;
        let pending = match self.current.as_mut() {
            Some(pending) => pending,
            None => return true,
        };

        if !in_date_block {
            pending.nodes.push(node.node.clone());
            return false;
        }

        if node.is("time") {
            // Only the first `time` decides; its `<p>` is the display caption.
            if !pending.date_seen {
                pending.date_seen = true;
                let datetime = attr(&node.node, "datetime").unwrap_or_default();
                pending.date = DateTime::parse_from_rfc3339(&datetime).ok();
                if pending.date.is_none() {
                    warn!(
                        post = %pending.id,
                        datetime = %datetime,
                        "could not parse post date"
                    );
                }
            }
            return false;
        }

        true
    }
}

/// Extracts every post in `doc`, in document order. Posts without an id or
/// a parsable date are skipped with a warning; they never abort extraction.
pub fn extract_posts(doc: &NodeRef) -> Extraction {
    let mut extractor = Extractor::new();
    walk(doc, &mut extractor);
    extractor.finish()
}
