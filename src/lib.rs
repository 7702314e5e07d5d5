//! The library code for the `yarrienet` microblog tools. The microblog is a
//! single hand-written HTML document; there is no database. Everything the
//! tools produce is derived from, or written back into, that document:
//!
//! 1. Walking the document tree ([`crate::html`])
//! 2. Extracting the ordered list of posts from it ([`crate::post`])
//! 3. Inserting new posts and back-filling dates ([`crate::insert`])
//! 4. Building the RSS feed from the extracted posts ([`crate::feed`])
//!
//! Every step shares one traversal primitive, [`html::walk`], which calls a
//! [`html::Visitor`] on entering and exiting each node. Extraction is a small
//! automaton implementing that trait ([`post::Extractor`]); insertion uses
//! the walk only to find its targets and mutates the tree once the walk is
//! done.
//!
//! [`crate::microblog`] wraps these steps with the file I/O used by the
//! command-line tool, and [`crate::config`] reads its configuration file.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod config;
pub mod feed;
pub mod html;
pub mod insert;
pub mod microblog;
pub mod post;
