//! Support for creating RSS feeds from a list of posts.

use crate::html::{render, Error as HtmlError};
use crate::post::Post;
use chrono::{DateTime, FixedOffset};
use rss::{Channel, ChannelBuilder, GuidBuilder, ItemBuilder};
use std::collections::HashSet;
use std::fmt;
use std::io::Write;
use tracing::warn;

/// The `pubDate` format, e.g. `Mon, 02 Jan 2006 15:04:05 -0700`.
const PUB_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// Bundled metadata for creating a feed.
#[derive(Debug, Clone, Default)]
pub struct RssMetadata {
    pub title: String,
    pub author: String,
    pub description: String,

    /// The URL of the microblog page. Item links are `{base_url}#{post_id}`.
    pub base_url: String,
}

/// An in-memory RSS feed. Convert it with [`Feed::to_channel`] or write it
/// with [`Feed::write_to`].
#[derive(Debug, Clone, PartialEq)]
pub struct Feed {
    pub title: String,
    pub link: String,
    pub description: String,
    pub items: Vec<Item>,
}

/// A feed item derived from a single [`Post`].
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: String,
    pub author: String,
    pub link: String,

    /// The post's markup, HTML-escaped (quotes included).
    pub description: String,
    pub pub_date: DateTime<FixedOffset>,
}

/// Creates a feed from some [`RssMetadata`] and a list of [`Post`]s. Items
/// keep the order of `posts`. Any post that fails to render fails the whole
/// feed.
pub fn build_feed(posts: &[Post], metadata: &RssMetadata) -> Result<Feed> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut items: Vec<Item> = Vec::with_capacity(posts.len());

    for post in posts {
        let item = post_to_item(post, metadata)?;
        if !seen.insert(item.id.clone()) {
            warn!(id = %item.id, "duplicate post id, feed items will collide");
        }
        items.push(item);
    }

    Ok(Feed {
        title: metadata.title.clone(),
        link: metadata.base_url.clone(),
        description: metadata.description.clone(),
        items,
    })
}

fn post_to_item(post: &Post, metadata: &RssMetadata) -> Result<Item> {
    let mut markup = String::new();
    for node in post.nodes.iter().filter(|n| n.as_element().is_some()) {
        let rendered = render(node).map_err(|err| Error::Render {
            post: post.id.clone(),
            err,
        })?;
        markup.push_str(&rendered);
    }

    let link = format!("{}#{}", metadata.base_url, post.id);
    Ok(Item {
        id: link.clone(),
        author: metadata.author.clone(),
        link,
        description: html_escape::encode_quoted_attribute(&markup).into_owned(),
        pub_date: post.date_posted,
    })
}

impl Feed {
    /// Converts the feed into an RSS 2.0 [`Channel`].
    pub fn to_channel(&self) -> Channel {
        let items: Vec<rss::Item> = self
            .items
            .iter()
            .map(|item| {
                ItemBuilder::default()
                    .guid(Some(
                        GuidBuilder::default()
                            .permalink(true)
                            .value(item.id.clone())
                            .build(),
                    ))
                    .author(Some(item.author.clone()))
                    .link(Some(item.link.clone()))
                    .description(Some(item.description.clone()))
                    .pub_date(Some(item.pub_date.format(PUB_DATE_FORMAT).to_string()))
                    .build()
            })
            .collect();

        ChannelBuilder::default()
            .title(self.title.clone())
            .link(self.link.clone())
            .description(self.description.clone())
            .items(items)
            .build()
    }

    /// Writes the feed as RSS 2.0 XML to a [`std::io::Write`].
    pub fn write_to<W: Write>(&self, w: W) -> Result<W> {
        Ok(self.to_channel().write_to(w)?)
    }
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem creating a feed.
#[derive(Debug)]
pub enum Error {
    /// Returned when a post's content can't be serialized.
    Render { post: String, err: HtmlError },

    /// Returned when the RSS channel can't be written.
    Rss(rss::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Render { post, err } => {
                write!(f, "Rendering post '{}': {}", post, err)
            }
            Error::Rss(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Render { post: _, err } => Some(err),
            Error::Rss(err) => Some(err),
        }
    }
}

impl From<rss::Error> for Error {
    /// Converts [`rss::Error`]s into [`Error`]. This allows us to use the `?`
    /// operator when writing the channel.
    fn from(err: rss::Error) -> Error {
        Error::Rss(err)
    }
}
