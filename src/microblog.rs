//! Exports the operations behind the `microblog` commands. Each one reads
//! the whole microblog document, does its work on the in-memory tree
//! ([`crate::post`], [`crate::insert`], [`crate::feed`]), and only then
//! writes its output, so a failure never leaves a partially written file.
//!
//! An output of `None` means standard output.

use crate::feed::{build_feed, Error as FeedError, RssMetadata};
use crate::html::{read_document, render, Error as HtmlError};
use crate::insert::{insert_dates, insert_post};
use crate::post::{extract_posts, Post};
use chrono::{DateTime, FixedOffset};
use kuchikiki::NodeRef;
use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Inserts a new, empty post with `id` and `datetime` at the top of the
/// microblog in `source` and writes the document to `output`. Returns
/// `false` if the document has no posts container, in which case the
/// document is written back unchanged.
pub fn new_post(
    source: &Path,
    output: Option<&Path>,
    id: &str,
    datetime: &DateTime<FixedOffset>,
) -> Result<bool> {
    let doc = read(source)?;
    let inserted = insert_post(&doc, id, datetime)?;
    if !inserted {
        warn!(path = %source.display(), "no posts container found, nothing inserted");
    }
    write(output, render(&doc)?.as_bytes())?;
    Ok(inserted)
}

/// Wraps undated date captions in `source` with `time` elements for
/// `datetime` and writes the document to `output`. Returns the number of
/// captions wrapped.
pub fn back_fill_dates(
    source: &Path,
    output: Option<&Path>,
    datetime: &DateTime<FixedOffset>,
) -> Result<usize> {
    let doc = read(source)?;
    let count = insert_dates(&doc, datetime)?;
    write(output, render(&doc)?.as_bytes())?;
    Ok(count)
}

/// Builds the RSS feed for the microblog in `source` and writes it to
/// `output`. Returns the number of feed items.
pub fn generate_rss(
    source: &Path,
    output: Option<&Path>,
    metadata: &RssMetadata,
) -> Result<usize> {
    let doc = read(source)?;
    let posts = extract_posts(&doc).posts;
    let feed = build_feed(&posts, metadata)?;
    let xml = feed.write_to(Vec::new())?;
    write(output, &xml)?;
    Ok(feed.items.len())
}

/// Returns the posts of the microblog in `source`, in document order.
pub fn list_posts(source: &Path) -> Result<Vec<Post>> {
    Ok(extract_posts(&read(source)?).posts)
}

fn read(path: &Path) -> Result<NodeRef> {
    debug!(path = %path.display(), "reading microblog");
    let mut file = File::open(path).map_err(|err| Error::Open {
        path: path.to_owned(),
        err,
    })?;
    Ok(read_document(&mut file)?)
}

fn write(output: Option<&Path>, contents: &[u8]) -> Result<()> {
    match output {
        Some(path) => {
            debug!(path = %path.display(), "writing output");
            std::fs::write(path, contents).map_err(|err| Error::Write {
                path: path.to_owned(),
                err,
            })
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(contents)?;
            handle.flush()?;
            Ok(())
        }
    }
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for the microblog operations.
#[derive(Debug)]
pub enum Error {
    /// Returned when the microblog document can't be opened.
    Open { path: PathBuf, err: io::Error },

    /// Returned when an output file can't be written.
    Write { path: PathBuf, err: io::Error },

    /// Returned for errors parsing or serializing HTML.
    Html(HtmlError),

    /// Returned for errors building or writing the feed.
    Feed(FeedError),

    /// Returned for other I/O errors.
    Io(io::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Open { path, err } => {
                write!(f, "Opening microblog file '{}': {}", path.display(), err)
            }
            Error::Write { path, err } => {
                write!(f, "Writing '{}': {}", path.display(), err)
            }
            Error::Html(err) => err.fmt(f),
            Error::Feed(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Open { path: _, err } => Some(err),
            Error::Write { path: _, err } => Some(err),
            Error::Html(err) => Some(err),
            Error::Feed(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<HtmlError> for Error {
    /// Converts [`HtmlError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: HtmlError) -> Error {
        Error::Html(err)
    }
}

impl From<FeedError> for Error {
    /// Converts [`FeedError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: FeedError) -> Error {
        Error::Feed(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::insert::rfc3339;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const FIXTURE: &str = include_str!("../testdata/microblog.html");

    fn fixture() -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.html");
        std::fs::write(&path, FIXTURE).unwrap();
        (dir, path)
    }

    fn summary(posts: &[Post]) -> Vec<(String, String)> {
        posts
            .iter()
            .map(|p| (p.id.clone(), rfc3339(&p.date_posted)))
            .collect()
    }

    #[test]
    fn test_list_posts() -> Result<()> {
        let (_dir, path) = fixture();
        assert_eq!(
            vec![
                ("second".to_owned(), "2025-04-14T12:26:44+01:00".to_owned()),
                ("first".to_owned(), "2024-01-01T00:00:00Z".to_owned()),
            ],
            summary(&list_posts(&path)?)
        );
        Ok(())
    }

    #[test]
    fn test_new_post_in_place() -> Result<()> {
        let (_dir, path) = fixture();
        let when = DateTime::parse_from_rfc3339("2025-05-01T08:00:00+01:00").unwrap();
        assert!(new_post(&path, Some(&path), "third", &when)?);

        let posts = list_posts(&path)?;
        assert_eq!(3, posts.len());
        assert_eq!(
            ("third".to_owned(), "2025-05-01T08:00:00+01:00".to_owned()),
            summary(&posts)[0]
        );

        let contents = std::fs::read_to_string(&path)?;
        assert!(contents.contains("<p>may 1, 2025</p>"));
        assert!(contents.starts_with("<!DOCTYPE html>"));
        Ok(())
    }

    #[test]
    fn test_new_post_to_separate_output() -> Result<()> {
        let (dir, path) = fixture();
        let output = dir.path().join("out.html");
        let when = DateTime::parse_from_rfc3339("2025-05-01T08:00:00Z").unwrap();
        new_post(&path, Some(&output), "third", &when)?;

        assert_eq!(FIXTURE, std::fs::read_to_string(&path)?);
        assert_eq!(3, list_posts(&output)?.len());
        Ok(())
    }

    #[test]
    fn test_back_fill_dates() -> Result<()> {
        let (_dir, path) = fixture();
        let when = DateTime::parse_from_rfc3339("2024-06-01T00:00:00Z").unwrap();
        assert_eq!(1, back_fill_dates(&path, Some(&path), &when)?);
        let ids: Vec<String> = list_posts(&path)?.into_iter().map(|p| p.id).collect();
        assert_eq!(vec!["second", "undated", "first"], ids);
        Ok(())
    }

    #[test]
    fn test_generate_rss() -> Result<()> {
        let (dir, path) = fixture();
        let output = dir.path().join("feed.xml");
        let metadata = RssMetadata {
            title: "yarrie".to_owned(),
            author: "yarrie".to_owned(),
            description: "yarrie's microblog".to_owned(),
            base_url: "http://yarrie.net/microblog".to_owned(),
        };
        assert_eq!(2, generate_rss(&path, Some(&output), &metadata)?);

        let channel = rss::Channel::read_from(&std::fs::read(&output)?[..]).unwrap();
        let links: Vec<&str> = channel.items().iter().filter_map(|i| i.link()).collect();
        assert_eq!(
            vec![
                "http://yarrie.net/microblog#second",
                "http://yarrie.net/microblog#first",
            ],
            links
        );
        assert_eq!(
            Some("&lt;p&gt;hello&lt;/p&gt;"),
            channel.items()[1].description()
        );
        Ok(())
    }

    #[test]
    fn test_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        match list_posts(&dir.path().join("missing.html")) {
            Err(Error::Open { path, err }) => {
                assert!(path.ends_with("missing.html"));
                assert_eq!(io::ErrorKind::NotFound, err.kind());
            }
            other => panic!("wanted an Open error; found {:?}", other),
        }
    }
}
