//! Mutations of the microblog document: inserting a new, empty post at the
//! top of the posts container ([`insert_post`]) and back-filling `time`
//! elements into date blocks that only carry a caption ([`insert_dates`]).
//!
//! Both operations locate their targets with [`walk`] and mutate the tree
//! only after the walk has finished.

use crate::html::{parse_fragment, walk, ClassifiedNode, Result, WalkEvent};
use chrono::{DateTime, Datelike, FixedOffset, SecondsFormat};
use html_escape::encode_double_quoted_attribute as escape_attribute;
use kuchikiki::NodeRef;
use tracing::debug;

/// The `id` of the element new posts are inserted into.
pub const ANCHOR_ID: &str = "posts";

const MONTHS: [&str; 12] = [
    "jan", "feb", "march", "april", "may", "june", "july", "aug", "sept",
    "oct", "nov", "dec",
];

/// Formats `datetime` the way it appears in `datetime` attributes: RFC 3339
/// with whole seconds and `Z` for UTC.
pub fn rfc3339(datetime: &DateTime<FixedOffset>) -> String {
    datetime.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// The human-readable caption shown for a post's date, e.g. `jan 5, 2024`.
pub fn caption(datetime: &DateTime<FixedOffset>) -> String {
    format!(
        "{} {}, {}",
        MONTHS[datetime.month0() as usize],
        datetime.day(),
        datetime.year()
    )
}

/// Returns the markup for a new, empty post. The leading newline and the
/// indentation match the hand-written posts in the container.
pub fn post_markup(id: &str, datetime: &DateTime<FixedOffset>) -> String {
    format!(
        r##"
        <div class="post" id="{id}">
            <div class="date">
                <a href="#{id}" class="post-link"><time datetime="{datetime}"><p>{caption}</p></time></a>
            </div>
            <p></p>
        </div>
"##,
        id = escape_attribute(id),
        datetime = rfc3339(datetime),
        caption = caption(datetime),
    )
}

/// Inserts a new, empty post as the first child of the element whose `id`
/// is [`ANCHOR_ID`]. Returns `false` (and leaves the document untouched) if
/// there is no such element.
pub fn insert_post(
    doc: &NodeRef,
    id: &str,
    datetime: &DateTime<FixedOffset>,
) -> Result<bool> {
    let mut anchor: Option<NodeRef> = None;
    walk(doc, &mut |node: &ClassifiedNode, event: WalkEvent| {
        if anchor.is_some() {
            return false;
        }
        if event == WalkEvent::Enter && node.id == ANCHOR_ID {
            anchor = Some(node.node.clone());
            return false;
        }
        true
    });

    let anchor = match anchor {
        Some(anchor) => anchor,
        None => {
            debug!(anchor = ANCHOR_ID, "no posts container found");
            return Ok(false);
        }
    };

    let fragment = parse_fragment(&anchor, &post_markup(id, datetime))?;
    prepend_all(&anchor, fragment);
    debug!(post = id, "inserted post");
    Ok(true)
}

// Inserts `nodes` before the container's current first child, keeping their
// relative order.
fn prepend_all(container: &NodeRef, nodes: Vec<NodeRef>) {
    let first = container.first_child();
    for node in nodes {
        match &first {
            Some(first) => first.insert_before(node),
            None => container.append(node),
        }
    }
}

/// Wraps every date caption (a `p` inside an element with class `date` that
/// isn't already inside a `time`) in a `time` element whose `datetime` is
/// `datetime`. Returns the number of captions wrapped.
pub fn insert_dates(doc: &NodeRef, datetime: &DateTime<FixedOffset>) -> Result<usize> {
    let mut in_date_block = false;
    let mut captions: Vec<NodeRef> = Vec::new();
    walk(doc, &mut |node: &ClassifiedNode, event: WalkEvent| {
        if node.has_class("date") {
            in_date_block = event == WalkEvent::Enter;
            return true;
        }
        if !in_date_block || event != WalkEvent::Enter {
            return true;
        }
        if node.is("time") {
            return false;
        }
        if node.is("p") {
            captions.push(node.node.clone());
            return false;
        }
        true
    });

    let markup = format!(r#"<time datetime="{}"></time>"#, rfc3339(datetime));
    for caption in &captions {
        let parent = match caption.parent() {
            Some(parent) => parent,
            None => continue,
        };
        let time = parse_fragment(&parent, &markup)?
            .into_iter()
            .find(|node| node.as_element().is_some())
            .ok_or(crate::html::Error::EmptyFragment)?;
        caption.insert_before(time.clone());
        time.append(caption.clone());
    }

    debug!(count = captions.len(), "wrapped date captions");
    Ok(captions.len())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::html::{parse_document, render};
    use crate::post::extract_posts;
    use pretty_assertions::assert_eq;

    const FIXTURE: &str = include_str!("../testdata/microblog.html");

    fn date(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn ids(doc: &NodeRef) -> Vec<String> {
        extract_posts(doc).posts.into_iter().map(|p| p.id).collect()
    }

    fn anchor(doc: &NodeRef) -> NodeRef {
        let mut found = None;
        walk(doc, &mut |n: &ClassifiedNode, e: WalkEvent| {
            if e == WalkEvent::Enter && n.id == ANCHOR_ID {
                found = Some(n.node.clone());
            }
            found.is_none()
        });
        found.unwrap()
    }

    // The post containers directly under the anchor, by id.
    fn containers(doc: &NodeRef) -> Vec<String> {
        anchor(doc)
            .children()
            .filter_map(|c| crate::html::attr(&c, "id"))
            .collect()
    }

    fn rendered_containers(doc: &NodeRef) -> Result<Vec<String>> {
        anchor(doc)
            .children()
            .filter(|c| crate::html::attr(c, "id").is_some())
            .map(|c| render(&c))
            .collect()
    }

    #[test]
    fn test_caption() {
        assert_eq!("jan 5, 2024", caption(&date("2024-01-05T23:00:00Z")));
        assert_eq!("sept 30, 1999", caption(&date("1999-09-30T08:00:00-05:00")));
        assert_eq!("dec 25, 2025", caption(&date("2025-12-25T00:00:00+09:00")));
    }

    #[test]
    fn test_rfc3339() {
        assert_eq!("2024-01-01T00:00:00Z", rfc3339(&date("2024-01-01T00:00:00+00:00")));
        assert_eq!(
            "2025-04-14T12:26:44+01:00",
            rfc3339(&date("2025-04-14T12:26:44.123+01:00"))
        );
    }

    #[test]
    fn test_post_markup() {
        let markup = post_markup("my-post", &date("2024-03-02T10:00:00Z"));
        assert!(markup.starts_with("\n        <div class=\"post\" id=\"my-post\">"));
        assert!(markup.contains(
            r##"<a href="#my-post" class="post-link"><time datetime="2024-03-02T10:00:00Z"><p>march 2, 2024</p></time></a>"##
        ));
        assert!(markup.ends_with("<p></p>\n        </div>\n"));
    }

    #[test]
    fn test_post_markup_escapes_id() {
        let markup = post_markup(r#"a"b"#, &date("2024-03-02T10:00:00Z"));
        assert!(markup.contains(r#"id="a&quot;b""#));
    }

    #[test]
    fn test_insert_post_becomes_first_post() -> Result<()> {
        let doc = parse_document(FIXTURE);
        let when = date("2025-05-01T09:30:00+01:00");
        assert!(insert_post(&doc, "third", &when)?);

        let extraction = extract_posts(&doc);
        assert_eq!(vec!["third", "second", "first"], ids(&doc));
        assert_eq!(when, extraction.posts[0].date_posted);
        assert_eq!(
            vec!["<p></p>"],
            extraction.posts[0]
                .nodes
                .iter()
                .filter(|n| n.as_element().is_some())
                .map(|n| render(n).unwrap())
                .collect::<Vec<String>>()
        );
        Ok(())
    }

    #[test]
    fn test_insert_post_keeps_fragment_order() -> Result<()> {
        let doc = parse_document(r#"<div id="posts"><p id="old"></p></div>"#);
        insert_post(&doc, "new", &date("2024-01-01T00:00:00Z"))?;

        let children: Vec<NodeRef> = anchor(&doc).children().collect();
        assert_eq!(4, children.len());
        assert_eq!("\n        ", render(&children[0])?);
        assert_eq!(Some("new".to_owned()), crate::html::attr(&children[1], "id"));
        assert_eq!("\n", render(&children[2])?);
        assert_eq!(Some("old".to_owned()), crate::html::attr(&children[3], "id"));
        Ok(())
    }

    #[test]
    fn test_insert_post_into_empty_container() -> Result<()> {
        let doc = parse_document(r#"<div id="posts"></div>"#);
        assert!(insert_post(&doc, "only", &date("2024-01-01T00:00:00Z"))?);
        assert_eq!(vec!["only"], ids(&doc));
        Ok(())
    }

    #[test]
    fn test_insert_post_repeatedly() -> Result<()> {
        let doc = parse_document(FIXTURE);
        let before = containers(&doc);
        let markup_before = rendered_containers(&doc)?;
        for (i, id) in ["n1", "n2", "n3"].iter().enumerate() {
            let when = date(&format!("2026-01-0{}T00:00:00Z", i + 1));
            insert_post(&doc, id, &when)?;
        }

        let mut wanted = vec!["n3", "n2", "n1"];
        wanted.extend(before.iter().map(String::as_str));
        assert_eq!(wanted, containers(&doc));

        // Existing posts are untouched.
        assert_eq!(markup_before, rendered_containers(&doc)?[3..].to_vec());
        Ok(())
    }

    #[test]
    fn test_insert_post_without_anchor_is_a_noop() -> Result<()> {
        let doc = parse_document(r#"<div id="other"><p>x</p></div>"#);
        let before = render(&doc)?;
        assert!(!insert_post(&doc, "x", &date("2024-01-01T00:00:00Z"))?);
        assert_eq!(before, render(&doc)?);
        Ok(())
    }

    #[test]
    fn test_insert_post_round_trip() -> Result<()> {
        let doc = parse_document(FIXTURE);
        let original = extract_posts(&doc).posts.len();
        let when = date("2025-06-01T12:00:00-07:00");
        insert_post(&doc, "round-trip", &when)?;

        let reparsed = parse_document(&render(&doc)?);
        let posts = extract_posts(&reparsed).posts;
        assert_eq!(original + 1, posts.len());
        assert_eq!("round-trip", posts[0].id);
        assert_eq!(when, posts[0].date_posted);
        Ok(())
    }

    #[test]
    fn test_insert_dates() -> Result<()> {
        let doc = parse_document(FIXTURE);
        assert_eq!(vec!["second", "first"], ids(&doc));

        let when = date("2025-01-02T03:04:05Z");
        assert_eq!(1, insert_dates(&doc, &when)?);

        let posts = extract_posts(&doc).posts;
        assert_eq!(vec!["second", "undated", "first"], ids(&doc));
        assert_eq!(when, posts[1].date_posted);
        assert_eq!(date("2024-01-01T00:00:00Z"), posts[2].date_posted);

        // Already-dated captions are left alone on a second pass.
        assert_eq!(0, insert_dates(&doc, &when)?);
        Ok(())
    }

    #[test]
    fn test_insert_dates_wraps_caption_in_place() -> Result<()> {
        let doc = parse_document(
            r##"<div class="date"><a href="#x"><p>someday</p></a></div>"##,
        );
        insert_dates(&doc, &date("2024-01-01T00:00:00Z"))?;
        let rendered = render(&doc)?;
        assert!(rendered.contains(
            r##"<a href="#x"><time datetime="2024-01-01T00:00:00Z"><p>someday</p></time></a>"##
        ));
        Ok(())
    }
}
