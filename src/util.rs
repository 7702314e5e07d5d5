use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Local, SubsecRound};
use std::path::PathBuf;

/// Expands a leading `~` in a path taken from the command line or the
/// configuration file.
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

/// Parses an RFC 3339 `--date` value, defaulting to the current local time
/// truncated to whole seconds.
pub fn datetime(raw: Option<&str>) -> Result<DateTime<FixedOffset>> {
    match raw {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .with_context(|| format!("Parsing date `{}` (expected RFC 3339)", raw)),
        None => Ok(DateTime::<FixedOffset>::from(Local::now()).trunc_subsecs(0)),
    }
}

/// The id given to a new post when none is passed with `--id`.
pub fn default_post_id(datetime: &DateTime<FixedOffset>) -> String {
    datetime.format("%Y%m%d%H%M%S").to_string()
}
