//! Reads the `yarrienet.conf` configuration file. The format is one
//! `key value` pair per line, separated by the first space:
//!
//! ```text
//! # paths may start with `~`
//! microblog_html_file "~/yarrie.net/microblog/index.html"
//! microblog_rss_file "~/yarrie.net/microblog/feed.xml"
//! rss_base_url "https://yarrie.net/microblog"
//! ```
//!
//! Values are integers, booleans, or double-quoted strings (see
//! [`parse_value`]). Lines starting with `#` are comments.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// The name of the configuration file looked up in the working directory.
pub const DEFAULT_FILE_NAME: &str = "yarrienet.conf";

/// A parsed configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Boolean(bool),
    String(String),
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Value::Integer(_) => "an integer",
            Value::Boolean(_) => "a boolean",
            Value::String(_) => "a string",
        }
    }
}

/// Parses a raw value. An integer is tried first, then a boolean, then a
/// double-quoted string in which `\` escapes the following character.
/// Surrounding whitespace is ignored.
pub fn parse_value(raw: &str) -> std::result::Result<Value, ValueError> {
    let raw = raw.trim();
    if let Ok(i) = raw.parse::<i64>() {
        return Ok(Value::Integer(i));
    }
    if let Some(b) = parse_bool(raw) {
        return Ok(Value::Boolean(b));
    }
    parse_string(raw).map(Value::String)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

fn parse_string(raw: &str) -> std::result::Result<String, ValueError> {
    let mut chars = raw.chars();
    match chars.next() {
        Some('"') => {}
        Some(_) => return Err(ValueError::Unquoted),
        None => return Err(ValueError::Empty),
    }

    let mut value = String::new();
    let mut escaped = false;
    while let Some(c) = chars.next() {
        if escaped {
            value.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '"' {
            return match chars.next() {
                Some(_) => Err(ValueError::TrailingCharacters),
                None => Ok(value),
            };
        } else {
            value.push(c);
        }
    }
    Err(ValueError::Unterminated)
}

/// The settings read from a configuration file. Every setting is optional;
/// command-line flags take precedence over them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    /// The microblog HTML document (`microblog_html_file`).
    pub microblog_html_file: Option<String>,

    /// Where the RSS feed is written (`microblog_rss_file`).
    pub microblog_rss_file: Option<String>,

    pub rss_title: Option<String>,
    pub rss_author: Option<String>,
    pub rss_description: Option<String>,

    /// The public URL of the microblog page (`rss_base_url`).
    pub rss_base_url: Option<String>,
}

impl Config {
    /// Reads a configuration file from disk.
    pub fn from_file(path: &Path) -> Result<Config> {
        Config::from_reader(BufReader::new(File::open(path)?))
    }

    /// Reads a configuration from any buffered reader. Errors carry the
    /// 1-based line number they occurred on.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Config> {
        let mut config = Config::default();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim_end_matches('\r');
            config
                .update_line(line)
                .map_err(|kind| Error::Syntax { line: i + 1, kind })?;
        }
        Ok(config)
    }

    fn update_line(&mut self, line: &str) -> std::result::Result<(), SyntaxError> {
        if line.is_empty() || line.starts_with('#') {
            return Ok(());
        }
        if line.starts_with(' ') {
            return Err(SyntaxError::LeadingSpace);
        }
        match line.find(' ') {
            Some(i) => self.update(&line[..i], &line[i + 1..]),
            None => Err(SyntaxError::MissingValue(line.to_owned())),
        }
    }

    /// Parses `raw` and stores it under `key`. The key must be known and the
    /// value must have the key's type.
    pub fn update(&mut self, key: &str, raw: &str) -> std::result::Result<(), SyntaxError> {
        let value = parse_value(raw).map_err(|err| SyntaxError::Value {
            key: key.to_owned(),
            err,
        })?;

        let slot = match key {
            "microblog_html_file" => &mut self.microblog_html_file,
            "microblog_rss_file" => &mut self.microblog_rss_file,
            "rss_title" => &mut self.rss_title,
            "rss_author" => &mut self.rss_author,
            "rss_description" => &mut self.rss_description,
            "rss_base_url" => &mut self.rss_base_url,
            _ => return Err(SyntaxError::UnknownKey(key.to_owned())),
        };

        match value {
            Value::String(s) => {
                *slot = Some(s);
                Ok(())
            }
            other => Err(SyntaxError::WrongType {
                key: key.to_owned(),
                wanted: "a string",
                found: other.kind(),
            }),
        }
    }
}

type Result<T> = std::result::Result<T, Error>;

/// Represents an error reading a configuration file.
#[derive(Debug)]
pub enum Error {
    /// Returned when the file can't be read.
    Io(io::Error),

    /// Returned when a line is malformed. `line` is 1-based.
    Syntax { line: usize, kind: SyntaxError },
}

/// Describes what is wrong with a malformed configuration line.
#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxError {
    /// The line starts with a space.
    LeadingSpace,

    /// A key is not followed by a value.
    MissingValue(String),

    /// The key isn't a known setting.
    UnknownKey(String),

    /// The value has the wrong type for the key.
    WrongType {
        key: String,
        wanted: &'static str,
        found: &'static str,
    },

    /// The value couldn't be parsed.
    Value { key: String, err: ValueError },
}

/// Describes why a raw value couldn't be parsed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueError {
    Empty,
    Unquoted,
    Unterminated,
    TrailingCharacters,
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ValueError::Empty => write!(f, "missing value"),
            ValueError::Unquoted => {
                write!(f, "strings must be enclosed in double quotes")
            }
            ValueError::Unterminated => write!(f, "unterminated string"),
            ValueError::TrailingCharacters => {
                write!(f, "unexpected characters after string")
            }
        }
    }
}

impl std::error::Error for ValueError {}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SyntaxError::LeadingSpace => {
                write!(f, "line must not start with a space")
            }
            SyntaxError::MissingValue(key) => {
                write!(f, "expected value after key '{}'", key)
            }
            SyntaxError::UnknownKey(key) => {
                write!(f, "'{}' is not a valid key", key)
            }
            SyntaxError::WrongType { key, wanted, found } => {
                write!(f, "'{}' expects {} value, not {}", key, wanted, found)
            }
            SyntaxError::Value { key, err } => {
                write!(f, "invalid value for '{}': {}", key, err)
            }
        }
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(f),
            Error::Syntax { line, kind } => write!(f, "{} (line {})", kind, line),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Syntax { line: _, kind: SyntaxError::Value { key: _, err } } => {
                Some(err)
            }
            Error::Syntax { .. } => None,
        }
    }
}

impl From<io::Error> for Error {
    /// Converts a [`io::Error`] into an [`Error`]. It allows us to use the
    /// `?` operator for reading the file.
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}
