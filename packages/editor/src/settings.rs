//! # Block Settings
//!
//! Renderer-defined configuration attached to every block, modelled as a
//! recursive value type so field paths and style filtering stay checkable.
//!
//! ## Field paths
//!
//! Inline edits address a value with dot-separated keys and `[n]` indices:
//!
//! ```text
//! settings.items[0].title
//! └──────┘ └───┘└─┘ └───┘
//!   root    key  idx  key
//! ```
//!
//! Writing through a path creates missing maps/lists on demand.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Open key → value settings map of a block.
pub type Settings = BTreeMap<String, SettingValue>;

/// A single settings value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<SettingValue>),
    Map(Settings),
}

impl SettingValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SettingValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Append every scalar leaf to `out`, space separated.
    ///
    /// Used by layer search to match against free text in settings.
    pub fn collect_text(&self, out: &mut String) {
        match self {
            SettingValue::Null => {}
            SettingValue::Bool(_) => {}
            SettingValue::Number(n) => push_word(out, &n.to_string()),
            SettingValue::Text(s) => push_word(out, s),
            SettingValue::List(items) => {
                for item in items {
                    item.collect_text(out);
                }
            }
            SettingValue::Map(map) => {
                for value in map.values() {
                    value.collect_text(out);
                }
            }
        }
    }
}

fn push_word(out: &mut String, word: &str) {
    if word.is_empty() {
        return;
    }
    if !out.is_empty() {
        out.push(' ');
    }
    out.push_str(word);
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::Text(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        SettingValue::Text(value)
    }
}

impl From<f64> for SettingValue {
    fn from(value: f64) -> Self {
        SettingValue::Number(value)
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        SettingValue::Number(value as f64)
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        SettingValue::Bool(value)
    }
}

/// Flatten all scalar values of a settings map into one searchable string
pub fn settings_text(settings: &Settings) -> String {
    let mut out = String::new();
    for value in settings.values() {
        value.collect_text(&mut out);
    }
    out
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldPathError {
    #[error("empty field path")]
    Empty,

    #[error("empty segment at byte {0}")]
    EmptySegment(usize),

    #[error("invalid index `{0}`")]
    InvalidIndex(String),

    #[error("unterminated index bracket")]
    UnterminatedIndex,

    #[error("path must start with a key, found index")]
    LeadingIndex,

    #[error("expected `.` or `[` after index at byte {0}")]
    MissingSeparator(usize),
}

/// One step of a field path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Parsed field path such as `settings.items[0].title`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    pub fn parse(path: &str) -> Result<Self, FieldPathError> {
        if path.is_empty() {
            return Err(FieldPathError::Empty);
        }

        let mut segments = Vec::new();
        let bytes = path.as_bytes();
        let mut i = 0;
        let mut key_start = 0;

        while i <= bytes.len() {
            let at_end = i == bytes.len();
            let c = if at_end { b'.' } else { bytes[i] };

            match c {
                b'.' | b'[' => {
                    if i > key_start {
                        segments.push(PathSegment::Key(path[key_start..i].to_string()));
                    } else if c == b'.' && !matches!(segments.last(), Some(PathSegment::Index(_))) {
                        return Err(FieldPathError::EmptySegment(i));
                    } else if c == b'[' && segments.is_empty() {
                        return Err(FieldPathError::LeadingIndex);
                    } else if c == b'[' && bytes[i - 1] == b'.' {
                        return Err(FieldPathError::EmptySegment(i));
                    }

                    if c == b'[' {
                        let close = path[i..]
                            .find(']')
                            .map(|offset| i + offset)
                            .ok_or(FieldPathError::UnterminatedIndex)?;
                        let raw = &path[i + 1..close];
                        let index = raw
                            .parse::<usize>()
                            .map_err(|_| FieldPathError::InvalidIndex(raw.to_string()))?;
                        segments.push(PathSegment::Index(index));
                        i = close + 1;
                        // `[0].title` continues after the dot, `[0][1]` after the bracket
                        match bytes.get(i) {
                            Some(b'.') => {
                                i += 1;
                                if i == bytes.len() {
                                    return Err(FieldPathError::EmptySegment(i));
                                }
                            }
                            Some(b'[') | None => {}
                            Some(_) => return Err(FieldPathError::MissingSeparator(i)),
                        }
                        key_start = i;
                        continue;
                    }

                    key_start = i + 1;
                }
                _ => {}
            }
            i += 1;
        }

        if segments.is_empty() {
            return Err(FieldPathError::Empty);
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// First key of the path (`settings`, `variant`, ...)
    pub fn root(&self) -> Option<&str> {
        match self.segments.first() {
            Some(PathSegment::Key(k)) => Some(k),
            _ => None,
        }
    }

    /// Segments after the root
    pub fn rest(&self) -> &[PathSegment] {
        self.segments.get(1..).unwrap_or(&[])
    }
}

impl FromStr for FieldPath {
    type Err = FieldPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldPath::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Key(k) if i == 0 => write!(f, "{}", k)?,
                PathSegment::Key(k) => write!(f, ".{}", k)?,
                PathSegment::Index(n) => write!(f, "[{}]", n)?,
            }
        }
        Ok(())
    }
}

/// Resolve a path inside a settings map
pub fn get_path<'a>(settings: &'a Settings, path: &[PathSegment]) -> Option<&'a SettingValue> {
    let (first, rest) = path.split_first()?;
    let PathSegment::Key(key) = first else {
        return None;
    };
    let mut current = settings.get(key)?;

    for segment in rest {
        current = match (segment, current) {
            (PathSegment::Key(k), SettingValue::Map(map)) => map.get(k)?,
            (PathSegment::Index(n), SettingValue::List(items)) => items.get(*n)?,
            _ => return None,
        };
    }
    Some(current)
}

/// How far past the end of a list a write may pad with nulls.
pub const MAX_LIST_PADDING: usize = 64;

/// Write a value at `path`, creating intermediate containers on demand.
///
/// A missing (or scalar) intermediate becomes a map when the next segment is
/// a key and a list when it is an index. Lists are padded with nulls, at most
/// [`MAX_LIST_PADDING`] slots past their end. A rejected write leaves
/// `settings` untouched.
pub fn set_path(settings: &mut Settings, path: &[PathSegment], value: SettingValue) -> bool {
    let Some((PathSegment::Key(key), rest)) = path.split_first() else {
        return false;
    };

    if rest.is_empty() {
        settings.insert(key.clone(), value);
        return true;
    }

    let mut slot = settings
        .get(key)
        .cloned()
        .unwrap_or_else(|| empty_container_for(&rest[0]));
    if !set_in_value(&mut slot, rest, value) {
        return false;
    }
    settings.insert(key.clone(), slot);
    true
}

fn set_in_value(slot: &mut SettingValue, path: &[PathSegment], value: SettingValue) -> bool {
    let Some((segment, rest)) = path.split_first() else {
        *slot = value;
        return true;
    };

    match segment {
        PathSegment::Key(k) => {
            if !matches!(slot, SettingValue::Map(_)) {
                *slot = SettingValue::Map(Settings::new());
            }
            let SettingValue::Map(map) = slot else {
                return false;
            };
            let child = map.entry(k.clone()).or_insert_with(|| match rest.first() {
                Some(next) => empty_container_for(next),
                None => SettingValue::Null,
            });
            set_in_value(child, rest, value)
        }
        PathSegment::Index(n) => {
            if !matches!(slot, SettingValue::List(_)) {
                *slot = SettingValue::List(Vec::new());
            }
            let SettingValue::List(items) = slot else {
                return false;
            };
            let n = *n;
            if n.saturating_sub(items.len()) > MAX_LIST_PADDING {
                return false;
            }
            if items.len() <= n {
                items.resize(n + 1, SettingValue::Null);
            }
            if let (Some(next), SettingValue::Null) = (rest.first(), &items[n]) {
                items[n] = empty_container_for(next);
            }
            set_in_value(&mut items[n], rest, value)
        }
    }
}

fn empty_container_for(segment: &PathSegment) -> SettingValue {
    match segment {
        PathSegment::Key(_) => SettingValue::Map(Settings::new()),
        PathSegment::Index(_) => SettingValue::List(Vec::new()),
    }
}
