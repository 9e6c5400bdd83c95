//! The flatmap key grammar.
//!
//! A flat key is a dot-joined path of field names, decimal list indices,
//! set element tokens and map keys. Two segments are reserved: `#` holds the
//! element count of a list or set and `%` holds the entry count of a map.
//!
//! ```
//! use tfplugin_schema::flatmap::{FlatKey, Segment};
//!
//! let key = FlatKey::parse("ingress.0.cidr_blocks.#");
//! assert_eq!(key.to_string(), "ingress.0.cidr_blocks.#");
//! assert_eq!(Segment::classify(&key.segments()[1]), Segment::Index(0));
//! assert!(key.is_count());
//! ```

use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A flat attribute map keyed by flat keys.
pub type FlatMap = BTreeMap<String, Value>;

/// Segment holding the number of elements in a list or set.
pub const LIST_COUNT: &str = "#";

/// Segment holding the number of entries in a map.
pub const MAP_COUNT: &str = "%";

/// Classification of a single key segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    /// `#`
    ListCount,
    /// `%`
    MapCount,
    /// A decimal index.
    Index(usize),
    /// Anything else: a field name, map key or set element token.
    Token(&'a str),
}

impl<'a> Segment<'a> {
    /// Classify one segment.
    pub fn classify(segment: &'a str) -> Self {
        match segment {
            LIST_COUNT => Segment::ListCount,
            MAP_COUNT => Segment::MapCount,
            _ if is_decimal(segment) => match segment.parse() {
                Ok(index) => Segment::Index(index),
                Err(_) => Segment::Token(segment),
            },
            _ => Segment::Token(segment),
        }
    }

    /// Whether this is either count marker.
    pub fn is_count(&self) -> bool {
        matches!(self, Segment::ListCount | Segment::MapCount)
    }
}

/// Whether `segment` is a non-empty run of ASCII digits.
pub fn is_decimal(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

/// A parsed flat key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FlatKey {
    segments: Vec<String>,
}

impl FlatKey {
    /// The empty key addressing the root object.
    pub fn root() -> Self {
        Self::default()
    }

    /// Split a dotted key into segments. The empty string is the root.
    pub fn parse(key: &str) -> Self {
        if key.is_empty() {
            return Self::root();
        }
        Self {
            segments: key.split('.').map(str::to_string).collect(),
        }
    }

    /// Build a key from already split segments.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// The segments of this key.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Consume the key, returning its segments.
    pub fn into_segments(self) -> Vec<String> {
        self.segments
    }

    /// Whether this is the root key.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether the last segment is `#` or `%`.
    pub fn is_count(&self) -> bool {
        self.segments
            .last()
            .map(|s| Segment::classify(s).is_count())
            .unwrap_or(false)
    }

    /// This key extended by one segment.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// The `#` key of this list or set.
    pub fn list_count(&self) -> Self {
        self.child(LIST_COUNT)
    }

    /// The `%` key of this map.
    pub fn map_count(&self) -> Self {
        self.child(MAP_COUNT)
    }

    /// The string every descendant key starts with, i.e. `"a.b."`.
    pub fn prefix(&self) -> String {
        if self.is_root() {
            return String::new();
        }
        let mut prefix = self.to_string();
        prefix.push('.');
        prefix
    }
}

impl fmt::Display for FlatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl From<&str> for FlatKey {
    fn from(key: &str) -> Self {
        Self::parse(key)
    }
}

/// Dot-join a path into a flat key string.
pub fn join<S: AsRef<str>>(path: &[S]) -> String {
    path.iter()
        .map(|s| s.as_ref())
        .collect::<Vec<&str>>()
        .join(".")
}

/// Build an owned path from string-like segments.
pub fn path<I, S>(segments: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    segments.into_iter().map(Into::into).collect()
}

/// `path` extended by one segment.
pub fn child_path(path: &[String], segment: impl Into<String>) -> Vec<String> {
    let mut child = path.to_vec();
    child.push(segment.into());
    child
}

/// The first segment of a key remainder: everything up to the next dot.
pub fn first_segment(rest: &str) -> &str {
    rest.split('.').next().unwrap_or(rest)
}

/// Remove `key` itself and every key below it.
pub fn clear_subtree(data: &mut FlatMap, key: &str) {
    data.remove(key);
    let prefix = format!("{}.", key);
    data.retain(|k, _| !k.starts_with(&prefix));
}

/// Distinct first segments below `prefix`, in key order.
///
/// `skip` filters out whole keys before their segment is taken.
pub fn child_tokens<'a, V, F>(data: &'a BTreeMap<String, V>, prefix: &str, mut skip: F) -> Vec<String>
where
    F: FnMut(&'a str, &'a V) -> bool,
{
    let mut tokens: Vec<String> = Vec::new();
    for (key, value) in data.range(prefix.to_string()..) {
        let Some(rest) = key.strip_prefix(prefix) else {
            break;
        };
        if rest.is_empty() || skip(key.as_str(), value) {
            continue;
        }
        let token = first_segment(rest);
        if !tokens.iter().any(|t| t == token) {
            tokens.push(token.to_string());
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_segments() {
        assert_eq!(Segment::classify("#"), Segment::ListCount);
        assert_eq!(Segment::classify("%"), Segment::MapCount);
        assert_eq!(Segment::classify("12"), Segment::Index(12));
        assert_eq!(Segment::classify("-1"), Segment::Token("-1"));
        assert_eq!(Segment::classify("~123"), Segment::Token("~123"));
        assert_eq!(Segment::classify("name"), Segment::Token("name"));
        assert_eq!(Segment::classify(""), Segment::Token(""));
    }

    #[test]
    fn test_parse_and_display() {
        let key = FlatKey::parse("a.b.0");
        assert_eq!(key.segments(), &["a", "b", "0"]);
        assert_eq!(key.to_string(), "a.b.0");
        assert!(FlatKey::parse("").is_root());
    }

    #[test]
    fn test_count_keys() {
        let key = FlatKey::parse("tags");
        assert_eq!(key.list_count().to_string(), "tags.#");
        assert_eq!(key.map_count().to_string(), "tags.%");
        assert!(key.list_count().is_count());
        assert!(!key.is_count());
    }

    #[test]
    fn test_prefix() {
        assert_eq!(FlatKey::parse("a.b").prefix(), "a.b.");
        assert_eq!(FlatKey::root().prefix(), "");
    }

    #[test]
    fn test_clear_subtree_keeps_siblings() {
        let mut data = FlatMap::new();
        data.insert("list".to_string(), Value::Null);
        data.insert("list.#".to_string(), Value::Int(1));
        data.insert("list.0".to_string(), Value::from("a"));
        data.insert("list_other".to_string(), Value::from("kept"));
        data.insert("listing.0".to_string(), Value::from("kept"));

        clear_subtree(&mut data, "list");

        assert_eq!(data.len(), 2);
        assert!(data.contains_key("list_other"));
        assert!(data.contains_key("listing.0"));
    }

    #[test]
    fn test_child_tokens() {
        let mut data = FlatMap::new();
        data.insert("set.#".to_string(), Value::Int(2));
        data.insert("set.10.index".to_string(), Value::Int(10));
        data.insert("set.10.value".to_string(), Value::from("x"));
        data.insert("set.50.index".to_string(), Value::Int(50));
        data.insert("setter".to_string(), Value::Null);

        let tokens = child_tokens(&data, "set.", |key, _| key == "set.#");
        assert_eq!(tokens, vec!["10".to_string(), "50".to_string()]);
    }

    #[test]
    fn test_join() {
        assert_eq!(join(&["a", "0", "b"]), "a.0.b");
        assert_eq!(join::<&str>(&[]), "");
        assert_eq!(child_path(&path(["a"]), "#"), path(["a", "#"]));
    }
}
