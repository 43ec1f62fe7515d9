//! Option-string parsing
//!
//! Decodes the comma-separated `key=value` strings accepted by
//! `--export-cache`, `--import-cache`, `--secret`, `--ssh` and `--allow`
//! into typed records.

pub mod cache;
pub mod entitlement;
pub mod secret;
pub mod ssh;

pub use cache::{parse_export_cache, parse_import_cache, CacheOptionEntry};
pub use entitlement::{parse_entitlements, Entitlement};
pub use secret::{parse_secret, parse_secret_specs, SecretSource};
pub use ssh::{parse_ssh_specs, SshAgentConfig};

use crate::error::{BuildError, BuildResult};
use serde::Serialize;
use std::collections::BTreeMap;

/// Keys that set the record kind instead of an attribute
const KIND_KEYS: [&str; 2] = ["type", "kind"];

/// A typed record decoded from one `type=<kind>,<key>=<value>,...` string
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub attrs: BTreeMap<String, String>,
}

impl OptionEntry {
    /// Create an entry with no attributes
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attrs: BTreeMap::new(),
        }
    }

    /// Get an attribute value
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }
}

/// How an option string should be read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionSpec<'a> {
    /// Carries a `type=`/`kind=` field
    Structured(&'a str),
    /// A bare positional value such as a registry reference
    Legacy(&'a str),
}

impl<'a> OptionSpec<'a> {
    /// Decide between the structured and legacy grammar
    pub fn classify(spec: &'a str) -> Self {
        let structured = split_fields(spec)
            .map(|fields| {
                fields.iter().any(|field| {
                    field
                        .split_once('=')
                        .is_some_and(|(key, _)| is_kind_key(&key.to_lowercase()))
                })
            })
            .unwrap_or_else(|_| spec.contains("type="));

        if structured {
            OptionSpec::Structured(spec)
        } else {
            OptionSpec::Legacy(spec)
        }
    }
}

fn is_kind_key(key: &str) -> bool {
    KIND_KEYS.contains(&key)
}

/// Parse one structured option string.
///
/// `option` names the flag the string came from and is used when the
/// record has no kind.
pub fn parse_option_record(spec: &str, option: &'static str) -> BuildResult<OptionEntry> {
    let mut kind = String::new();
    let mut attrs = BTreeMap::new();

    for (key, value) in parse_fields(spec)? {
        if is_kind_key(&key) {
            kind = value;
        } else {
            attrs.insert(key, value);
        }
    }

    if kind.is_empty() {
        return Err(BuildError::MissingType { option });
    }

    Ok(OptionEntry { kind, attrs })
}

/// Split an option string into lowercased `(key, value)` pairs.
///
/// Every field must contain `=`; the value is everything after the first one.
pub(crate) fn parse_fields(spec: &str) -> BuildResult<Vec<(String, String)>> {
    split_fields(spec)?
        .into_iter()
        .map(|field| match field.split_once('=') {
            Some((key, value)) => Ok((key.to_lowercase(), value.to_string())),
            None => Err(BuildError::MalformedField { field }),
        })
        .collect()
}

/// Parse `key=value` strings into a map. Later keys overwrite earlier ones.
pub fn parse_flat_assignments<S: AsRef<str>>(values: &[S]) -> BuildResult<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();
    for value in values {
        let value = value.as_ref();
        let (key, val) = value
            .split_once('=')
            .ok_or_else(|| BuildError::InvalidAssignment(value.to_string()))?;
        map.insert(key.to_string(), val.to_string());
    }
    Ok(map)
}

/// Split a single CSV record into fields.
///
/// Supports double-quoted fields with `""` escapes. Reading stops at the
/// first unquoted line break.
pub(crate) fn split_fields(spec: &str) -> BuildResult<Vec<String>> {
    let syntax = |reason: &str| BuildError::OptionSyntax {
        spec: spec.to_string(),
        reason: reason.to_string(),
    };

    let mut fields = Vec::new();
    let mut chars = spec.chars().peekable();

    if spec.is_empty() {
        return Ok(fields);
    }

    loop {
        let mut field = String::new();

        if chars.peek() == Some(&'"') {
            chars.next();
            loop {
                match chars.next() {
                    Some('"') if chars.peek() == Some(&'"') => {
                        chars.next();
                        field.push('"');
                    }
                    Some('"') => break,
                    Some(c) => field.push(c),
                    None => return Err(syntax("extraneous or missing \" in quoted-field")),
                }
            }
            match chars.peek() {
                None | Some(',') | Some('\n') | Some('\r') => {}
                Some(_) => return Err(syntax("extraneous or missing \" in quoted-field")),
            }
        } else {
            while let Some(&c) = chars.peek() {
                match c {
                    ',' | '\n' => break,
                    '\r' if matches!(chars.clone().nth(1), None | Some('\n')) => break,
                    '"' => return Err(syntax("bare \" in non-quoted-field")),
                    _ => {
                        field.push(c);
                        chars.next();
                    }
                }
            }
        }

        fields.push(field);

        match chars.next() {
            Some(',') => continue,
            _ => break,
        }
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_taken_from_type_field_regardless_of_position() {
        let a = parse_option_record("type=registry,ref=example.com/foo", "--x").unwrap();
        let b = parse_option_record("ref=example.com/foo,type=registry", "--x").unwrap();
        assert_eq!(a.kind, "registry");
        assert_eq!(a, b);
        assert_eq!(a.attr("ref"), Some("example.com/foo"));
    }

    #[test]
    fn kind_alias_and_key_case_folding() {
        let entry = parse_option_record("KIND=local,Dest=/tmp/out", "--x").unwrap();
        assert_eq!(entry.kind, "local");
        assert_eq!(entry.attr("dest"), Some("/tmp/out"));
    }

    #[test]
    fn values_keep_later_equals_signs() {
        let entry = parse_option_record("type=registry,ref=a=b=c", "--x").unwrap();
        assert_eq!(entry.attr("ref"), Some("a=b=c"));
    }

    #[test]
    fn duplicate_keys_last_write_wins() {
        let entry = parse_option_record("type=local,dest=a,dest=b", "--x").unwrap();
        assert_eq!(entry.attr("dest"), Some("b"));
    }

    #[test]
    fn field_without_equals_fails() {
        let err = parse_option_record("type=local,oops", "--x").unwrap_err();
        assert!(matches!(err, BuildError::MalformedField { ref field } if field == "oops"));
    }

    #[test]
    fn missing_kind_fails() {
        let err = parse_option_record("ref=foo", "--import-cache").unwrap_err();
        assert_eq!(err.to_string(), "--import-cache requires type=<type>");
    }

    #[test]
    fn empty_attributes_are_allowed() {
        let entry = parse_option_record("type=inline", "--x").unwrap();
        assert!(entry.attrs.is_empty());
    }

    #[test]
    fn flat_assignments() {
        let map = parse_flat_assignments(&["a=1", "b=2=3"]).unwrap();
        assert_eq!(map.get("a").map(String::as_str), Some("1"));
        assert_eq!(map.get("b").map(String::as_str), Some("2=3"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn flat_assignments_overwrite_and_keep_key_case() {
        let map = parse_flat_assignments(&["Key=1", "Key=2"]).unwrap();
        assert_eq!(map.get("Key").map(String::as_str), Some("2"));
    }

    #[test]
    fn flat_assignment_without_equals_names_value() {
        let err = parse_flat_assignments(&["noequals"]).unwrap_err();
        assert!(err.to_string().contains("noequals"));
    }

    #[test]
    fn quoted_fields_may_contain_commas() {
        let fields = split_fields(r#"type=local,"dest=/a,b","say=""hi""""#).unwrap();
        assert_eq!(fields, vec!["type=local", "dest=/a,b", r#"say="hi""#]);
    }

    #[test]
    fn quoting_errors() {
        assert!(split_fields(r#"type=local,"dest=/a"#).is_err());
        assert!(split_fields(r#"type=lo"cal"#).is_err());
        assert!(split_fields(r#""a"b,c"#).is_err());
    }

    #[test]
    fn record_stops_at_line_break() {
        let fields = split_fields("type=local,dest=a\ntype=other").unwrap();
        assert_eq!(fields, vec!["type=local", "dest=a"]);
    }

    #[test]
    fn empty_fields_are_kept() {
        assert_eq!(split_fields("a=1,,b=2").unwrap(), vec!["a=1", "", "b=2"]);
        assert!(split_fields("").unwrap().is_empty());
    }

    #[test]
    fn classify_structured_and_legacy() {
        assert_eq!(
            OptionSpec::classify("type=registry,ref=foo"),
            OptionSpec::Structured("type=registry,ref=foo")
        );
        assert_eq!(
            OptionSpec::classify("ref=foo,Kind=local"),
            OptionSpec::Structured("ref=foo,Kind=local")
        );
        assert_eq!(
            OptionSpec::classify("example.com/foo/bar:cache"),
            OptionSpec::Legacy("example.com/foo/bar:cache")
        );
    }
}
