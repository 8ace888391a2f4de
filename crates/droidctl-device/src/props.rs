//! Parsing for `getprop` output.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use droidctl_core::{DroidError, Result};

static PROP_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([^\]]+)\]: \[(.*)\]").expect("valid getprop regex"));

/// Parse the full `getprop` listing: one `[key]: [value]` per line.
pub fn parse_props(output: &str) -> Result<BTreeMap<String, String>> {
    let mut props = BTreeMap::new();
    for line in output.lines() {
        let caps = PROP_LINE
            .captures(line)
            .ok_or_else(|| DroidError::Property(format!("invalid getprop line: \"{line}\"")))?;
        let key = caps[1].to_string();
        if props.contains_key(&key) {
            return Err(DroidError::Property(format!(
                "duplicate getprop key: \"{key}\""
            )));
        }
        props.insert(key, caps[2].to_string());
    }
    Ok(props)
}

/// Parse the output of `getprop <name>`.
///
/// An unset property prints an empty line; that and empty output both mean
/// `None`. More than one line is an error.
pub fn parse_prop_value(output: &str) -> Result<Option<String>> {
    let lines: Vec<&str> = output.lines().collect();
    match lines.as_slice() {
        [] => Ok(None),
        [value] if value.trim().is_empty() => Ok(None),
        [value] => Ok(Some(value.to_string())),
        _ => Err(DroidError::Property(format!(
            "too many lines in getprop output:\n{}",
            lines.join("\n")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_props() {
        let props = parse_props("[ro.a]: [1]\n[ro.b]: [2]").unwrap();
        assert_eq!(props.len(), 2);
        assert_eq!(props["ro.a"], "1");
        assert_eq!(props["ro.b"], "2");
    }

    #[test]
    fn test_parse_props_crlf_and_empty_value() {
        let props = parse_props("[ro.debuggable]: [1]\r\n[ro.boot.mode]: []\r\n").unwrap();
        assert_eq!(props["ro.debuggable"], "1");
        assert_eq!(props["ro.boot.mode"], "");
    }

    #[test]
    fn test_parse_props_value_with_brackets() {
        let props = parse_props("[ro.x]: [a [b] c]").unwrap();
        assert_eq!(props["ro.x"], "a [b] c");
    }

    #[test]
    fn test_parse_props_empty_output() {
        assert!(parse_props("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_props_malformed_line() {
        let err = parse_props("[ro.a]: [1]\nro.b = 2\n").unwrap_err();
        assert!(err.to_string().contains("ro.b = 2"));
    }

    #[test]
    fn test_parse_props_duplicate_key() {
        let err = parse_props("[ro.a]: [1]\n[ro.a]: [2]\n").unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_parse_prop_value() {
        assert_eq!(parse_prop_value("12\n").unwrap().as_deref(), Some("12"));
    }

    #[test]
    fn test_parse_prop_value_absent() {
        assert_eq!(parse_prop_value("").unwrap(), None);
        assert_eq!(parse_prop_value("\n").unwrap(), None);
        assert_eq!(parse_prop_value("   \r\n").unwrap(), None);
    }

    #[test]
    fn test_parse_prop_value_too_many_lines() {
        assert!(parse_prop_value("a\nb\n").is_err());
    }
}
