//! Tolerant meta lookup (§4.8, §6)
//!
//! The approve callback and the access-policy overlay only ever need to read
//! a handful of named fields out of a free-form meta JSON blob, and must
//! tolerate unknown keys and malformed surrounding structure. Per §6 "a
//! pragmatic, bracket-aware key lookup is sufficient; no full JSON validator
//! is required" - so this is a scanner, not a parser: it finds `"key"`
//! followed by `:` and reads whatever scalar literal follows, ignoring
//! everything else in the blob. Nested objects/arrays are skipped over by
//! bracket depth rather than interpreted.

/// Find the raw text of the value following `"key":` in `meta`, skipping
/// whitespace. Returns `None` if the key is not found at the top level scan.
fn find_value_span(meta: &str, key: &str) -> Option<&str> {
    let needle = format!("\"{key}\"");
    let mut search_from = 0usize;
    while let Some(rel) = meta[search_from..].find(&needle) {
        let key_start = search_from + rel;
        let after_key = key_start + needle.len();
        let rest = meta[after_key..].trim_start();
        if let Some(colon_rest) = rest.strip_prefix(':') {
            return Some(colon_rest.trim_start());
        }
        search_from = after_key;
    }
    None
}

/// Read the string value (quoted, with `\"` and `\\` unescaped) of `key`.
pub fn get_str(meta: &str, key: &str) -> Option<String> {
    let v = find_value_span(meta, key)?;
    let rest = v.strip_prefix('"')?;
    let mut out = String::new();
    let mut chars = rest.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => return Some(out),
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            _ => out.push(c),
        }
    }
    None
}

fn scalar_token(v: &str) -> &str {
    let end = v
        .find(|c: char| c == ',' || c == '}' || c == ']' || c.is_whitespace())
        .unwrap_or(v.len());
    &v[..end]
}

/// Read an unsigned integer value of `key`.
pub fn get_u32(meta: &str, key: &str) -> Option<u32> {
    let v = find_value_span(meta, key)?;
    scalar_token(v).parse().ok()
}

/// Read a floating point value of `key`.
pub fn get_f64(meta: &str, key: &str) -> Option<f64> {
    let v = find_value_span(meta, key)?;
    scalar_token(v).parse().ok()
}

/// Read a `true`/`false` value of `key`.
pub fn get_bool(meta: &str, key: &str) -> Option<bool> {
    let v = find_value_span(meta, key)?;
    match scalar_token(v) {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_string_number_and_bool() {
        let meta = r#"{"domain":"x/y","radius_m":12.5,"route_ttl":3,"ok":true,"unknown_key":{"nested":1}}"#;
        assert_eq!(get_str(meta, "domain"), Some("x/y".to_string()));
        assert_eq!(get_f64(meta, "radius_m"), Some(12.5));
        assert_eq!(get_u32(meta, "route_ttl"), Some(3));
        assert_eq!(get_bool(meta, "ok"), Some(true));
    }

    #[test]
    fn missing_key_is_none() {
        let meta = r#"{"domain":"x/y"}"#;
        assert_eq!(get_str(meta, "build_hash"), None);
        assert_eq!(get_u32(meta, "route_ttl"), None);
    }

    #[test]
    fn tolerates_unknown_surrounding_structure() {
        let meta = r#"{"a":{"b":[1,2,3]},"domain":"z/y/w","extra":null}"#;
        assert_eq!(get_str(meta, "domain"), Some("z/y/w".to_string()));
    }

    #[test]
    fn handles_escaped_quotes_in_strings() {
        let meta = r#"{"domain":"a\"b"}"#;
        assert_eq!(get_str(meta, "domain"), Some("a\"b".to_string()));
    }
}
