//! Utility functions for working with identifiers.

use heck::{ToSnakeCase, ToUpperCamelCase};
use once_cell::sync::Lazy;
use regex::Regex;

static NON_IDENT_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{Nd}]").expect("invalid identifier regex"));
static LEADING_LETTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\p{L}").expect("invalid identifier regex"));

/// Converts a Protobuf name into an exported Go identifier.
///
/// The conversion is the one `protoc-gen-go` applies to type, field and method names, so
/// identifiers produced here refer to the declarations `protoc-gen-go` emits for the same file.
/// `.` separators turn into `_` unless followed by a lower case letter, and an initial `_`
/// becomes `X`.
pub fn to_go_camel(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let is_lower_at = |idx: usize| bytes.get(idx).map_or(false, u8::is_ascii_lowercase);

    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b'.' if is_lower_at(i + 1) => {}
            b'.' => out.push(b'_'),
            b'_' if i == 0 || bytes[i - 1] == b'.' => out.push(b'X'),
            b'_' if is_lower_at(i + 1) => {}
            b'0'..=b'9' => out.push(c),
            _ => {
                out.push(c.to_ascii_uppercase());
                while is_lower_at(i + 1) {
                    out.push(bytes[i + 1]);
                    i += 1;
                }
            }
        }
        i += 1;
    }

    // Only ASCII bytes are ever added, removed or rewritten, so multi-byte sequences survive.
    String::from_utf8(out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

/// Lower cases the first character of a Go identifier, making it package private.
pub fn unexport(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Strips an enum's name prefix from an `UpperCamel` enum value name.
///
/// `Foo` is not considered a prefix of `Foobar`: the remainder must start a new word. A value
/// consisting solely of the prefix, or continuing with a digit, is left untouched.
pub fn strip_enum_prefix<'a>(prefix: &str, name: &'a str) -> &'a str {
    let stripped = name.strip_prefix(prefix).unwrap_or(name);
    if stripped.starts_with(|c: char| c.is_ascii_uppercase()) {
        stripped
    } else {
        name
    }
}

/// The `snake_case` name of an enum value with the enum's own name removed, e.g.
/// `STATUS_NOT_FOUND` of enum `Status` becomes `not_found`.
pub fn enum_value_short_name(enum_name: &str, value_name: &str) -> String {
    let prefix = enum_name.to_upper_camel_case();
    let value = value_name.to_upper_camel_case();
    strip_enum_prefix(&prefix, &value).to_snake_case()
}

/// Makes an arbitrary string a valid Go identifier: characters other than Unicode letters and
/// decimal digits become `_`, and names which are keywords or do not start with a letter
/// receive a leading `_`.
pub fn sanitize_go_identifier(s: &str) -> String {
    let sanitized = NON_IDENT_CHARS.replace_all(s, "_");
    let starts_with_letter = LEADING_LETTER.is_match(&sanitized);
    if is_go_keyword(&sanitized) || !starts_with_letter {
        format!("_{}", sanitized)
    } else {
        sanitized.into_owned()
    }
}

pub fn is_go_keyword(s: &str) -> bool {
    matches!(
        s,
        "break"
            | "case"
            | "chan"
            | "const"
            | "continue"
            | "default"
            | "defer"
            | "else"
            | "fallthrough"
            | "for"
            | "func"
            | "go"
            | "goto"
            | "if"
            | "import"
            | "interface"
            | "map"
            | "package"
            | "range"
            | "return"
            | "select"
            | "struct"
            | "switch"
            | "type"
            | "var"
    )
}
