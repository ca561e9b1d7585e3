//! Naming helpers for Go identifiers
//!
//! The casing rules mirror the ones protoc-gen-go applies to message and
//! service names, so identifiers produced here line up with the message
//! types generated alongside them.

/// Convert a protobuf name to an exported Go identifier
///
/// Words are delimited by `_` or an upper-case letter. A leading `_` is
/// replaced by `X`, an `_` followed by a lower-case letter is dropped and the
/// letter upper-cased, digits stand on their own.
///
/// # Examples
/// ```
/// use carno_codegen_common::naming::camel_case;
///
/// assert_eq!(camel_case("echo_service"), "EchoService");
/// assert_eq!(camel_case("_my_field"), "XMyField");
/// assert_eq!(camel_case("HTTPServer"), "HTTPServer");
/// ```
pub fn camel_case(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(bytes.len() + 1);
    let mut i = 0;

    if bytes.first() == Some(&b'_') {
        out.push('X');
        i = 1;
    }

    while i < bytes.len() {
        let c = bytes[i];
        let next_is_lower = bytes.get(i + 1).is_some_and(u8::is_ascii_lowercase);

        if c == b'_' && next_is_lower {
            i += 1;
            continue;
        }
        if c.is_ascii_digit() {
            out.push(c as char);
            i += 1;
            continue;
        }

        out.push(c.to_ascii_uppercase() as char);
        while bytes.get(i + 1).is_some_and(u8::is_ascii_lowercase) {
            i += 1;
            out.push(bytes[i] as char);
        }
        i += 1;
    }

    out
}

/// Camel-case every element of a dotted path and join with `_`
///
/// Used for nested message names: `Outer.inner_msg` -> `Outer_InnerMsg`.
pub fn camel_case_path(path: &str) -> String {
    path.split('.')
        .filter(|part| !part.is_empty())
        .map(camel_case)
        .collect::<Vec<_>>()
        .join("_")
}

/// Lower-case only the first character
pub fn unexport(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Reserved words of the Go language
pub const GO_KEYWORDS: &[&str] = &[
    "break",
    "case",
    "chan",
    "const",
    "continue",
    "default",
    "defer",
    "else",
    "fallthrough",
    "for",
    "func",
    "go",
    "goto",
    "if",
    "import",
    "interface",
    "map",
    "package",
    "range",
    "return",
    "select",
    "struct",
    "switch",
    "type",
    "var",
];

pub fn is_go_keyword(s: &str) -> bool {
    GO_KEYWORDS.contains(&s)
}

/// Sanitize a string into a valid Go package clause name
///
/// Keywords get a trailing `_`, e.g. `type` becomes `type_`.
pub fn go_package_name(s: &str) -> String {
    let mut name: String = s
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    if is_go_keyword(&name) {
        name.push('_');
    }
    name
}
