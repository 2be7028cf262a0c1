//! Page name <-> file base name encoding.
//!
//! Namespaces (`a/b`) are flattened with a triple underscore (`a___b`);
//! characters that are unsafe in file names are percent-encoded.

use std::fmt::Write as _;

/// Separator used to flatten namespaced page names into one file name.
pub const NAMESPACE_SEPARATOR: &str = "___";

const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '\\', '|', '?', '*', '#', '%'];
const RESERVED_DEVICE_NAMES: &[&str] = &[
    "con", "prn", "aux", "nul", "com1", "com2", "com3", "com4", "com5", "com6", "com7", "com8",
    "com9", "lpt1", "lpt2", "lpt3", "lpt4", "lpt5", "lpt6", "lpt7", "lpt8", "lpt9",
];

fn push_percent_encoded(out: &mut String, ch: char) {
    let mut buf = [0_u8; 4];
    for byte in ch.encode_utf8(&mut buf).bytes() {
        let _ = write!(out, "%{byte:02X}");
    }
}

fn underscores_are_ambiguous(name: &str) -> bool {
    name.contains(NAMESPACE_SEPARATOR) || name.contains("_/") || name.contains("/_")
}

fn is_reserved_device_name(file_base: &str) -> bool {
    let stem = file_base.split('.').next().unwrap_or_default();
    RESERVED_DEVICE_NAMES
        .iter()
        .any(|reserved| stem.eq_ignore_ascii_case(reserved))
}

/// Encode a page name into a file base name (without extension).
#[must_use]
pub fn encode_page_name(name: &str) -> String {
    let escape_underscores = underscores_are_ambiguous(name);
    let mut out = String::with_capacity(name.len());
    for (idx, segment) in name.split('/').enumerate() {
        if idx > 0 {
            out.push_str(NAMESPACE_SEPARATOR);
        }
        for ch in segment.chars() {
            if RESERVED_CHARS.contains(&ch) || (escape_underscores && ch == '_') {
                push_percent_encoded(&mut out, ch);
            } else {
                out.push(ch);
            }
        }
    }
    if is_reserved_device_name(&out) {
        let mut chars = out.chars();
        if let Some(first) = chars.next() {
            let rest: String = chars.collect();
            let mut escaped = String::with_capacity(out.len() + 2);
            push_percent_encoded(&mut escaped, first);
            escaped.push_str(&rest);
            return escaped;
        }
    }
    out
}

/// Percent-decode one segment, leaving it untouched when the escapes do not
/// form valid UTF-8.
#[must_use]
pub fn percent_decode_lossless(raw: &str) -> String {
    if !raw.contains('%') {
        return raw.to_string();
    }
    urlencoding::decode(raw).map_or_else(|_| raw.to_string(), |decoded| decoded.into_owned())
}

/// Decode a file base name (without extension) back into a page name.
///
/// Tolerates legacy names: plain percent-encoding such as `a%2Fb` decodes to
/// `a/b`, invalid escapes stay literal.
#[must_use]
pub fn decode_page_name(file_base: &str) -> String {
    file_base
        .split(NAMESPACE_SEPARATOR)
        .map(percent_decode_lossless)
        .collect::<Vec<_>>()
        .join("/")
}
