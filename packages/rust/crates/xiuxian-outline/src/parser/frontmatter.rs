use serde_yaml::Value;

fn is_delimiter(line: &str) -> bool {
    line.trim() == "---"
}

/// Split a leading `---` front-matter block from the body.
///
/// Returns `(front_matter_text, body)`; an unterminated block is treated as
/// body text.
#[must_use]
pub fn split_front_matter(content: &str) -> (Option<&str>, &str) {
    let mut lines = content.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return (None, content);
    };
    if !is_delimiter(first) {
        return (None, content);
    }
    let start = first.len();
    let mut offset = start;
    for line in lines {
        if is_delimiter(line) {
            let front = content[start..offset].trim_end_matches(['\r', '\n']);
            return (Some(front), &content[offset + line.len()..]);
        }
        offset += line.len();
    }
    (None, content)
}

/// Parse front matter as YAML; malformed YAML yields `None`.
#[must_use]
pub fn parse_front_matter(content: &str) -> (Option<Value>, &str) {
    let (front, body) = split_front_matter(content);
    let parsed = front.and_then(|raw| serde_yaml::from_str::<Value>(raw).ok());
    (parsed, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_front_matter() {
        let (front, body) = split_front_matter("---\ntitle: x\n---\n- A\n");
        assert_eq!(front, Some("title: x"));
        assert_eq!(body, "- A\n");
    }

    #[test]
    fn test_empty_and_unterminated_blocks() {
        let (front, body) = split_front_matter("---\n---\n- A");
        assert_eq!(front, Some(""));
        assert_eq!(body, "- A");

        let text = "---\nno closing\n- A";
        assert_eq!(split_front_matter(text), (None, text));
        assert_eq!(split_front_matter(""), (None, ""));
    }

    #[test]
    fn test_parse_front_matter_yaml() {
        let (value, body) = parse_front_matter("---\nid: abc-123\n---\n- A");
        let id = value.as_ref().and_then(|v| v.get("id")).and_then(Value::as_str);
        assert_eq!(id, Some("abc-123"));
        assert_eq!(body, "- A");

        let (value, _) = parse_front_matter("---\nkey: [unclosed\n---\n");
        assert!(value.is_none());
    }
}
