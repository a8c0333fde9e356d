//! Pre-parse normalization for script-embedded, almost-JSON object literals.
//!
//! Share pages assign state objects in inline scripts that are close to JSON
//! but not quite: slashes are escaped and trailing commas are common. Both
//! passes here are string-aware, so quoted text is never rewritten except for
//! the `\/` escape inside it.

/// Returns the balanced `{ ... }` object literal starting at byte `start`.
///
/// `start` must index an opening brace. Braces inside single- or double-quoted
/// strings are ignored and backslash escapes are honored. Returns `None` when
/// the literal is not closed before the end of `text`.
#[must_use]
pub fn balanced_object(text: &str, start: usize) -> Option<&str> {
    let bytes = text.as_bytes();
    if bytes.get(start) != Some(&b'{') {
        return None;
    }

    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if let Some(open) = quote {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == open {
                quote = None;
            }
            continue;
        }

        match byte {
            b'"' | b'\'' => quote = Some(byte),
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return text.get(start..=start + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Repairs a near-JSON fragment so a strict JSON parser accepts it.
///
/// - `\/` inside strings becomes `/`
/// - commas followed only by whitespace before `}` or `]` are dropped
///
/// Everything else, including other escapes, is left untouched.
#[must_use]
pub fn normalize_near_json(fragment: &str) -> String {
    let mut out = String::with_capacity(fragment.len());
    let mut chars = fragment.char_indices().peekable();
    let mut in_string = false;

    while let Some((index, c)) = chars.next() {
        if in_string {
            match c {
                '\\' => match chars.peek() {
                    Some(&(_, '/')) => {
                        out.push('/');
                        chars.next();
                    }
                    Some(&(_, next)) => {
                        out.push('\\');
                        out.push(next);
                        chars.next();
                    }
                    None => out.push('\\'),
                },
                '"' => {
                    in_string = false;
                    out.push(c);
                }
                _ => out.push(c),
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' if closes_after_whitespace(&fragment[index + 1..]) => {}
            _ => out.push(c),
        }
    }
    out
}

fn closes_after_whitespace(rest: &str) -> bool {
    matches!(rest.trim_start().chars().next(), Some('}' | ']'))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_commas_removed() {
        assert_eq!(
            normalize_near_json(r#"{"a": [1, 2, ], "b": {"c": 3,},}"#),
            r#"{"a": [1, 2 ], "b": {"c": 3}}"#
        );
    }

    #[test]
    fn test_escaped_slashes_unescaped_inside_strings() {
        assert_eq!(
            normalize_near_json(r#"{"dlink":"https:\/\/d.example\/x"}"#),
            r#"{"dlink":"https://d.example/x"}"#
        );
    }

    #[test]
    fn test_commas_inside_strings_preserved() {
        let input = r#"{"name": "a, }", "list": ["x,]"]}"#;
        assert_eq!(normalize_near_json(input), input);
    }

    #[test]
    fn test_other_escapes_preserved() {
        let input = r#"{"q": "say \"hi\", \\ then \n"}"#;
        assert_eq!(normalize_near_json(input), input);
    }

    #[test]
    fn test_normalized_output_parses() {
        let repaired = normalize_near_json("{\"list\": [{\"dlink\": \"http:\\/\\/x\\/y\",},\n],\n}");
        let value: serde_json::Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(value["list"][0]["dlink"], "http://x/y");
    }

    #[test]
    fn test_balanced_object_handles_nesting_and_strings() {
        let text = r#"var a = {"x": {"y": "}"}, 'z': '{'}; var b = 1;"#;
        let start = text.find('{').unwrap();
        assert_eq!(
            balanced_object(text, start),
            Some(r#"{"x": {"y": "}"}, 'z': '{'}"#)
        );
    }

    #[test]
    fn test_balanced_object_unclosed_returns_none() {
        let text = r#"window.s = {"a": {"b": 1}"#;
        let start = text.find('{').unwrap();
        assert_eq!(balanced_object(text, start), None);
        assert_eq!(balanced_object(text, 0), None);
    }

    #[test]
    fn test_balanced_object_respects_escaped_quotes() {
        let text = r#"{"a": "quote \" { brace"}"#;
        assert_eq!(balanced_object(text, 0), Some(text));
    }
}
