use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

lazy_static! {
    static ref CODE_FENCE: Regex = Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)\s*```").unwrap();
}

/// Parses a model reply as JSON, recovering from the usual wrappers.
///
/// Order: strict parse, then the body of a markdown code fence, then the
/// first balanced `{...}` or `[...]` span that parses.
pub fn parse_reply(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    if let Some(body) = CODE_FENCE.captures(trimmed).and_then(|caps| caps.get(1)) {
        if let Ok(value) = serde_json::from_str::<Value>(body.as_str()) {
            return Some(value);
        }
    }

    extract_balanced(trimmed)
}

/// Scans for the first balanced JSON object or array that parses.
pub fn extract_balanced(text: &str) -> Option<Value> {
    let bytes = text.as_bytes();
    let mut start = 0;

    while let Some(offset) = bytes[start..].iter().position(|b| *b == b'{' || *b == b'[') {
        let open = start + offset;
        if let Some(close) = matching_close(&bytes[open..]) {
            let candidate = &text[open..=open + close];
            if let Ok(value) = serde_json::from_str::<Value>(candidate) {
                return Some(value);
            }
        }
        start = open + 1;
    }

    None
}

/// Index of the bracket closing `slice[0]`, honouring strings and escapes.
fn matching_close(slice: &[u8]) -> Option<usize> {
    let mut stack: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (idx, byte) in slice.iter().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => stack.push(b'}'),
            b'[' => stack.push(b']'),
            b'}' | b']' => {
                if stack.pop() != Some(*byte) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }

    None
}
