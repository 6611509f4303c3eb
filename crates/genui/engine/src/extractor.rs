//! Incremental extraction of top-level JSON objects from model output.
//!
//! Model output is a text stream that may interleave prose, code fences
//! and zero or more JSON objects. [`extract`] scans a buffer once and
//! returns every span whose braces close, parsed or not, in the order it
//! was seen, plus the unfinished suffix starting at the last unclosed
//! `{`. [`ObjectExtractor`] keeps that suffix between chunks.

use serde_json::Value;

/// A balanced `{...}` span that is still not JSON after repair.
#[derive(Debug, Clone, PartialEq)]
pub struct MalformedObject {
    pub raw: String,
    pub error: String,
}

/// One balanced span.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    Object(Value),
    Malformed(MalformedObject),
}

/// Result of scanning one buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// Balanced spans in encounter order.
    pub items: Vec<Extracted>,
    /// Text from the opening brace of an unclosed object, or empty.
    pub remainder: String,
}

impl Extraction {
    /// Parsed objects only, in encounter order.
    pub fn objects(&self) -> Vec<Value> {
        self.items
            .iter()
            .filter_map(|item| match item {
                Extracted::Object(value) => Some(value.clone()),
                Extracted::Malformed(_) => None,
            })
            .collect()
    }

    pub fn malformed(&self) -> Vec<&MalformedObject> {
        self.items
            .iter()
            .filter_map(|item| match item {
                Extracted::Malformed(malformed) => Some(malformed),
                Extracted::Object(_) => None,
            })
            .collect()
    }
}

/// Scan `buffer` for complete top-level objects.
///
/// String literals are only tracked inside an object, so quotes in
/// surrounding prose cannot swallow the next object.
pub fn extract(buffer: &str) -> Extraction {
    let mut extraction = Extraction::default();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut start: Option<usize> = None;

    for (idx, ch) in buffer.char_indices() {
        if depth == 0 {
            if ch == '{' {
                depth = 1;
                start = Some(idx);
            }
            continue;
        }
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    if let Some(begin) = start.take() {
                        push_span(&mut extraction, &buffer[begin..=idx]);
                    }
                }
            }
            _ => {}
        }
    }

    if let Some(begin) = start {
        extraction.remainder = buffer[begin..].to_string();
    }
    extraction
}

fn push_span(extraction: &mut Extraction, span: &str) {
    let item = match parse_object(span) {
        Ok(value) => Extracted::Object(value),
        Err(error) => {
            tracing::debug!(len = span.len(), %error, "discarding malformed object");
            Extracted::Malformed(MalformedObject {
                raw: span.to_string(),
                error,
            })
        }
    };
    extraction.items.push(item);
}

fn parse_object(span: &str) -> Result<Value, String> {
    let first = match serde_json::from_str::<Value>(span) {
        Ok(value) => return Ok(value),
        Err(err) => err.to_string(),
    };
    // One deterministic repair pass for a common producer mistake.
    let repaired = strip_trailing_commas(span);
    if repaired != span {
        if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
            return Ok(value);
        }
    }
    Err(first)
}

/// Remove commas that directly precede `}` or `]`, outside string literals.
fn strip_trailing_commas(span: &str) -> String {
    let chars: Vec<char> = span.chars().collect();
    let mut out = String::with_capacity(span.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &ch) in chars.iter().enumerate() {
        if in_string {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        if ch == '"' {
            in_string = true;
        } else if ch == ',' {
            let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        out.push(ch);
    }
    out
}

/// Pull-based wrapper around [`extract`] for chunked input.
#[derive(Debug, Default, Clone)]
pub struct ObjectExtractor {
    buffer: String,
    emitted: usize,
}

impl ObjectExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return what became complete. Objects are never
    /// returned twice; an object that never closes is never returned.
    pub fn push(&mut self, chunk: &str) -> Extraction {
        self.buffer.push_str(chunk);
        let mut extraction = extract(&self.buffer);
        self.buffer = std::mem::take(&mut extraction.remainder);
        self.emitted += extraction
            .items
            .iter()
            .filter(|item| matches!(item, Extracted::Object(_)))
            .count();
        extraction
    }

    /// Objects returned so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Unfinished suffix retained for the next chunk.
    pub fn remainder(&self) -> &str {
        &self.buffer
    }
}
