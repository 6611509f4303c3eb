//! RFC 6901 JSON pointer helpers.

/// Escape one reference token (`~` → `~0`, `/` → `~1`).
pub fn escape(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Undo [`escape`].
pub fn unescape(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Append an escaped token to a pointer.
pub fn push(pointer: &str, token: &str) -> String {
    format!("{}/{}", pointer, escape(token))
}

/// Split a pointer into unescaped tokens. `""` is the whole document.
///
/// Returns `None` for pointers that do not start with `/`.
pub fn tokens(pointer: &str) -> Option<Vec<String>> {
    if pointer.is_empty() {
        return Some(Vec::new());
    }
    let rest = pointer.strip_prefix('/')?;
    Some(rest.split('/').map(unescape).collect())
}

/// True when `candidate` is a syntactically valid, non-empty state pointer.
pub fn is_state_pointer(candidate: &str) -> bool {
    candidate.starts_with('/')
}
