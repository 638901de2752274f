//! Segment-wise path matching with positional parameter capture.
//!
//! A pattern segment written as `{name}` (one brace pair around one or more word
//! characters) captures the request segment at the same position, whatever its
//! content. Every other pattern segment must equal the request segment byte for
//! byte. There is no wildcard or catch-all: segment counts must agree.

use once_cell::sync::Lazy;
use regex::Regex;
use smallvec::SmallVec;

/// Maximum number of positional parameters before heap allocation.
/// Most routes capture ≤4 segments (e.g. `/users/{id}/posts/{post}`).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Positional parameters in left-to-right pattern order.
pub type ParamVec = SmallVec<[String; MAX_INLINE_PARAMS]>;

#[allow(clippy::expect_used)]
static PARAM_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\{[A-Za-z0-9_]+\}$").expect("parameter token regex is valid"));

/// Returns true if `segment` is a parameter token such as `{id}`.
#[inline]
#[must_use]
pub fn is_param_token(segment: &str) -> bool {
    PARAM_TOKEN.is_match(segment)
}

/// Name of a parameter token (`{id}` -> `id`), or `None` for a literal segment.
#[must_use]
pub fn param_name(segment: &str) -> Option<&str> {
    if is_param_token(segment) {
        Some(&segment[1..segment.len() - 1])
    } else {
        None
    }
}

/// Match `path` against `pattern`.
///
/// Both sides are trimmed of leading/trailing `/` and split on `/`.
///
/// # Returns
///
/// * `Some(params)` - one entry per parameter token, in pattern order
/// * `None` - segment counts differ or a literal segment differs
///
/// # Example
///
/// ```rust
/// use brrtkit::router::match_path;
///
/// let params = match_path("/users/{id}", "/users/42").unwrap();
/// assert_eq!(params.as_slice(), ["42"]);
/// assert!(match_path("/users/{id}", "/users").is_none());
/// ```
#[must_use]
pub fn match_path(pattern: &str, path: &str) -> Option<ParamVec> {
    let pattern_parts = pattern.trim_matches('/').split('/');
    let request_parts = path.trim_matches('/').split('/');

    if pattern_parts.clone().count() != request_parts.clone().count() {
        return None;
    }

    let mut params = ParamVec::new();
    for (part, actual) in pattern_parts.zip(request_parts) {
        if is_param_token(part) {
            params.push(actual.to_string());
        } else if part != actual {
            return None;
        }
    }
    Some(params)
}

/// Normalize a path to its stored form: one leading slash, no trailing slash,
/// no empty segments. The root path normalizes to `/`.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len() + 1);
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        normalized.push('/');
        normalized.push_str(segment);
    }
    if normalized.is_empty() {
        normalized.push('/');
    }
    normalized
}
