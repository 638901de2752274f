use std::collections::HashSet;
use std::sync::Mutex;

use http::StatusCode;
use may_minihttp::Response;
use once_cell::sync::Lazy;
use serde_json::Value;
use tracing::warn;

use crate::dispatcher::HandlerResponse;

/// Response headers that are unique per request and stay off the wire.
///
/// `may_minihttp` only takes `'static` header lines; these values are recorded in the
/// dispatch span instead.
pub(crate) const PER_REQUEST_HEADERS: [&str; 1] = ["x-request-id"];

/// Upper bound on distinct dynamic header lines kept for the process lifetime.
pub(crate) const MAX_INTERNED_HEADER_LINES: usize = 1024;

static HEADER_LINES: Lazy<HeaderLineCache> =
    Lazy::new(|| HeaderLineCache::new(MAX_INTERNED_HEADER_LINES));

pub(crate) fn status_reason(status: u16) -> &'static str {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown")
}

/// Header lines written on nearly every response, kept static.
fn static_header_line(name: &str, value: &str) -> Option<&'static str> {
    if !name.eq_ignore_ascii_case("content-type") {
        return None;
    }
    match value {
        "application/json" => Some("Content-Type: application/json"),
        "application/json; charset=utf-8" => Some("Content-Type: application/json; charset=utf-8"),
        "text/plain; charset=utf-8" => Some("Content-Type: text/plain; charset=utf-8"),
        "text/html; charset=utf-8" => Some("Content-Type: text/html; charset=utf-8"),
        _ => None,
    }
}

/// Header line for the wire; `None` for names or values that would break framing.
pub(crate) fn header_line(name: &str, value: &str) -> Option<String> {
    if name.is_empty() || name.contains([':', '\r', '\n']) || value.contains(['\r', '\n']) {
        return None;
    }
    Some(format!("{name}: {value}"))
}

/// Interned `'static` header lines, each leaked once.
///
/// Once `capacity` distinct lines are held, new lines are refused so the leaked set
/// stays bounded.
pub(crate) struct HeaderLineCache {
    lines: Mutex<HashSet<&'static str>>,
    capacity: usize,
}

impl HeaderLineCache {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            lines: Mutex::new(HashSet::new()),
            capacity,
        }
    }

    pub(crate) fn intern(&self, line: String) -> Option<&'static str> {
        let mut lines = match self.lines.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(existing) = lines.get(line.as_str()) {
            return Some(*existing);
        }
        if lines.len() >= self.capacity {
            return None;
        }
        let leaked: &'static str = Box::leak(line.into_boxed_str());
        lines.insert(leaked);
        Some(leaked)
    }

    pub(crate) fn len(&self) -> usize {
        match self.lines.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

/// The header lines written for `hr`, content type defaults included.
///
/// A response without a content type gets `text/plain` for string bodies and
/// `application/json` for other non-empty bodies.
pub(crate) fn wire_header_lines(hr: &HandlerResponse, cache: &HeaderLineCache) -> Vec<&'static str> {
    let mut lines = Vec::with_capacity(hr.headers.len() + 1);
    for (name, value) in &hr.headers {
        if PER_REQUEST_HEADERS
            .iter()
            .any(|h| name.eq_ignore_ascii_case(h))
        {
            continue;
        }
        if let Some(line) = static_header_line(name, value) {
            lines.push(line);
        } else if let Some(line) = header_line(name, value) {
            match cache.intern(line) {
                Some(line) => lines.push(line),
                None => warn!(header = %name, "Header line cache full, header dropped"),
            }
        } else {
            warn!(header = %name, "Header with invalid characters dropped");
        }
    }
    if hr.get_header("content-type").is_none() {
        match &hr.body {
            Value::Null => {}
            Value::String(_) => lines.push("Content-Type: text/plain; charset=utf-8"),
            _ => lines.push("Content-Type: application/json"),
        }
    }
    lines
}

/// Write a dispatcher response to the connection.
pub fn write_handler_response(res: &mut Response, hr: &HandlerResponse) {
    res.status_code(hr.status as usize, status_reason(hr.status));
    for line in wire_header_lines(hr, &HEADER_LINES) {
        res.header(line);
    }
    res.body_vec(hr.body_bytes());
}
