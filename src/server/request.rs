use std::io::Read;
use std::sync::Arc;

use may_minihttp::Request;
use tracing::{debug, warn};

use crate::dispatcher::{HeaderVec, IncomingRequest};

/// Copy header name/value pairs, lower-casing names.
pub(crate) fn collect_headers<'a, I>(headers: I) -> HeaderVec
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    headers
        .into_iter()
        .map(|(name, value)| {
            (
                Arc::from(name.to_ascii_lowercase().as_str()),
                String::from_utf8_lossy(value).into_owned(),
            )
        })
        .collect()
}

/// Convert a `may_minihttp::Request` into the dispatcher's input.
///
/// The body is read in full; a read failure leaves it empty.
pub fn to_incoming(req: Request) -> IncomingRequest {
    let method = req.method().to_string();
    let uri = req.path().to_string();
    let headers = collect_headers(req.headers().iter().map(|h| (h.name, h.value)));

    let mut body = Vec::new();
    if let Err(err) = req.body().read_to_end(&mut body) {
        warn!(method = %method, uri = %uri, error = %err, "Failed to read request body");
        body.clear();
    }

    debug!(
        method = %method,
        uri = %uri,
        header_count = headers.len(),
        body_size_bytes = body.len(),
        "HTTP request parsed"
    );

    IncomingRequest {
        method,
        uri,
        headers,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_headers_lowercases_names() {
        let raw: [(&str, &[u8]); 2] = [
            ("Content-Type", b"application/json"),
            ("X-Request-Id", b"01HZY"),
        ];
        let headers = collect_headers(raw);
        assert_eq!(headers.len(), 2);
        assert_eq!(&*headers[0].0, "content-type");
        assert_eq!(headers[1].1, "01HZY");
    }

    #[test]
    fn test_collect_headers_lossy_values() {
        let raw: [(&str, &[u8]); 1] = [("x-bin", &[0x66, 0xff, 0x6f])];
        let headers = collect_headers(raw);
        assert_eq!(headers[0].1, "f\u{fffd}o");
    }
}
