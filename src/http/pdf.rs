use axum::body::Body;
use axum::http::{HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::proxy::PdfDocument;

impl IntoResponse for PdfDocument {
    fn into_response(self) -> Response {
        let headers = self.headers();
        let mut response = Response::new(Body::from(self.body));

        let map = response.headers_mut();
        for (name, value) in headers {
            match HeaderValue::from_bytes(value.as_bytes()) {
                Ok(value) => {
                    map.insert(HeaderName::from_static(name), value);
                }
                Err(_) => warn!(header = name, "dropping unrepresentable header value"),
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::CachePolicy;
    use axum::http::StatusCode;

    #[test]
    fn test_pdf_response_headers() {
        let response = PdfDocument {
            body: b"%PDF-1.4".to_vec(),
            filename: "a.pdf".to_string(),
            cache: CachePolicy::NoStore,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers["content-type"], "application/pdf");
        assert_eq!(headers["content-disposition"], "inline; filename=\"a.pdf\"");
        assert_eq!(headers["access-control-allow-origin"], "*");
        assert_eq!(
            headers["cache-control"],
            "no-cache, no-store, must-revalidate"
        );
        assert_eq!(headers["pragma"], "no-cache");
        assert_eq!(headers["expires"], "0");
    }

    #[test]
    fn test_immutable_cache_header() {
        let response = PdfDocument {
            body: Vec::new(),
            filename: "issue.pdf".to_string(),
            cache: CachePolicy::Immutable,
        }
        .into_response();

        assert_eq!(
            response.headers()["cache-control"],
            "public, max-age=31536000"
        );
        assert!(response.headers().get("pragma").is_none());
    }
}
