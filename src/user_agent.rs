//! Identifying User-Agent for outbound fetches.
//!
//! Every remote page, detail page, and proxy fetch carries the same header so
//! the upstream site can recognize (and rate limit) this service.

/// Product token sent in the User-Agent header.
const PRODUCT: &str = "filhaal-proxy";

/// Default User-Agent for outbound requests.
#[must_use]
pub fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("{PRODUCT}/{version}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_carries_product_and_version() {
        let ua = default_user_agent();
        assert_eq!(
            ua.strip_prefix("filhaal-proxy/"),
            Some(env!("CARGO_PKG_VERSION")),
            "UA must be product/version: {ua}"
        );
    }
}
