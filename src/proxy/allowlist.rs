//! Destination host policy for the proxy.

use url::Url;

use super::ProxyError;

/// Default trusted storage domain suffix.
pub const DEFAULT_TRUSTED_SUFFIX: &str = "cloudinary.com";
/// Default development host.
pub const DEFAULT_LOOPBACK_HOST: &str = "localhost";

/// Hosts the proxy is willing to fetch from.
///
/// A target passes when its host is the trusted suffix or a subdomain of it,
/// is one of the service's own configured public hosts, or equals the
/// loopback host. Nothing the caller sends widens the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostAllowlist {
    trusted_suffix: String,
    loopback_host: String,
    own_hosts: Vec<String>,
}

impl Default for HostAllowlist {
    fn default() -> Self {
        Self::new(DEFAULT_TRUSTED_SUFFIX, DEFAULT_LOOPBACK_HOST)
    }
}

impl HostAllowlist {
    #[must_use]
    pub fn new(trusted_suffix: &str, loopback_host: &str) -> Self {
        Self {
            trusted_suffix: normalize_host(trusted_suffix.trim_start_matches('.')),
            loopback_host: normalize_host(loopback_host),
            own_hosts: Vec::new(),
        }
    }

    /// Adds the hosts this service is publicly reachable at. Ports are
    /// ignored; blank entries are skipped.
    #[must_use]
    pub fn with_own_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.own_hosts.extend(
            hosts
                .into_iter()
                .map(|host| normalize_host(strip_port(host.as_ref().trim())))
                .filter(|host| !host.is_empty()),
        );
        self
    }

    /// Parses `target` and checks its host.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::InvalidTarget`] for unparseable or non-http(s)
    /// URLs and [`ProxyError::Forbidden`] for hosts outside the list.
    pub fn check(&self, target: &str) -> Result<Url, ProxyError> {
        let url = Url::parse(target).map_err(|_| ProxyError::InvalidTarget(target.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ProxyError::InvalidTarget(target.to_string()));
        }
        let Some(host) = url.host_str().map(normalize_host) else {
            return Err(ProxyError::InvalidTarget(target.to_string()));
        };

        let suffix = self.trusted_suffix.as_str();
        let trusted = !suffix.is_empty()
            && (host == suffix
                || host
                    .strip_suffix(suffix)
                    .is_some_and(|rest| rest.ends_with('.')));
        let own = self.own_hosts.iter().any(|own| *own == host);
        let loopback = host == self.loopback_host;

        if trusted || own || loopback {
            Ok(url)
        } else {
            Err(ProxyError::Forbidden { host })
        }
    }
}

fn normalize_host(host: &str) -> String {
    host.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// Drops the `:port` from a `host[:port]` value, keeping IPv6 brackets.
fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return host.find(']').map_or(host, |end| &host[..=end]);
    }
    host.rsplit_once(':').map_or(host, |(name, _)| name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_trusted_suffix_and_subdomains_pass() {
        let allowlist = HostAllowlist::default();
        for target in [
            "https://res.cloudinary.com/demo/raw/upload/a.pdf",
            "https://cloudinary.com/a.pdf",
            "http://RES.Cloudinary.COM./a.pdf",
        ] {
            assert!(allowlist.check(target).is_ok(), "{target}");
        }
    }

    #[test]
    fn test_suffix_requires_label_boundary() {
        let allowlist = HostAllowlist::default();
        let error = allowlist
            .check("https://evilcloudinary.com/a.pdf")
            .unwrap_err();
        assert!(matches!(error, ProxyError::Forbidden { .. }));
    }

    #[test]
    fn test_foreign_host_forbidden() {
        let allowlist = HostAllowlist::default().with_own_hosts(["api.filhaal.org"]);
        let error = allowlist
            .check("https://evil.example.com/a.pdf")
            .unwrap_err();
        match error {
            ProxyError::Forbidden { host } => assert_eq!(host, "evil.example.com"),
            other => panic!("expected forbidden, got {other:?}"),
        }
    }

    #[test]
    fn test_own_hosts_pass_with_or_without_port() {
        let allowlist =
            HostAllowlist::default().with_own_hosts(["api.filhaal.org:5000", "[::1]:5000", " "]);
        assert!(allowlist.check("http://api.filhaal.org/files/a.pdf").is_ok());
        assert!(allowlist.check("http://API.filhaal.org:8443/a.pdf").is_ok());
        assert!(allowlist.check("http://[::1]:8080/a.pdf").is_ok());
        assert!(allowlist.check("http://filhaal.org/a.pdf").is_err());
    }

    #[test]
    fn test_metadata_address_forbidden_without_configuration() {
        let allowlist = HostAllowlist::default().with_own_hosts(["api.filhaal.org"]);
        let error = allowlist
            .check("http://169.254.169.254/latest/meta-data/iam")
            .unwrap_err();
        assert!(matches!(error, ProxyError::Forbidden { .. }));
    }

    #[test]
    fn test_loopback_host_passes() {
        let allowlist = HostAllowlist::default();
        assert!(allowlist.check("http://localhost:3000/a.pdf").is_ok());
        assert!(allowlist.check("http://127.0.0.1/a.pdf").is_err());
    }

    #[test]
    fn test_unparseable_and_non_http_targets_invalid() {
        let allowlist = HostAllowlist::default();
        for target in ["not a url", "file:///etc/passwd", "ftp://res.cloudinary.com/a.pdf"] {
            assert!(
                matches!(
                    allowlist.check(target),
                    Err(ProxyError::InvalidTarget(_))
                ),
                "{target}"
            );
        }
    }

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("example.com:80"), "example.com");
        assert_eq!(strip_port("example.com"), "example.com");
        assert_eq!(strip_port("[::1]:80"), "[::1]");
    }
}
