//! Endpoint parsing.
//!
//! Accepted forms:
//!
//! - `http://host:8765` or `https://host:8765`
//! - `host:8765` (assumed `http`)
//! - `jdbc:phoenix:thin:url=http://host:8765;serialization=JSON`
//!
//! Thick-driver URLs (`jdbc:phoenix:zk-host:2181`) address ZooKeeper
//! directly and cannot be served over HTTP, so they are rejected.

use crate::error::ClientError;
use reqwest::Url;

const THIN_PREFIX: &str = "jdbc:phoenix:thin:";
const THICK_PREFIX: &str = "jdbc:phoenix:";

/// A parsed Query Server endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Base URL requests are POSTed to.
    pub url: String,
}

impl Endpoint {
    pub fn parse(endpoint: &str) -> Result<Self, ClientError> {
        let trimmed = endpoint.trim();
        let invalid = |reason: &str| ClientError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        };

        if trimmed.is_empty() {
            return Err(invalid("endpoint is empty"));
        }

        if let Some(props) = trimmed.strip_prefix(THIN_PREFIX) {
            let mut url = None;
            for prop in props.split(';').filter(|p| !p.is_empty()) {
                let (key, value) = prop
                    .split_once('=')
                    .ok_or_else(|| invalid("expected key=value properties"))?;
                match key.trim().to_ascii_lowercase().as_str() {
                    "url" => url = Some(value.trim().to_string()),
                    "serialization" if !value.trim().eq_ignore_ascii_case("json") => {
                        return Err(invalid("only serialization=JSON is supported"));
                    }
                    _ => {}
                }
            }
            let url = url.ok_or_else(|| invalid("missing url= property"))?;
            return Self::from_url(&url).map_err(|reason| invalid(&format!("url= {reason}")));
        }

        if trimmed.starts_with(THICK_PREFIX) {
            return Err(invalid(
                "thick-driver URLs are not supported, use the Query Server (jdbc:phoenix:thin:url=...)",
            ));
        }

        if trimmed.contains("://") {
            return Self::from_url(trimmed).map_err(|reason| invalid(&reason));
        }

        Self::from_url(&format!("http://{trimmed}"))
            .map_err(|reason| invalid(&format!("not a host:port ({reason})")))
    }

    fn from_url(raw: &str) -> Result<Self, String> {
        let url = Url::parse(raw).map_err(|e| format!("is not a valid URL: {e}"))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(format!("has unsupported scheme '{}'", url.scheme()));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err("has no host".to_string());
        }
        if url.port() == Some(0) {
            return Err("has port 0".to_string());
        }
        Ok(Self {
            url: url.as_str().trim_end_matches('/').to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_http_url() {
        let ep = Endpoint::parse("http://localhost:8765/").unwrap();
        assert_eq!(ep.url, "http://localhost:8765");
    }

    #[test]
    fn test_parse_host_port() {
        let ep = Endpoint::parse("pqs.example.com:8765").unwrap();
        assert_eq!(ep.url, "http://pqs.example.com:8765");
    }

    #[test]
    fn test_parse_thin_url() {
        let ep =
            Endpoint::parse("jdbc:phoenix:thin:url=https://pqs:8765;serialization=JSON").unwrap();
        assert_eq!(ep.url, "https://pqs:8765");
    }

    #[test]
    fn test_parse_thin_url_without_serialization() {
        let ep = Endpoint::parse("jdbc:phoenix:thin:url=http://pqs:8765").unwrap();
        assert_eq!(ep.url, "http://pqs:8765");
    }

    #[test]
    fn test_reject_protobuf() {
        let err = Endpoint::parse("jdbc:phoenix:thin:url=http://pqs:8765;serialization=PROTOBUF")
            .unwrap_err();
        assert!(err.to_string().contains("serialization=JSON"));
    }

    #[test]
    fn test_reject_thick_url() {
        let err = Endpoint::parse("jdbc:phoenix:localhost:2181:/hbase-unsecure").unwrap_err();
        assert!(err.to_string().contains("thick-driver"));
    }

    #[test]
    fn test_reject_empty_and_bad_scheme() {
        assert!(Endpoint::parse("  ").is_err());
        assert!(Endpoint::parse("ftp://host").is_err());
        assert!(Endpoint::parse("jdbc:phoenix:thin:serialization=JSON").is_err());
    }

    #[test]
    fn test_reject_malformed_urls() {
        for endpoint in [
            "http://bad host:8765",
            "http://:::",
            "a b c",
            "http://host:notaport",
            "http://host:70000",
            "http://host:0",
            "http://",
            "jdbc:phoenix:thin:url=http://x y",
            "jdbc:phoenix:thin:url=ftp://pqs:8765",
        ] {
            let result = Endpoint::parse(endpoint);
            assert!(
                matches!(result, Err(ClientError::InvalidEndpoint { .. })),
                "{endpoint} parsed as {result:?}"
            );
        }
    }

    #[test]
    fn test_parse_keeps_path() {
        let ep = Endpoint::parse("https://gateway.example.com/pqs/").unwrap();
        assert_eq!(ep.url, "https://gateway.example.com/pqs");
    }
}
