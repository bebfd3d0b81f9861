//! Client identity extractor for rate limiting.
//!
//! Resolves the key a request is counted under:
//! - the first hop of `X-Forwarded-For`, only when `server.trust_forwarded_for`
//!   is set (the relay sits behind a proxy that overwrites the header)
//! - otherwise the peer address from `ConnectInfo`
//! - otherwise `unknown`, so all unidentifiable callers share one budget

use std::convert::Infallible;
use std::fmt;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;

use crate::state::AppState;

/// Identity of the calling client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    pub const UNKNOWN: &'static str = "unknown";

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_parts(parts: &Parts, trust_forwarded_for: bool) -> Self {
        if trust_forwarded_for {
            if let Some(forwarded) = parts
                .headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty())
            {
                return Self(forwarded.to_string());
            }
        }

        if let Some(ConnectInfo(addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
            return Self(addr.ip().to_string());
        }

        Self(Self::UNKNOWN.to_string())
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromRequestParts<AppState> for ClientIdentity {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(
            parts,
            state.config.server.trust_forwarded_for,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_of(request: Request<()>) -> Parts {
        request.into_parts().0
    }

    fn proxied_parts() -> Parts {
        let mut parts = parts_of(
            Request::builder()
                .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
                .body(())
                .unwrap(),
        );
        parts
            .extensions
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 5000))));
        parts
    }

    #[test]
    fn test_forwarded_for_ignored_by_default() {
        let parts = proxied_parts();
        assert_eq!(ClientIdentity::from_parts(&parts, false).as_str(), "127.0.0.1");
    }

    #[test]
    fn test_forwarded_for_first_hop_when_trusted() {
        let parts = proxied_parts();
        assert_eq!(ClientIdentity::from_parts(&parts, true).as_str(), "203.0.113.7");
    }

    #[test]
    fn test_peer_address_without_proxy_header() {
        let mut parts = parts_of(Request::builder().body(()).unwrap());
        parts
            .extensions
            .insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 20], 40000))));

        assert_eq!(ClientIdentity::from_parts(&parts, true).as_str(), "192.168.1.20");
    }

    #[test]
    fn test_unknown_when_nothing_available() {
        let parts = parts_of(Request::builder().header("x-forwarded-for", " ").body(()).unwrap());
        assert_eq!(
            ClientIdentity::from_parts(&parts, true).as_str(),
            ClientIdentity::UNKNOWN
        );
    }
}
