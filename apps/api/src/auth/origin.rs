use std::convert::Infallible;
use std::fmt;
use std::net::SocketAddr;

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRef, FromRequestParts},
    http::request::Parts,
};

/// Whether `X-Forwarded-For` comes from a reverse proxy we control.
///
/// Without a proxy the header is client-supplied, so it is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProxyTrust(pub bool);

/// Network origin of the caller, recorded in audit logs only.
///
/// With `ProxyTrust(true)` the first `X-Forwarded-For` hop wins; otherwise
/// (and when the header is absent) the socket peer address, then `unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOrigin(pub String);

impl fmt::Display for ClientOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl ClientOrigin {
    pub fn from_parts(parts: &Parts, trust: ProxyTrust) -> Self {
        if trust.0 {
            let forwarded = parts
                .headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty());
            if let Some(hop) = forwarded {
                return ClientOrigin(hop.to_string());
            }
        }

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());
        ClientOrigin(peer.unwrap_or_else(|| "unknown".to_string()))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientOrigin
where
    ProxyTrust: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientOrigin::from_parts(parts, ProxyTrust::from_ref(state)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn origin_of(request: Request<()>, trust: ProxyTrust) -> ClientOrigin {
        let (mut parts, _) = request.into_parts();
        ClientOrigin::from_request_parts(&mut parts, &trust)
            .await
            .unwrap()
    }

    fn forwarded_request() -> Request<()> {
        let mut request = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([198, 51, 100, 4], 5555))));
        request
    }

    #[tokio::test]
    async fn test_trusted_proxy_uses_first_forwarded_hop() {
        let origin = origin_of(forwarded_request(), ProxyTrust(true)).await;
        assert_eq!(origin.0, "203.0.113.7");
    }

    #[tokio::test]
    async fn test_untrusted_forwarded_header_is_ignored() {
        let origin = origin_of(forwarded_request(), ProxyTrust(false)).await;
        assert_eq!(origin.0, "198.51.100.4");
    }

    #[tokio::test]
    async fn test_falls_back_to_peer_address() {
        let mut request = Request::builder().body(()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([198, 51, 100, 4], 5555))));
        assert_eq!(origin_of(request, ProxyTrust(true)).await.0, "198.51.100.4");
    }

    #[tokio::test]
    async fn test_unknown_without_any_source() {
        let request = Request::builder().body(()).unwrap();
        assert_eq!(origin_of(request, ProxyTrust(false)).await.0, "unknown");
    }
}
