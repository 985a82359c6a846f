//! Request extractors.

use std::net::SocketAddr;

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use engine_core::TransportContext;

fn header_value(headers: &HeaderMap, name: impl header::AsHeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
}

/// Transport details of the calling client.
///
/// The peer address is only present when the server was started with
/// connect info.
#[derive(Debug, Clone, Default)]
pub struct ClientContext(pub TransportContext);

#[async_trait]
impl<S> FromRequestParts<S> for ClientContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let remote_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Ok(ClientContext(TransportContext {
            forwarded_for: header_value(&parts.headers, "X-Forwarded-For"),
            real_ip: header_value(&parts.headers, "X-Real-IP"),
            remote_addr,
            user_agent: header_value(&parts.headers, header::USER_AGENT),
        }))
    }
}
