//! Request extractors.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use tracking_core::ClientMetadata;

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Client attributes taken from request headers.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta(pub ClientMetadata);

impl ClientMeta {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        // First hop of X-Forwarded-For, then X-Real-IP
        let ip_address = header_str(headers, "X-Forwarded-For")
            .and_then(|xff| xff.split(',').next())
            .map(|ip| ip.trim().to_string())
            .filter(|ip| !ip.is_empty())
            .or_else(|| header_str(headers, "X-Real-IP").map(str::to_string));

        let user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|h| h.to_str().ok())
            .filter(|ua| !ua.trim().is_empty())
            .map(str::to_string);

        // "XX" and "T1" are Cloudflare's unknown and Tor markers
        let country = header_str(headers, "CF-IPCountry")
            .or_else(|| header_str(headers, "X-Country-Code"))
            .filter(|c| !matches!(*c, "XX" | "T1"))
            .map(str::to_ascii_uppercase);

        Self(ClientMetadata {
            ip_address,
            user_agent,
            country,
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientMeta
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}
