use std::{convert::Infallible, net::SocketAddr};

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, request::Parts},
};

use crate::domain::analytics::UNKNOWN_IP;

const FORWARDED_FOR: &str = "x-forwarded-for";
const REAL_IP: &str = "x-real-ip";

/// Best-effort client address: proxy headers first, then the socket peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(Self(resolve_client_ip(&parts.headers, peer)))
    }
}

pub fn resolve_client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = header_str(headers, FORWARDED_FOR)
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    if let Some(ip) = header_str(headers, REAL_IP).filter(|ip| !ip.is_empty()) {
        return ip.to_string();
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_IP.to_string())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    fn peer() -> Option<SocketAddr> {
        Some("10.1.2.3:54321".parse().expect("socket addr"))
    }

    #[test]
    fn forwarded_for_wins() {
        let map = headers(&[
            ("x-forwarded-for", " 192.168.1.1 , 10.0.0.1"),
            ("x-real-ip", "192.168.1.2"),
        ]);
        assert_eq!(resolve_client_ip(&map, peer()), "192.168.1.1");
    }

    #[test]
    fn real_ip_then_peer_then_unknown() {
        let map = headers(&[("x-real-ip", "192.168.1.2")]);
        assert_eq!(resolve_client_ip(&map, peer()), "192.168.1.2");

        let map = headers(&[("x-forwarded-for", " , 10.0.0.1")]);
        assert_eq!(resolve_client_ip(&map, peer()), "10.1.2.3");

        assert_eq!(resolve_client_ip(&HeaderMap::new(), None), "unknown");
    }
}
