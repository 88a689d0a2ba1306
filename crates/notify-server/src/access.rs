//! IP allowlist guarding the notification endpoints.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::error::ServerError;
use crate::state::AppState;

/// A single address or a CIDR range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IpRange {
    network: IpAddr,
    prefix: u8,
}

impl IpRange {
    pub fn new(addr: IpAddr, prefix: u8) -> Result<Self, String> {
        let max = max_prefix(&addr);
        if prefix > max {
            return Err(format!("prefix length {prefix} exceeds {max}"));
        }
        Ok(Self {
            network: mask(addr, prefix),
            prefix,
        })
    }

    /// Range matching exactly one address.
    pub fn host(addr: IpAddr) -> Self {
        Self {
            network: addr,
            prefix: max_prefix(&addr),
        }
    }

    pub fn contains(&self, addr: IpAddr) -> bool {
        let addr = match (self.network, addr) {
            (IpAddr::V4(_), IpAddr::V6(v6)) => match v6.to_ipv4_mapped() {
                Some(v4) => IpAddr::V4(v4),
                None => return false,
            },
            _ => addr,
        };
        match (self.network, addr) {
            (IpAddr::V4(_), IpAddr::V4(_)) | (IpAddr::V6(_), IpAddr::V6(_)) => {
                mask(addr, self.prefix) == self.network
            }
            _ => false,
        }
    }
}

fn max_prefix(addr: &IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

fn mask(addr: IpAddr, prefix: u8) -> IpAddr {
    match addr {
        IpAddr::V4(v4) => {
            let bits = u32::from(v4);
            let m = u32::MAX.checked_shl(32 - u32::from(prefix)).unwrap_or(0);
            IpAddr::V4((bits & m).into())
        }
        IpAddr::V6(v6) => {
            let bits = u128::from(v6);
            let m = u128::MAX.checked_shl(128 - u32::from(prefix)).unwrap_or(0);
            IpAddr::V6((bits & m).into())
        }
    }
}

impl FromStr for IpRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once('/') {
            Some((addr, prefix)) => {
                let addr: IpAddr = addr
                    .parse()
                    .map_err(|e| format!("invalid address {addr:?}: {e}"))?;
                let prefix: u8 = prefix
                    .parse()
                    .map_err(|e| format!("invalid prefix {prefix:?}: {e}"))?;
                Self::new(addr, prefix)
            }
            None => s
                .parse()
                .map(Self::host)
                .map_err(|e| format!("invalid address {s:?}: {e}")),
        }
    }
}

impl TryFrom<String> for IpRange {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<IpRange> for String {
    fn from(r: IpRange) -> Self {
        r.to_string()
    }
}

impl fmt::Display for IpRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

/// Addresses and ranges permitted to call the notification endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllowList(Vec<IpRange>);

impl AllowList {
    pub fn new(ranges: Vec<IpRange>) -> Self {
        Self(ranges)
    }

    /// Parse a comma- or whitespace-separated list.
    pub fn parse_list(s: &str) -> Result<Self, String> {
        s.split(|c: char| c == ',' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    pub fn allows(&self, addr: IpAddr) -> bool {
        self.0.iter().any(|r| r.contains(addr))
    }

    pub fn ranges(&self) -> &[IpRange] {
        &self.0
    }
}

impl Default for AllowList {
    fn default() -> Self {
        Self(vec![IpRange {
            network: IpAddr::from([0, 0, 0, 0]),
            prefix: 0,
        }])
    }
}

/// Middleware refusing callers outside the allowlist before any parsing.
pub async fn filter_ips(
    State(state): State<Arc<AppState>>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let ip = remote.ip();
    if state.config.allow_access_from.allows(ip) {
        next.run(request).await
    } else {
        tracing::warn!(%ip, path = %request.uri().path(), "notification from non-allowlisted address");
        ServerError::Forbidden(ip.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn parse_ranges() {
        let r: IpRange = "10.0.0.0/8".parse().unwrap();
        assert_eq!(r.to_string(), "10.0.0.0/8");
        let host: IpRange = "192.168.1.5".parse().unwrap();
        assert_eq!(host.to_string(), "192.168.1.5/32");
        let masked: IpRange = "10.1.2.3/16".parse().unwrap();
        assert_eq!(masked.to_string(), "10.1.0.0/16");
        assert!("10.0.0.0/33".parse::<IpRange>().is_err());
        assert!("not-an-ip".parse::<IpRange>().is_err());
    }

    #[test]
    fn containment() {
        let r: IpRange = "10.0.0.0/8".parse().unwrap();
        assert!(r.contains(ip("10.255.1.1")));
        assert!(!r.contains(ip("11.0.0.1")));
        assert!(r.contains(ip("::ffff:10.0.0.1")));
        assert!(!r.contains(ip("fe80::1")));

        let v6: IpRange = "fd00::/8".parse().unwrap();
        assert!(v6.contains(ip("fd12::1")));
        assert!(!v6.contains(ip("10.0.0.1")));
    }

    #[test]
    fn default_allows_any_ipv4() {
        let list = AllowList::default();
        assert!(list.allows(ip("127.0.0.1")));
        assert!(list.allows(ip("203.0.113.9")));
    }

    #[test]
    fn list_parsing_and_checks() {
        let list = AllowList::parse_list("127.0.0.1, 10.0.0.0/8 192.168.0.0/16").unwrap();
        assert_eq!(list.ranges().len(), 3);
        assert!(list.allows(ip("127.0.0.1")));
        assert!(list.allows(ip("192.168.4.4")));
        assert!(!list.allows(ip("172.16.0.1")));
        assert!(AllowList::parse_list("127.0.0.1,bogus").is_err());
    }

    #[test]
    fn serde_as_strings() {
        let list: AllowList = serde_json::from_str(r#"["127.0.0.1", "10.0.0.0/8"]"#).unwrap();
        assert_eq!(
            serde_json::to_value(&list).unwrap(),
            serde_json::json!(["127.0.0.1/32", "10.0.0.0/8"])
        );
    }
}
