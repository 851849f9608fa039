use ipnetwork::IpNetwork;
use std::net::IpAddr;

/// Collapses IPv4-mapped IPv6 (`::ffff:1.2.3.4`) to plain IPv4.
pub fn normalize(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6
            .to_ipv4_mapped()
            .map(IpAddr::V4)
            .unwrap_or(IpAddr::V6(v6)),
        v4 => v4,
    }
}

/// Parses an allow-list entry; a bare address is a single-host network.
pub fn parse_network(raw: &str) -> Result<IpNetwork, ipnetwork::IpNetworkError> {
    raw.trim().parse()
}

/// Matches after collapsing IPv4-mapped IPv6, so `::ffff:a.b.c.d` hits IPv4 blocks.
pub fn network_contains(network: &IpNetwork, ip: &IpAddr) -> bool {
    network.contains(normalize(*ip))
}

pub fn parse_ip(raw: &str) -> Option<IpAddr> {
    let raw = raw.trim();
    let candidate = raw
        .strip_prefix("::ffff:")
        .filter(|rest| rest.contains('.'))
        .unwrap_or(raw);
    candidate
        .parse::<IpAddr>()
        .ok()
        .or_else(|| {
            // `1.2.3.4:5678`
            candidate
                .rsplit_once(':')
                .filter(|(host, _)| host.contains('.'))
                .and_then(|(host, _)| host.parse().ok())
        })
        .map(normalize)
}

/// Client address as seen behind a reverse proxy: first `x-forwarded-for`
/// hop, then `x-real-ip`, then the socket peer.
pub fn resolve_client_ip(
    forwarded_for: Option<&str>,
    real_ip: Option<&str>,
    peer: Option<IpAddr>,
    trust_proxy: bool,
) -> Option<IpAddr> {
    if trust_proxy {
        if let Some(ip) = forwarded_for
            .and_then(|v| v.split(',').next())
            .and_then(parse_ip)
        {
            return Some(ip);
        }
        if let Some(ip) = real_ip.and_then(parse_ip) {
            return Some(ip);
        }
    }
    peer.map(normalize)
}

pub fn is_loopback(ip: &IpAddr) -> bool {
    normalize(*ip).is_loopback()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipv4_network_contains() {
        let net = parse_network("200.155.128.0/20").unwrap();
        assert!(network_contains(&net, &"200.155.128.1".parse().unwrap()));
        assert!(network_contains(&net, &"200.155.143.254".parse().unwrap()));
        assert!(!network_contains(&net, &"200.155.144.1".parse().unwrap()));
        assert!(!network_contains(&net, &"::1".parse().unwrap()));
    }

    #[test]
    fn test_single_address_network() {
        let net = parse_network(" 10.0.0.7 ").unwrap();
        assert!(network_contains(&net, &"10.0.0.7".parse().unwrap()));
        assert!(!network_contains(&net, &"10.0.0.8".parse().unwrap()));
    }

    #[test]
    fn test_mapped_ipv6_matches_ipv4_network() {
        let net = parse_network("209.134.48.0/24").unwrap();
        assert!(network_contains(&net, &"::ffff:209.134.48.10".parse().unwrap()));
    }

    #[test]
    fn test_invalid_networks_rejected() {
        assert!(parse_network("300.1.1.1/24").is_err());
        assert!(parse_network("10.0.0.0/33").is_err());
        assert!(parse_network("garbage").is_err());
    }

    #[test]
    fn test_resolve_client_ip_prefers_forwarded_for() {
        let peer = Some("10.1.1.1".parse().unwrap());
        let ip = resolve_client_ip(
            Some("::ffff:209.134.48.10, 10.0.0.2"),
            Some("1.1.1.1"),
            peer,
            true,
        );
        assert_eq!(ip, Some("209.134.48.10".parse().unwrap()));

        let ip = resolve_client_ip(None, Some("1.1.1.1"), peer, true);
        assert_eq!(ip, Some("1.1.1.1".parse().unwrap()));

        let ip = resolve_client_ip(Some("8.8.8.8"), None, peer, false);
        assert_eq!(ip, peer);
    }

    #[test]
    fn test_parse_ip_with_port() {
        assert_eq!(parse_ip("1.2.3.4:8080"), Some("1.2.3.4".parse().unwrap()));
        assert!(is_loopback(&parse_ip("::ffff:127.0.0.1").unwrap()));
    }
}
