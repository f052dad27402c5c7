//! Private address guard
//!
//! Optional check that keeps the proxy from being pointed at the machine
//! it runs on or its local network. Only literal hosts are inspected; a
//! public name that resolves to a private address is not caught.

use std::net::{Ipv4Addr, Ipv6Addr};
use url::{Host, Url};

/// Return the offending host if `url` targets a local or private address
pub fn private_host(url: &Url) -> Option<String> {
    let host = url.host()?;
    let blocked = match &host {
        Host::Domain(name) => is_localhost_name(name),
        Host::Ipv4(ip) => is_private_v4(*ip),
        Host::Ipv6(ip) => is_private_v6(*ip),
    };
    blocked.then(|| host.to_string())
}

fn is_localhost_name(name: &str) -> bool {
    let name = name.trim_end_matches('.');
    name.eq_ignore_ascii_case("localhost")
        || name
            .rsplit_once('.')
            .is_some_and(|(_, tld)| tld.eq_ignore_ascii_case("localhost"))
}

const fn is_private_v4(ip: Ipv4Addr) -> bool {
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
}

fn is_private_v6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_private_v4(v4);
    }
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        // fc00::/7 unique local
        || (first & 0xfe00) == 0xfc00
        // fe80::/10 link local
        || (first & 0xffc0) == 0xfe80
}
