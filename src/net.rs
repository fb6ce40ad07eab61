//! IPv4 address policy and socket plumbing
//!
//! GorgZorg refuses to talk to anything outside a private network: both the
//! connect target and the bind address must be dotted-quad IPv4 starting
//! with one of the accepted private prefixes. The check is a literal string
//! prefix match, not CIDR membership, so `10.1.2.3` is rejected on purpose.

use std::net::{Ipv4Addr, TcpStream};

const LOCAL_PREFIXES: [&str; 4] = ["10.0", "127.0.0", "172.16", "192.168"];

/// Accept only valid dotted-quad IPv4 on a private network or loopback.
pub fn is_local_ipv4(addr: &str) -> bool {
    let Ok(ip) = addr.parse::<Ipv4Addr>() else {
        return false;
    };
    if ip.is_unspecified() || ip.is_broadcast() {
        return false;
    }
    LOCAL_PREFIXES.iter().any(|prefix| addr.starts_with(prefix))
}

/// All IPv4 addresses of the local interfaces, via getifaddrs.
#[cfg(unix)]
pub fn local_ipv4_addrs() -> Vec<Ipv4Addr> {
    let mut addrs = Vec::new();
    unsafe {
        let mut ifap: *mut libc::ifaddrs = std::ptr::null_mut();
        if libc::getifaddrs(&mut ifap) != 0 {
            return addrs;
        }
        let mut cursor = ifap;
        while !cursor.is_null() {
            let ifa = &*cursor;
            if !ifa.ifa_addr.is_null() && i32::from((*ifa.ifa_addr).sa_family) == libc::AF_INET {
                let sin = &*(ifa.ifa_addr as *const libc::sockaddr_in);
                addrs.push(Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr)));
            }
            cursor = ifa.ifa_next;
        }
        libc::freeifaddrs(ifap);
    }
    addrs
}

/// Interface enumeration is Unix-only; elsewhere the bind address must be
/// given explicitly.
#[cfg(not(unix))]
pub fn local_ipv4_addrs() -> Vec<Ipv4Addr> {
    Vec::new()
}

/// First non-loopback private address of this host, used when `-z` is given
/// without an explicit bind IP.
pub fn pick_local_ipv4() -> Option<Ipv4Addr> {
    local_ipv4_addrs()
        .into_iter()
        .find(|ip| !ip.is_loopback() && is_local_ipv4(&ip.to_string()))
}

pub fn tune_socket(stream: &TcpStream) {
    let _ = stream.set_nodelay(true);
}
