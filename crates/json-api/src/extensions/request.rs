//! Request helper extensions.

use salvo::{conn::SocketAddr, prelude::Request};

const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

pub(crate) trait RequestExt {
    /// Identify the caller for rate limiting.
    ///
    /// With no trusted proxies this is the socket's IP address and `X-Forwarded-For`
    /// is ignored. Behind `trusted_proxy_hops` proxies that each append to the header,
    /// it is the entry the outermost proxy wrote; anything left of it came from the
    /// client.
    fn client_key(&self, trusted_proxy_hops: usize) -> String;
}

impl RequestExt for Request {
    fn client_key(&self, trusted_proxy_hops: usize) -> String {
        if trusted_proxy_hops > 0
            && let Some(hop) = self
                .header::<String>(FORWARDED_FOR_HEADER)
                .and_then(|header| forwarded_hop(&header, trusted_proxy_hops))
        {
            return hop;
        }

        socket_key(self.remote_addr())
    }
}

fn forwarded_hop(header: &str, trusted_proxy_hops: usize) -> Option<String> {
    let hops: Vec<&str> = header.split(',').map(str::trim).collect();
    let index = hops.len().saturating_sub(trusted_proxy_hops);

    hops.get(index)
        .filter(|hop| !hop.is_empty())
        .map(ToString::to_string)
}

// Port excluded: every new connection gets a fresh one.
fn socket_key(addr: &SocketAddr) -> String {
    addr.ip()
        .map_or_else(|| addr.to_string(), |ip| ip.to_string())
}
