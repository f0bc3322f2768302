//! Latency ranking of a finished result set

use crate::proxy::models::ValidProxy;

/// Sort by ascending response time. The sort is stable, so equally fast
/// proxies keep the order they were found in.
pub fn rank(mut proxies: Vec<ValidProxy>) -> Vec<ValidProxy> {
    proxies.sort_by_key(|proxy| proxy.response_time);
    proxies
}
