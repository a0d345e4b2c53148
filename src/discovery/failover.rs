use super::endpoint::{Endpoint, RequestTarget};

/// Evict the endpoint `target` points at and redirect `target` to the new
/// head of `active`.
///
/// Returns `false` and leaves `target` alone when the endpoint is not in the
/// pool or the pool has no alternative to offer.
pub fn reselect_after_failure(active: &mut Vec<Endpoint>, target: &mut RequestTarget) -> bool {
    if active.len() <= 1 {
        return false;
    }
    let Some(index) = active
        .iter()
        .position(|ep| ep.same_identity(&target.url, target.port))
    else {
        return false;
    };

    active.remove(index);
    // len was >= 2, so a head remains.
    let head = &active[0];
    target.url = head.address.clone();
    target.port = head.port;
    true
}
