use super::endpoint::Endpoint;
use super::kind::ServiceKind;

/// Pick the next endpoint from `active`.
///
/// Rotating kinds move the head to the tail and return it. The DNS kind
/// returns the head and leaves the list untouched.
pub fn select_next(kind: ServiceKind, active: &mut Vec<Endpoint>) -> Option<Endpoint> {
    if active.is_empty() {
        return None;
    }
    if !kind.rotates() {
        return active.first().cloned();
    }
    active.rotate_left(1);
    active.last().cloned()
}
