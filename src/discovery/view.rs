use super::endpoint::Endpoint;
use super::kind::ServiceKind;
use dashmap::DashMap;
use std::fmt;
use tracing::debug;

/// Comparison input that cannot be lined up position by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComparisonError {
    /// The fresh list has an entry at `index` the stable list does not.
    MissingBaseline { index: usize },
}

impl fmt::Display for ComparisonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonError::MissingBaseline { index } => {
                write!(f, "stable view has no entry at index {}", index)
            }
        }
    }
}

impl std::error::Error for ComparisonError {}

/// Up-only subset of a raw snapshot, order preserved.
pub fn compute_active(raw: &[Endpoint]) -> Vec<Endpoint> {
    raw.iter().filter(|e| e.is_up()).cloned().collect()
}

/// Positional identity comparison of a freshly computed view against the
/// stable one.
///
/// An empty side means there is no baseline and always counts as changed.
/// Only `(address, port)` is compared. A fresh list that runs past the end of
/// the stable list is malformed input and reported as an error; callers treat
/// it as changed.
pub fn detect_change(fresh: &[Endpoint], stable: &[Endpoint]) -> Result<bool, ComparisonError> {
    if fresh.is_empty() || stable.is_empty() {
        return Ok(true);
    }
    for (index, new) in fresh.iter().enumerate() {
        let old = stable
            .get(index)
            .ok_or(ComparisonError::MissingBaseline { index })?;
        if !old.same_identity(&new.address, new.port) {
            return Ok(true);
        }
    }
    Ok(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewDecision {
    Adopted,
    Kept,
}

#[derive(Debug, Default)]
struct KindView {
    /// Served list; rotated by selection, shrunk by failover.
    active: Vec<Endpoint>,
    /// Baseline for change detection; never rotated.
    stable: Vec<Endpoint>,
}

impl KindView {
    fn reconcile(&mut self, kind: ServiceKind, fresh: Vec<Endpoint>) -> ViewDecision {
        let changed = match detect_change(&fresh, &self.stable) {
            Ok(changed) => changed,
            Err(e) => {
                debug!(
                    "view: comparison failed, adopting fresh view, kind={}, error={}",
                    kind, e
                );
                true
            }
        };

        if !changed {
            self.active
                .retain(|ep| fresh.iter().any(|f| f.same_identity(&ep.address, ep.port)));
            // Unchanged but shorter means a positional prefix: narrow the
            // baseline so endpoints that come back register as growth.
            if fresh.len() < self.stable.len() {
                debug!(
                    "view: baseline narrowed, kind={}, endpoints={}->{}",
                    kind,
                    self.stable.len(),
                    fresh.len()
                );
                self.stable = fresh.clone();
            }
            if !self.active.is_empty() || fresh.is_empty() {
                return ViewDecision::Kept;
            }
        }

        if !fresh.is_empty() {
            debug!(
                "view: adopted fresh view, kind={}, endpoints={}",
                kind,
                fresh.len()
            );
            metrics::counter!("locator_view_adopted_total", "kind" => kind.as_str()).increment(1);
        }
        self.active = fresh.clone();
        self.stable = fresh;
        ViewDecision::Adopted
    }
}

/// Per-kind active/stable views.
///
/// Each kind's views sit behind one shard lock, so reconciliation and the
/// selection that follows it happen atomically.
#[derive(Default)]
pub struct ActiveViewCache {
    views: DashMap<ServiceKind, KindView>,
}

impl ActiveViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile `kind` against `fresh` and run `f` on the resulting active
    /// list while still holding the lock.
    pub fn with_active<R>(
        &self,
        kind: ServiceKind,
        fresh: Vec<Endpoint>,
        f: impl FnOnce(&mut Vec<Endpoint>) -> R,
    ) -> R {
        let mut view = self.views.entry(kind).or_default();
        view.reconcile(kind, fresh);
        f(&mut view.active)
    }

    /// Reconcile and return a copy of the resulting active list.
    pub fn get_active(&self, kind: ServiceKind, fresh: Vec<Endpoint>) -> Vec<Endpoint> {
        self.with_active(kind, fresh, |active| active.clone())
    }

    /// Reconcile and report whether the fresh view replaced the old one.
    pub fn reconcile(&self, kind: ServiceKind, fresh: Vec<Endpoint>) -> ViewDecision {
        self.views.entry(kind).or_default().reconcile(kind, fresh)
    }

    /// Current stable baseline, without reconciling.
    pub fn stable(&self, kind: ServiceKind) -> Vec<Endpoint> {
        self.views
            .get(&kind)
            .map(|v| v.stable.clone())
            .unwrap_or_default()
    }
}
