//! Busy/idle tracking per operation scope.
//!
//! A scope is the global scope, one category, or one workflow overlay
//! (create, edit, delete, ...). Each scope carries a manually set state and
//! a list of in-flight tracked operations; it is busy while either says so.
//! Tracked operations are reference counted, so two overlapping operations
//! on one scope keep it busy until both have finished.

use super::error::CoordinatorError;
use super::keys::{CategoryKey, Enumeration};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use uuid::Uuid;

const GLOBAL_SCOPE_NAME: &str = "GLOBAL";

/// Granularity at which a loading flag is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope<C, W> {
    Global,
    Category(C),
    Workflow(W),
}

impl<C: CategoryKey, W: Enumeration> Scope<C, W> {
    /// Name used by [`LoadingTracker::is_operation_loading`].
    pub fn name(&self) -> &'static str {
        match self {
            Scope::Global => GLOBAL_SCOPE_NAME,
            Scope::Category(category) => category.key(),
            Scope::Workflow(workflow) => workflow.key(),
        }
    }

    /// Every configured scope: global, then categories, then workflows.
    pub fn all() -> Vec<Self> {
        std::iter::once(Scope::Global)
            .chain(C::ALL.iter().copied().map(Scope::Category))
            .chain(W::ALL.iter().copied().map(Scope::Workflow))
            .collect()
    }

    fn slot(&self) -> usize {
        match self {
            Scope::Global => 0,
            Scope::Category(category) => 1 + category.index(),
            Scope::Workflow(workflow) => 1 + C::count() + workflow.index(),
        }
    }

    fn slot_count() -> usize {
        1 + C::count() + W::count()
    }
}

impl<C: CategoryKey, W: Enumeration> fmt::Display for Scope<C, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses `GLOBAL`, a category key or a workflow key. Category keys win when
/// a key exists in both enumerations.
impl<C: CategoryKey, W: Enumeration> FromStr for Scope<C, W> {
    type Err = CoordinatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case(GLOBAL_SCOPE_NAME) {
            return Ok(Scope::Global);
        }
        if let Ok(category) = C::from_key(trimmed) {
            return Ok(Scope::Category(category));
        }
        if let Ok(workflow) = W::from_key(trimmed) {
            return Ok(Scope::Workflow(workflow));
        }
        Err(CoordinatorError::UnknownScope(trimmed.to_string()))
    }
}

/// A scope plus an optional human readable label ("Saving baptism").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationKey<C, W> {
    pub scope: Scope<C, W>,
    pub label: Option<String>,
}

impl<C, W> OperationKey<C, W> {
    pub fn new(scope: Scope<C, W>) -> Self {
        Self { scope, label: None }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl<C, W> From<Scope<C, W>> for OperationKey<C, W> {
    fn from(scope: Scope<C, W>) -> Self {
        OperationKey::new(scope)
    }
}

/// Busy state of one scope as seen by rendering code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadingState<I> {
    pub busy: bool,
    pub label: Option<String>,
    pub record_id: Option<I>,
}

impl<I> Default for LoadingState<I> {
    fn default() -> Self {
        Self {
            busy: false,
            label: None,
            record_id: None,
        }
    }
}

impl<I> LoadingState<I> {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn busy(label: Option<String>, record_id: Option<I>) -> Self {
        Self {
            busy: true,
            label,
            record_id,
        }
    }
}

/// Unique id of one begun operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId(pub Uuid);

impl OperationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

/// An operation that has begun and not yet ended.
#[derive(Debug, Clone)]
pub struct ActiveOperation<C, W, I> {
    pub id: OperationId,
    pub scope: Scope<C, W>,
    pub label: Option<String>,
    pub record_id: Option<I>,
    pub started_at: Instant,
}

impl<C, W, I> ActiveOperation<C, W, I> {
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

#[derive(Debug)]
struct TrackerInner<C, W, I> {
    manual: Vec<LoadingState<I>>,
    active: Vec<ActiveOperation<C, W, I>>,
}

/// Shared handle to the loading table of one screen.
///
/// Cloning the handle shares the table, so an async operation can keep its
/// scope busy while rendering code reads other scopes.
#[derive(Debug, Clone)]
pub struct LoadingTracker<C, W, I> {
    inner: Arc<Mutex<TrackerInner<C, W, I>>>,
    slow_threshold: Option<Duration>,
}

impl<C, W, I> Default for LoadingTracker<C, W, I>
where
    C: CategoryKey,
    W: Enumeration,
    I: Clone + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<C, W, I> LoadingTracker<C, W, I>
where
    C: CategoryKey,
    W: Enumeration,
    I: Clone + fmt::Debug,
{
    pub fn new() -> Self {
        let manual = (0..Scope::<C, W>::slot_count())
            .map(|_| LoadingState::idle())
            .collect();

        Self {
            inner: Arc::new(Mutex::new(TrackerInner {
                manual,
                active: Vec::new(),
            })),
            slow_threshold: None,
        }
    }

    /// Log a warning for tracked operations that take longer than `threshold`.
    pub fn with_slow_operation_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = Some(threshold);
        self
    }

    /// Replace the manually set state of `scope`. Last writer wins; tracked
    /// operations on the scope are unaffected, so a scope with operations in
    /// flight stays busy even after its manual state is set idle.
    pub fn set_state(&self, scope: Scope<C, W>, state: LoadingState<I>) {
        debug!(
            "Loading state set: scope={} busy={} label={:?}",
            scope, state.busy, state.label
        );
        self.lock().manual[scope.slot()] = state;
    }

    /// Shorthand for [`LoadingTracker::set_state`] without a record id. Setting
    /// `busy = false` does not end tracked operations still in flight.
    pub fn set_loading(&self, scope: Scope<C, W>, busy: bool, label: Option<String>) {
        self.set_state(
            scope,
            LoadingState {
                busy,
                label,
                record_id: None,
            },
        );
    }

    /// Effective state of `scope`. While tracked operations are in flight the
    /// label and record id come from the most recently begun one.
    pub fn state(&self, scope: Scope<C, W>) -> LoadingState<I> {
        let inner = self.lock();
        match inner.active.iter().rev().find(|op| op.scope == scope) {
            Some(op) => LoadingState::busy(op.label.clone(), op.record_id.clone()),
            None => inner.manual[scope.slot()].clone(),
        }
    }

    pub fn is_loading(&self, scope: Scope<C, W>) -> bool {
        let inner = self.lock();
        inner.manual[scope.slot()].busy || inner.active.iter().any(|op| op.scope == scope)
    }

    /// Number of tracked operations currently running on `scope`.
    pub fn in_flight(&self, scope: Scope<C, W>) -> usize {
        self.lock()
            .active
            .iter()
            .filter(|op| op.scope == scope)
            .count()
    }

    /// True iff the global scope, any category or any workflow is busy.
    pub fn is_any_loading(&self) -> bool {
        let inner = self.lock();
        !inner.active.is_empty() || inner.manual.iter().any(|state| state.busy)
    }

    /// True iff a busy scope's name or label contains `needle`.
    pub fn is_operation_loading(&self, needle: &str) -> bool {
        let mentions = |name: &str, label: Option<&String>| {
            name.contains(needle) || label.is_some_and(|label| label.contains(needle))
        };

        let inner = self.lock();
        let active = inner
            .active
            .iter()
            .any(|op| mentions(op.scope.name(), op.label.as_ref()));
        let manual = Scope::<C, W>::all().into_iter().any(|scope| {
            let state = &inner.manual[scope.slot()];
            state.busy && mentions(scope.name(), state.label.as_ref())
        });
        active || manual
    }

    /// Busy scopes in configuration order.
    pub fn busy_scopes(&self) -> Vec<Scope<C, W>> {
        Scope::all()
            .into_iter()
            .filter(|scope| self.is_loading(*scope))
            .collect()
    }

    pub fn active_operations(&self) -> Vec<ActiveOperation<C, W, I>> {
        self.lock().active.clone()
    }

    /// Reset every scope to idle. Operations still running release nothing
    /// when they end.
    pub fn clear_all(&self) {
        let mut inner = self.lock();
        let abandoned = inner.active.len();
        inner.active.clear();
        for state in inner.manual.iter_mut() {
            *state = LoadingState::idle();
        }
        drop(inner);

        if abandoned > 0 {
            debug!("Cleared loading table with {} operations in flight", abandoned);
        } else {
            debug!("Cleared loading table");
        }
    }

    /// Mark `op.scope` busy until the returned guard ends or is dropped.
    pub fn begin(&self, op: OperationKey<C, W>, record_id: Option<I>) -> LoadingGuard<C, W, I> {
        let id = OperationId::new();
        debug!("Operation begun: scope={} label={:?}", op.scope, op.label);

        self.lock().active.push(ActiveOperation {
            id,
            scope: op.scope,
            label: op.label,
            record_id,
            started_at: Instant::now(),
        });

        LoadingGuard {
            tracker: self.clone(),
            id: Some(id),
        }
    }

    /// Run `f` with its scope marked busy.
    ///
    /// The scope is released exactly once whether the future succeeds,
    /// fails, panics or is dropped before completion. A failure is returned
    /// unchanged. A future that never completes keeps its scope busy.
    pub async fn run_with_tracking<F, Fut, T, E>(
        &self,
        op: OperationKey<C, W>,
        record_id: Option<I>,
        f: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let scope = op.scope;
        let guard = self.begin(op, record_id);
        let result = f().await;
        guard.end();

        if result.is_err() {
            debug!("Tracked operation on {} failed, scope released", scope);
        }
        result
    }

    fn finish(&self, id: OperationId) {
        let mut inner = self.lock();
        let Some(position) = inner.active.iter().position(|op| op.id == id) else {
            debug!("Operation {:?} ended after the table was cleared", id.0);
            return;
        };
        let op = inner.active.remove(position);
        drop(inner);

        let elapsed = op.elapsed();
        debug!(
            "Operation ended: scope={} label={:?} elapsed_ms={}",
            op.scope,
            op.label,
            elapsed.as_millis()
        );
        if self.is_slow(elapsed) {
            warn!(
                "Slow operation on {} ({:?}): {}ms",
                op.scope,
                op.label.as_deref().unwrap_or("unlabelled"),
                elapsed.as_millis()
            );
        }
    }

    /// Whether an operation that took `elapsed` crosses the slow threshold.
    pub fn is_slow(&self, elapsed: Duration) -> bool {
        self.slow_threshold.is_some_and(|threshold| elapsed > threshold)
    }

    fn lock(&self) -> MutexGuard<'_, TrackerInner<C, W, I>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Ends its operation when [`LoadingGuard::end`] is called or when dropped.
#[must_use = "dropping the guard ends the operation immediately"]
#[derive(Debug)]
pub struct LoadingGuard<C, W, I>
where
    C: CategoryKey,
    W: Enumeration,
    I: Clone + fmt::Debug,
{
    tracker: LoadingTracker<C, W, I>,
    id: Option<OperationId>,
}

impl<C, W, I> LoadingGuard<C, W, I>
where
    C: CategoryKey,
    W: Enumeration,
    I: Clone + fmt::Debug,
{
    pub fn id(&self) -> Option<OperationId> {
        self.id
    }

    pub fn end(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(id) = self.id.take() {
            self.tracker.finish(id);
        }
    }
}

impl<C, W, I> Drop for LoadingGuard<C, W, I>
where
    C: CategoryKey,
    W: Enumeration,
    I: Clone + fmt::Debug,
{
    fn drop(&mut self) {
        self.release();
    }
}
