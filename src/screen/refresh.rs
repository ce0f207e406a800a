//! Directory of per-category refresh callbacks.
//!
//! Child list components register a refetch callback for their category when
//! they mount and drop it when they unmount. The screen controller and
//! mutation handlers ask the registry to refresh a category without knowing
//! how, or whether, that category fetches its data. A failing callback is
//! logged and contained here; it never reaches the caller.

use super::keys::CategoryKey;
use log::{debug, warn};
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Zero-argument refetch callback for one category.
pub type RefreshCallback = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

/// Result of refreshing a single category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshOutcome {
    /// Nothing was registered for the category.
    Skipped,
    Refreshed,
    /// The callback returned an error or panicked; it has been logged.
    Failed,
}

/// Per-category outcomes of a broadcast refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshReport<C> {
    pub refreshed: Vec<C>,
    pub failed: Vec<C>,
    pub skipped: Vec<C>,
}

impl<C> Default for RefreshReport<C> {
    fn default() -> Self {
        Self {
            refreshed: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

impl<C> RefreshReport<C> {
    fn record(&mut self, category: C, outcome: RefreshOutcome) {
        match outcome {
            RefreshOutcome::Refreshed => self.refreshed.push(category),
            RefreshOutcome::Failed => self.failed.push(category),
            RefreshOutcome::Skipped => self.skipped.push(category),
        }
    }

    /// Number of callbacks that were invoked.
    pub fn attempted(&self) -> usize {
        self.refreshed.len() + self.failed.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

struct Slot {
    callback: RefreshCallback,
    generation: u64,
}

struct RegistryInner {
    slots: Vec<Option<Slot>>,
    next_generation: u64,
}

/// Shared handle to the refresh directory of one screen.
pub struct RefreshRegistry<C> {
    inner: Arc<Mutex<RegistryInner>>,
    _categories: PhantomData<fn() -> C>,
}

impl<C> Clone for RefreshRegistry<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _categories: PhantomData,
        }
    }
}

impl<C: CategoryKey> Default for RefreshRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: CategoryKey> fmt::Debug for RefreshRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshRegistry")
            .field("registered", &self.registered())
            .finish()
    }
}

impl<C: CategoryKey> RefreshRegistry<C> {
    /// Create a registry with every slot empty.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RegistryInner {
                slots: (0..C::count()).map(|_| None).collect(),
                next_generation: 0,
            })),
            _categories: PhantomData,
        }
    }

    /// Store `callback` for `category`, replacing any previous one.
    pub fn register<F>(&self, category: C, callback: F)
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.install(category, Arc::new(callback));
    }

    /// Register `callback` and return a guard that unregisters it on drop.
    ///
    /// The guard only clears the slot while it still holds this
    /// registration, so a component that remounts before the old instance
    /// is dropped keeps its new callback.
    pub fn mount<F>(&self, category: C, callback: F) -> Mounted<C>
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let generation = self.install(category, Arc::new(callback));
        Mounted {
            registry: self.clone(),
            category,
            generation: Some(generation),
        }
    }

    /// Empty the slot for `category`; a later refresh is a no-op.
    pub fn unregister(&self, category: C) {
        if self.lock().slots[category.index()].take().is_some() {
            debug!("Refresh callback unregistered: {}", category.key());
        }
    }

    pub fn is_registered(&self, category: C) -> bool {
        self.lock().slots[category.index()].is_some()
    }

    /// Categories with a callback, in enumeration order.
    pub fn registered(&self) -> Vec<C> {
        let inner = self.lock();
        C::ALL
            .iter()
            .copied()
            .filter(|category| inner.slots[category.index()].is_some())
            .collect()
    }

    /// Invoke the callback for `category`, if any. Failures are logged and
    /// reported, never propagated.
    pub fn refresh(&self, category: C) -> RefreshOutcome {
        // Cloned out so the callback can touch the registry without deadlocking.
        let callback = self.lock().slots[category.index()]
            .as_ref()
            .map(|slot| Arc::clone(&slot.callback));

        let Some(callback) = callback else {
            debug!("No refresh callback for {}, skipping", category.key());
            return RefreshOutcome::Skipped;
        };

        match panic::catch_unwind(AssertUnwindSafe(|| callback())) {
            Ok(Ok(())) => {
                debug!("Refreshed {}", category.key());
                RefreshOutcome::Refreshed
            }
            Ok(Err(err)) => {
                warn!("Refresh callback for {} failed: {:#}", category.key(), err);
                RefreshOutcome::Failed
            }
            Err(payload) => {
                warn!(
                    "Refresh callback for {} panicked: {}",
                    category.key(),
                    panic_message(payload.as_ref())
                );
                RefreshOutcome::Failed
            }
        }
    }

    /// Refresh every category independently; one failure does not stop the
    /// rest.
    pub fn refresh_all(&self) -> RefreshReport<C> {
        let mut report = RefreshReport::default();
        for category in C::ALL.iter().copied() {
            report.record(category, self.refresh(category));
        }

        if !report.all_succeeded() {
            warn!(
                "Broadcast refresh finished with {} failed categories: {:?}",
                report.failed.len(),
                report.failed
            );
        } else {
            debug!("Broadcast refresh invoked {} callbacks", report.attempted());
        }
        report
    }

    fn install(&self, category: C, callback: RefreshCallback) -> u64 {
        let mut inner = self.lock();
        let generation = inner.next_generation;
        inner.next_generation += 1;
        let replaced = inner.slots[category.index()]
            .replace(Slot {
                callback,
                generation,
            })
            .is_some();
        drop(inner);

        if replaced {
            debug!("Refresh callback replaced: {}", category.key());
        } else {
            debug!("Refresh callback registered: {}", category.key());
        }
        generation
    }

    fn unregister_generation(&self, category: C, generation: u64) {
        let mut inner = self.lock();
        let slot = &mut inner.slots[category.index()];
        if slot.as_ref().is_some_and(|slot| slot.generation == generation) {
            *slot = None;
            drop(inner);
            debug!("Refresh callback unmounted: {}", category.key());
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Registration owned by a mounted component.
#[must_use = "dropping the guard unregisters the callback immediately"]
pub struct Mounted<C: CategoryKey> {
    registry: RefreshRegistry<C>,
    category: C,
    generation: Option<u64>,
}

impl<C: CategoryKey> Mounted<C> {
    pub fn category(&self) -> C {
        self.category
    }

    /// Unregister now instead of at drop.
    pub fn unmount(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(generation) = self.generation.take() {
            self.registry.unregister_generation(self.category, generation);
        }
    }
}

impl<C: CategoryKey> fmt::Debug for Mounted<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mounted")
            .field("category", &self.category)
            .field("generation", &self.generation)
            .finish()
    }
}

impl<C: CategoryKey> Drop for Mounted<C> {
    fn drop(&mut self) {
        self.release();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    crate::closed_enum! {
        enum Kind: "category" {
            Baptism => "BAPTISM",
            Marriage => "MARRIAGE",
            Funeral => "FUNERAL",
        }
    }

    impl CategoryKey for Kind {}

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> anyhow::Result<()> + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = Arc::clone(&count);
        let callback = move || {
            handle.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };
        (count, callback)
    }

    #[test]
    fn refresh_without_registration_is_a_noop() {
        let registry = RefreshRegistry::<Kind>::new();
        assert_eq!(registry.refresh(Kind::Baptism), RefreshOutcome::Skipped);
        assert!(registry.registered().is_empty());
    }

    #[test]
    fn register_replaces_previous_callback() {
        let registry = RefreshRegistry::new();
        let (first, cb_a) = counter();
        let (second, cb_b) = counter();

        registry.register(Kind::Marriage, cb_a);
        registry.register(Kind::Marriage, cb_b);
        assert_eq!(registry.refresh(Kind::Marriage), RefreshOutcome::Refreshed);

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unregister_empties_the_slot() {
        let registry = RefreshRegistry::new();
        let (count, callback) = counter();

        registry.register(Kind::Baptism, callback);
        registry.refresh_all();
        registry.unregister(Kind::Baptism);
        registry.refresh_all();

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!registry.is_registered(Kind::Baptism));
    }

    #[test]
    fn failing_callback_is_contained() {
        let registry = RefreshRegistry::new();
        registry.register(Kind::Funeral, || anyhow::bail!("query failed"));
        assert_eq!(registry.refresh(Kind::Funeral), RefreshOutcome::Failed);
    }

    #[test]
    fn panicking_callback_is_contained() {
        let registry = RefreshRegistry::new();
        registry.register(Kind::Funeral, || panic!("boom"));
        assert_eq!(registry.refresh(Kind::Funeral), RefreshOutcome::Failed);
        assert!(registry.is_registered(Kind::Funeral));
    }

    #[test]
    fn refresh_all_continues_past_failures() {
        let registry = RefreshRegistry::new();
        let (baptisms, cb_a) = counter();
        let (funerals, cb_b) = counter();
        registry.register(Kind::Baptism, cb_a);
        registry.register(Kind::Marriage, || anyhow::bail!("offline"));
        registry.register(Kind::Funeral, cb_b);

        let report = registry.refresh_all();

        assert_eq!(report.refreshed, vec![Kind::Baptism, Kind::Funeral]);
        assert_eq!(report.failed, vec![Kind::Marriage]);
        assert!(report.skipped.is_empty());
        assert_eq!(report.attempted(), 3);
        assert_eq!(baptisms.load(Ordering::SeqCst), 1);
        assert_eq!(funerals.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn mount_guard_unregisters_on_drop() {
        let registry = RefreshRegistry::new();
        let (_, callback) = counter();

        let mounted = registry.mount(Kind::Baptism, callback);
        assert_eq!(mounted.category(), Kind::Baptism);
        assert!(registry.is_registered(Kind::Baptism));

        drop(mounted);
        assert!(!registry.is_registered(Kind::Baptism));
    }

    #[test]
    fn stale_mount_does_not_clobber_a_remount() {
        let registry = RefreshRegistry::new();
        let (old_count, old_cb) = counter();
        let (new_count, new_cb) = counter();

        let old = registry.mount(Kind::Marriage, old_cb);
        let new = registry.mount(Kind::Marriage, new_cb);
        old.unmount();

        assert_eq!(registry.refresh(Kind::Marriage), RefreshOutcome::Refreshed);
        assert_eq!(old_count.load(Ordering::SeqCst), 0);
        assert_eq!(new_count.load(Ordering::SeqCst), 1);

        drop(new);
        assert_eq!(registry.refresh(Kind::Marriage), RefreshOutcome::Skipped);
    }

    #[test]
    fn callback_may_use_the_registry_while_running() {
        let registry = RefreshRegistry::new();
        let handle = registry.clone();
        registry.register(Kind::Baptism, move || {
            handle.unregister(Kind::Baptism);
            Ok(())
        });

        assert_eq!(registry.refresh(Kind::Baptism), RefreshOutcome::Refreshed);
        assert!(!registry.is_registered(Kind::Baptism));
    }
}
