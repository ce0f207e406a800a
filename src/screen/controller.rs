//! The screen controller: one owner for the overlay, loading and refresh
//! peers of a management screen.

use super::keys::{CategoryKey, Enumeration, OverlayKey};
use super::loading::{LoadingTracker, OperationKey, Scope};
use super::modal::ModalCoordinator;
use super::refresh::{RefreshRegistry, RefreshReport};
use log::{info, warn};
use serde::Serialize;
use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

/// The closed enumerations and value types one screen is configured with.
pub trait ScreenSchema: 'static {
    type Category: CategoryKey;
    type Overlay: OverlayKey;
    type Workflow: Enumeration;
    type Record: Clone + Debug;
    type Id: Clone + Debug + Send + Sync + 'static;
}

pub type ScreenModals<S> = ModalCoordinator<
    <S as ScreenSchema>::Overlay,
    <S as ScreenSchema>::Record,
    <S as ScreenSchema>::Id,
>;
pub type ScreenLoading<S> = LoadingTracker<
    <S as ScreenSchema>::Category,
    <S as ScreenSchema>::Workflow,
    <S as ScreenSchema>::Id,
>;
pub type ScreenScope<S> = Scope<<S as ScreenSchema>::Category, <S as ScreenSchema>::Workflow>;

/// Controller behaviour knobs, usually taken from the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    /// Broadcast a refresh to every category after a successful mutation
    /// instead of refreshing only the mutated category.
    pub refresh_all_after_mutation: bool,
    /// Tracked operations slower than this are logged as warnings.
    pub slow_operation_warn: Option<Duration>,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            refresh_all_after_mutation: false,
            slow_operation_warn: Some(Duration::from_millis(5000)),
        }
    }
}

/// Serialisable view of the controller, for logging and the CLI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenSnapshot<R, I> {
    pub open_overlays: Vec<&'static str>,
    pub selected_record: Option<R>,
    pub selected_entity_id: Option<I>,
    pub busy: Vec<BusyScope<I>>,
    pub registered: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusyScope<I> {
    pub scope: &'static str,
    pub label: Option<String>,
    pub record_id: Option<I>,
    pub in_flight: usize,
}

/// Owns the three coordination peers for the lifetime of a screen.
///
/// The peers do not know about each other; the controller composes them.
/// Child components receive a clone of [`ScreenController::refresh_registry`]
/// and register their own refetch callbacks.
pub struct ScreenController<S: ScreenSchema> {
    modals: ScreenModals<S>,
    loading: ScreenLoading<S>,
    refresh: RefreshRegistry<S::Category>,
    settings: ControllerSettings,
}

impl<S: ScreenSchema> Default for ScreenController<S> {
    fn default() -> Self {
        Self::new(ControllerSettings::default())
    }
}

impl<S: ScreenSchema> ScreenController<S> {
    pub fn new(settings: ControllerSettings) -> Self {
        let mut loading = LoadingTracker::new();
        if let Some(threshold) = settings.slow_operation_warn {
            loading = loading.with_slow_operation_threshold(threshold);
        }

        Self {
            modals: ModalCoordinator::new(),
            loading,
            refresh: RefreshRegistry::new(),
            settings,
        }
    }

    /// Settings the controller was built with.
    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Overlay state, for rendering.
    pub fn modals(&self) -> &ScreenModals<S> {
        &self.modals
    }

    /// Overlay state, for event handlers.
    pub fn modals_mut(&mut self) -> &mut ScreenModals<S> {
        &mut self.modals
    }

    /// Loading table of the screen.
    pub fn loading(&self) -> &ScreenLoading<S> {
        &self.loading
    }

    /// Registry child list components mount their refetch callbacks on.
    pub fn refresh_registry(&self) -> &RefreshRegistry<S::Category> {
        &self.refresh
    }

    /// Run a mutation for `category`.
    ///
    /// The workflow scope and the category scope are both busy while `f`
    /// runs. On success the category (or every category, per settings) is
    /// refreshed. On failure nothing is refreshed, the displayed data stays
    /// stale and the error is returned unchanged for the caller to present.
    pub async fn mutate<F, Fut, T, E>(
        &self,
        category: S::Category,
        workflow: S::Workflow,
        record_id: Option<S::Id>,
        f: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let label = format!("{} {}", workflow.key().to_ascii_lowercase(), category.key());

        let category_guard = self.loading.begin(
            OperationKey::new(Scope::Category(category)).with_label(label.clone()),
            record_id.clone(),
        );
        let result = self
            .loading
            .run_with_tracking(
                OperationKey::new(Scope::Workflow(workflow)).with_label(label.clone()),
                record_id,
                f,
            )
            .await;
        category_guard.end();

        match &result {
            Ok(_) => {
                info!("Mutation '{}' succeeded", label);
                if self.settings.refresh_all_after_mutation {
                    self.refresh.refresh_all();
                } else {
                    self.refresh.refresh(category);
                }
            }
            Err(_) => warn!("Mutation '{}' failed, {} left unrefreshed", label, category.key()),
        }
        result
    }

    /// Broadcast a refresh to every registered category.
    pub fn refresh_all(&self) -> RefreshReport<S::Category> {
        self.refresh.refresh_all()
    }

    /// Close every overlay and clear the loading table. Refresh callbacks
    /// belong to the child components and are left alone.
    pub fn reset(&mut self) {
        self.modals.close_all();
        self.loading.clear_all();
        info!("Screen controller reset");
    }

    /// Serialisable view of overlays, focus, busy scopes and registrations.
    pub fn snapshot(&self) -> ScreenSnapshot<S::Record, S::Id> {
        let busy = self
            .loading
            .busy_scopes()
            .into_iter()
            .map(|scope| {
                let state = self.loading.state(scope);
                BusyScope {
                    scope: scope.name(),
                    label: state.label,
                    record_id: state.record_id,
                    in_flight: self.loading.in_flight(scope),
                }
            })
            .collect();

        ScreenSnapshot {
            open_overlays: self
                .modals
                .open_overlays()
                .into_iter()
                .map(Enumeration::key)
                .collect(),
            selected_record: self.modals.selected_record().cloned(),
            selected_entity_id: self.modals.selected_entity_id().cloned(),
            busy,
            registered: self
                .refresh
                .registered()
                .into_iter()
                .map(Enumeration::key)
                .collect(),
        }
    }
}
