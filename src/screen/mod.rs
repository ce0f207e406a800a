//! Overlay, loading and refresh coordination for a record-management screen.
//!
//! Three independent peers, composed by [`ScreenController`]:
//! - [`ModalCoordinator`]: open overlays and the record/entity in focus
//! - [`LoadingTracker`]: busy state per global, category and workflow scope
//! - [`RefreshRegistry`]: per-category refetch callbacks owned by child components

pub mod controller;
pub mod error;
pub mod keys;
pub mod loading;
pub mod modal;
pub mod refresh;

pub use controller::{
    BusyScope, ControllerSettings, ScreenController, ScreenLoading, ScreenModals, ScreenSchema,
    ScreenScope, ScreenSnapshot,
};
pub use error::CoordinatorError;
pub use keys::{CategoryKey, Enumeration, FocusOwner, OverlayKey};
pub use loading::{
    ActiveOperation, LoadingGuard, LoadingState, LoadingTracker, OperationId, OperationKey, Scope,
};
pub use modal::{FocusContext, ModalCoordinator};
pub use refresh::{Mounted, RefreshCallback, RefreshOutcome, RefreshRegistry, RefreshReport};
