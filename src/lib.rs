//! Overlay, loading and data-refresh coordination for a parish
//! sacraments-management screen.

pub mod cli;
pub mod config;
pub mod sacraments;
pub mod screen;

pub use screen::{
    ControllerSettings, CoordinatorError, LoadingTracker, ModalCoordinator, RefreshRegistry,
    ScreenController, ScreenSchema,
};
