//! Which overlays are open, and which record or entity they operate on.
//!
//! The coordinator is a plain owned value: an open-overlay set plus a focus
//! context. Every operation is total and synchronous.

use super::keys::{FocusOwner, OverlayKey};
use log::debug;
use std::collections::HashSet;

/// The record and identifier currently "in focus" for the detail, edit,
/// certificate and history overlays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusContext<R, I> {
    pub selected_record: Option<R>,
    pub selected_entity_id: Option<I>,
}

impl<R, I> Default for FocusContext<R, I> {
    fn default() -> Self {
        Self {
            selected_record: None,
            selected_entity_id: None,
        }
    }
}

impl<R, I> FocusContext<R, I> {
    pub fn is_empty(&self) -> bool {
        self.selected_record.is_none() && self.selected_entity_id.is_none()
    }

    fn clear(&mut self) {
        self.selected_record = None;
        self.selected_entity_id = None;
    }
}

/// Tracks open overlays and the focus context they share.
///
/// Closing an overlay clears only the focus field that overlay owns (see
/// [`OverlayKey::focus_owner`]). Detail, edit and certificate all own
/// `selected_record`, so closing any one of them clears it even when another
/// one set it.
#[derive(Debug, Clone)]
pub struct ModalCoordinator<O, R, I> {
    open: HashSet<O>,
    focus: FocusContext<R, I>,
}

impl<O: OverlayKey, R, I> Default for ModalCoordinator<O, R, I> {
    fn default() -> Self {
        Self {
            open: HashSet::with_capacity(O::count()),
            focus: FocusContext::default(),
        }
    }
}

impl<O: OverlayKey, R, I> ModalCoordinator<O, R, I> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an overlay. Opening an already open overlay is a no-op.
    pub fn open(&mut self, id: O) {
        if self.open.insert(id) {
            debug!("Overlay opened: {}", id.key());
        }
    }

    /// Close an overlay and clear the focus field it owns.
    pub fn close(&mut self, id: O) {
        let was_open = self.open.remove(&id);
        match id.focus_owner() {
            FocusOwner::Record => self.focus.selected_record = None,
            FocusOwner::Entity => self.focus.selected_entity_id = None,
            FocusOwner::Unowned => {}
        }
        if was_open {
            debug!("Overlay closed: {}", id.key());
        }
    }

    /// Close every overlay and clear the whole focus context.
    pub fn close_all(&mut self) {
        if !self.open.is_empty() {
            debug!("Closing {} overlays", self.open.len());
        }
        self.open.clear();
        self.focus.clear();
    }

    /// Focus a record without opening anything.
    pub fn set_focus_record(&mut self, record: R) {
        self.focus.selected_record = Some(record);
    }

    /// Focus an entity id without opening anything.
    pub fn set_focus_entity_id(&mut self, id: I) {
        self.focus.selected_entity_id = Some(id);
    }

    /// Whether `id` is currently open.
    pub fn is_open(&self, id: O) -> bool {
        self.open.contains(&id)
    }

    /// Whether any overlay at all is open.
    pub fn is_any_open(&self) -> bool {
        !self.open.is_empty()
    }

    /// Number of open overlays.
    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    /// Open overlays in enumeration order.
    pub fn open_overlays(&self) -> Vec<O> {
        O::ALL
            .iter()
            .copied()
            .filter(|id| self.open.contains(id))
            .collect()
    }

    /// The full focus context.
    pub fn focus(&self) -> &FocusContext<R, I> {
        &self.focus
    }

    /// Record shared by the detail, edit and certificate overlays.
    pub fn selected_record(&self) -> Option<&R> {
        self.focus.selected_record.as_ref()
    }

    /// Entity shown by the history overlay.
    pub fn selected_entity_id(&self) -> Option<&I> {
        self.focus.selected_entity_id.as_ref()
    }

    // Composite helpers set focus first so a reader never sees the overlay
    // open without its data.

    /// Focus `record`, then open the detail overlay.
    pub fn open_detail(&mut self, record: R) {
        self.set_focus_record(record);
        self.open(O::DETAIL);
    }

    /// Focus `record`, then open the edit overlay.
    pub fn open_edit(&mut self, record: R) {
        self.set_focus_record(record);
        self.open(O::EDIT);
    }

    /// Focus `record`, then open the certificate overlay.
    pub fn open_certificate(&mut self, record: R) {
        self.set_focus_record(record);
        self.open(O::CERTIFICATE);
    }

    /// Focus entity `id`, then open the history overlay.
    pub fn open_entity_history(&mut self, id: I) {
        self.set_focus_entity_id(id);
        self.open(O::ENTITY_HISTORY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screen::keys::Enumeration;

    crate::closed_enum! {
        enum Overlay: "overlay" {
            Baptism => "BAPTISM",
            Marriage => "MARRIAGE",
            Detail => "DETAIL",
            Edit => "EDIT",
            Certificate => "CERTIFICATE",
            Analytics => "ANALYTICS",
            EntityHistory => "ENTITY_HISTORY",
        }
    }

    impl OverlayKey for Overlay {
        const DETAIL: Self = Overlay::Detail;
        const EDIT: Self = Overlay::Edit;
        const CERTIFICATE: Self = Overlay::Certificate;
        const ENTITY_HISTORY: Self = Overlay::EntityHistory;
    }

    type Coordinator = ModalCoordinator<Overlay, &'static str, u32>;

    #[test]
    fn open_is_idempotent() {
        let mut modals = Coordinator::new();
        modals.open(Overlay::Baptism);
        assert!(modals.is_open(Overlay::Baptism));
        modals.open(Overlay::Baptism);
        assert_eq!(modals.open_count(), 1);
    }

    #[test]
    fn close_of_unowned_overlay_keeps_focus() {
        let mut modals = Coordinator::new();
        modals.open_detail("r1");
        modals.open_entity_history(7);
        modals.open(Overlay::Analytics);

        modals.close(Overlay::Analytics);

        assert_eq!(modals.selected_record(), Some(&"r1"));
        assert_eq!(modals.selected_entity_id(), Some(&7));
    }

    #[test]
    fn closing_history_clears_only_entity_id() {
        let mut modals = Coordinator::new();
        modals.open_detail("r1");
        modals.open_entity_history(7);

        modals.close(Overlay::EntityHistory);

        assert!(!modals.is_open(Overlay::EntityHistory));
        assert!(modals.is_open(Overlay::Detail));
        assert_eq!(modals.selected_record(), Some(&"r1"));
        assert_eq!(modals.selected_entity_id(), None);
    }

    #[test]
    fn record_focus_is_shared_between_detail_edit_and_certificate() {
        let mut modals = Coordinator::new();
        modals.open_certificate("r1");
        modals.open_edit("r2");
        assert_eq!(modals.selected_record(), Some(&"r2"));

        modals.close(Overlay::Certificate);

        assert!(modals.is_open(Overlay::Edit));
        assert_eq!(modals.selected_record(), None);
    }

    #[test]
    fn close_all_resets_everything() {
        let mut modals = Coordinator::new();
        modals.open(Overlay::Marriage);
        modals.open_detail("r1");
        modals.open_entity_history(3);

        modals.close_all();

        for overlay in Overlay::ALL {
            assert!(!modals.is_open(*overlay));
        }
        assert!(modals.focus().is_empty());
        assert!(!modals.is_any_open());
    }

    #[test]
    fn open_overlays_are_listed_in_enumeration_order() {
        let mut modals = Coordinator::new();
        modals.open(Overlay::Certificate);
        modals.open(Overlay::Baptism);
        modals.open(Overlay::Detail);

        assert_eq!(
            modals.open_overlays(),
            vec![Overlay::Baptism, Overlay::Detail, Overlay::Certificate]
        );
    }
}
