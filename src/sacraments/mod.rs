//! The sacraments-management screen: its categories, overlays and workflows.

pub mod list;
pub mod store;

use crate::screen::{CategoryKey, OverlayKey, ScreenController, ScreenSchema};
use serde::{Deserialize, Serialize};

pub use list::ListView;
pub use store::{MemoryStore, StoreFault};

crate::closed_enum! {
    /// Record categories managed by the screen.
    pub enum Sacrament: "category" {
        Baptism => "BAPTISM",
        FirstCommunion => "FIRST_COMMUNION",
        Confirmation => "CONFIRMATION",
        Marriage => "MARRIAGE",
        Anointing => "ANOINTING",
        Funeral => "FUNERAL",
        Ordination => "ORDINATION",
        Reconciliation => "RECONCILIATION",
        Catechumenate => "CATECHUMENATE",
    }
}

impl CategoryKey for Sacrament {}

crate::closed_enum! {
    /// Overlays of the screen: one create form per category, the shared
    /// record overlays, and the cross-category panels.
    pub enum SacramentOverlay: "overlay" {
        Baptism => "BAPTISM",
        FirstCommunion => "FIRST_COMMUNION",
        Confirmation => "CONFIRMATION",
        Marriage => "MARRIAGE",
        Anointing => "ANOINTING",
        Funeral => "FUNERAL",
        Ordination => "ORDINATION",
        Reconciliation => "RECONCILIATION",
        Catechumenate => "CATECHUMENATE",
        Detail => "DETAIL",
        Edit => "EDIT",
        Certificate => "CERTIFICATE",
        Analytics => "ANALYTICS",
        EntityHistory => "ENTITY_HISTORY",
    }
}

impl OverlayKey for SacramentOverlay {
    const DETAIL: Self = SacramentOverlay::Detail;
    const EDIT: Self = SacramentOverlay::Edit;
    const CERTIFICATE: Self = SacramentOverlay::Certificate;
    const ENTITY_HISTORY: Self = SacramentOverlay::EntityHistory;
}

impl SacramentOverlay {
    /// The create overlay of a category.
    pub fn for_category(category: Sacrament) -> Self {
        match category {
            Sacrament::Baptism => SacramentOverlay::Baptism,
            Sacrament::FirstCommunion => SacramentOverlay::FirstCommunion,
            Sacrament::Confirmation => SacramentOverlay::Confirmation,
            Sacrament::Marriage => SacramentOverlay::Marriage,
            Sacrament::Anointing => SacramentOverlay::Anointing,
            Sacrament::Funeral => SacramentOverlay::Funeral,
            Sacrament::Ordination => SacramentOverlay::Ordination,
            Sacrament::Reconciliation => SacramentOverlay::Reconciliation,
            Sacrament::Catechumenate => SacramentOverlay::Catechumenate,
        }
    }
}

crate::closed_enum! {
    /// Overlay workflows whose busy state is tracked separately.
    pub enum Workflow: "workflow" {
        Create => "CREATE",
        Edit => "EDIT",
        Delete => "DELETE",
        Certificate => "CERTIFICATE",
        Export => "EXPORT",
    }
}

/// One sacrament register entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SacramentRecord {
    pub id: String,
    pub category: Sacrament,
    /// Parishioner the entry is about.
    pub person: String,
    /// ISO date of celebration.
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub officiant: Option<String>,
}

impl SacramentRecord {
    pub fn new(
        id: impl Into<String>,
        category: Sacrament,
        person: impl Into<String>,
        date: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            category,
            person: person.into(),
            date: date.into(),
            officiant: None,
        }
    }
}

// Keys go over the wire as their external names.
macro_rules! serde_by_key {
    ($($name:ty),+) => {$(
        impl Serialize for $name {
            fn serialize<Ser: serde::Serializer>(
                &self,
                serializer: Ser,
            ) -> Result<Ser::Ok, Ser::Error> {
                serializer.serialize_str(crate::screen::Enumeration::key(*self))
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let key = String::deserialize(deserializer)?;
                <$name as crate::screen::Enumeration>::from_key(&key)
                    .map_err(serde::de::Error::custom)
            }
        }
    )+};
}

serde_by_key!(Sacrament, SacramentOverlay, Workflow);

/// Schema binding the sacraments enumerations to the generic controller.
pub struct SacramentsSchema;

impl ScreenSchema for SacramentsSchema {
    type Category = Sacrament;
    type Overlay = SacramentOverlay;
    type Workflow = Workflow;
    type Record = SacramentRecord;
    type Id = String;
}

pub type SacramentsScreen = ScreenController<SacramentsSchema>;
