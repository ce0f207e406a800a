//! Closed key enumerations the coordination layer is generic over.
//!
//! A screen supplies its record categories, overlay ids and workflow ids as
//! plain enums implementing [`Enumeration`]. Every table in the layer is a
//! fixed-size vector indexed by [`Enumeration::index`], so no component ever
//! hard-codes a particular category.

use super::error::CoordinatorError;
use std::fmt::Debug;
use std::hash::Hash;

/// A fixed, closed set of keys supplied as configuration.
pub trait Enumeration: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    /// Human readable name of the key family, used in error messages.
    const KIND: &'static str;

    /// Every member, in `index()` order.
    const ALL: &'static [Self];

    /// Stable external key (e.g. `"BAPTISM"`).
    fn key(self) -> &'static str;

    /// Position of this member inside [`Enumeration::ALL`].
    fn index(self) -> usize;

    /// Number of members.
    fn count() -> usize {
        Self::ALL.len()
    }

    /// Resolve an external key, ignoring ASCII case and surrounding whitespace.
    fn from_key(key: &str) -> Result<Self, CoordinatorError> {
        let trimmed = key.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|member| member.key().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| CoordinatorError::unknown_key(Self::KIND, trimmed))
    }
}

/// Marker for the record categories a screen manages.
pub trait CategoryKey: Enumeration {}

/// Which part of the focus context an overlay owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusOwner {
    /// Detail, edit and certificate overlays share `selected_record`.
    Record,
    /// The cross-entity history overlay owns `selected_entity_id`.
    Entity,
    /// Closing this overlay leaves the focus context alone.
    Unowned,
}

/// Overlay ids. Besides the per-category overlays every screen has the four
/// focus-carrying overlays named here.
pub trait OverlayKey: Enumeration {
    const DETAIL: Self;
    const EDIT: Self;
    const CERTIFICATE: Self;
    const ENTITY_HISTORY: Self;

    fn focus_owner(self) -> FocusOwner {
        if self == Self::DETAIL || self == Self::EDIT || self == Self::CERTIFICATE {
            FocusOwner::Record
        } else if self == Self::ENTITY_HISTORY {
            FocusOwner::Entity
        } else {
            FocusOwner::Unowned
        }
    }
}

/// Declare a closed key enumeration together with its [`Enumeration`],
/// `Display` and `FromStr` impls.
///
/// # Examples
/// ```
/// sacraments_screen::closed_enum! {
///     pub enum Color: "color" {
///         Red => "RED",
///         Green => "GREEN",
///     }
/// }
/// ```
#[macro_export]
macro_rules! closed_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $kind:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $key:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $crate::screen::keys::Enumeration for $name {
            const KIND: &'static str = $kind;
            const ALL: &'static [Self] = &[ $( $name::$variant ),+ ];

            fn key(self) -> &'static str {
                match self {
                    $( $name::$variant => $key ),+
                }
            }

            fn index(self) -> usize {
                self as usize
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str($crate::screen::keys::Enumeration::key(*self))
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::screen::error::CoordinatorError;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                <$name as $crate::screen::keys::Enumeration>::from_key(s)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::closed_enum! {
        enum Fruit: "fruit" {
            Apple => "APPLE",
            Pear => "PEAR",
            Plum => "PLUM",
        }
    }

    crate::closed_enum! {
        enum Panel: "panel" {
            Apple => "APPLE",
            Detail => "DETAIL",
            Edit => "EDIT",
            Certificate => "CERTIFICATE",
            History => "HISTORY",
            Analytics => "ANALYTICS",
        }
    }

    impl OverlayKey for Panel {
        const DETAIL: Self = Panel::Detail;
        const EDIT: Self = Panel::Edit;
        const CERTIFICATE: Self = Panel::Certificate;
        const ENTITY_HISTORY: Self = Panel::History;
    }

    #[test]
    fn index_matches_position_in_all() {
        for (position, fruit) in Fruit::ALL.iter().enumerate() {
            assert_eq!(fruit.index(), position);
        }
        assert_eq!(Fruit::count(), 3);
    }

    #[test]
    fn from_key_is_case_insensitive_and_trims() {
        assert_eq!(Fruit::from_key(" pear ").unwrap(), Fruit::Pear);
        assert_eq!("PLUM".parse::<Fruit>().unwrap(), Fruit::Plum);
        assert_eq!(Fruit::Apple.to_string(), "APPLE");
    }

    #[test]
    fn from_key_rejects_keys_outside_the_enumeration() {
        let err = Fruit::from_key("banana").unwrap_err();
        assert_eq!(err, CoordinatorError::unknown_key("fruit", "banana"));
        assert_eq!(err.to_string(), "unknown fruit key 'banana'");
    }

    #[test]
    fn focus_owner_follows_overlay_constants() {
        assert_eq!(Panel::Detail.focus_owner(), FocusOwner::Record);
        assert_eq!(Panel::Edit.focus_owner(), FocusOwner::Record);
        assert_eq!(Panel::Certificate.focus_owner(), FocusOwner::Record);
        assert_eq!(Panel::History.focus_owner(), FocusOwner::Entity);
        assert_eq!(Panel::Apple.focus_owner(), FocusOwner::Unowned);
        assert_eq!(Panel::Analytics.focus_owner(), FocusOwner::Unowned);
    }
}
