//! Arena handles.
//!
//! Handles store `slot + 1` in a `NonZeroU32`, so `Option<Handle>` costs
//! nothing extra.

use core::num::NonZeroU32;

macro_rules! arena_handle {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(NonZeroU32);

        impl $name {
            /// Handle for arena slot `slot`, or `None` past `u32::MAX - 1`.
            #[must_use]
            pub fn from_slot(slot: usize) -> Option<Self> {
                u32::try_from(slot)
                    .ok()
                    .and_then(|s| s.checked_add(1))
                    .and_then(NonZeroU32::new)
                    .map(Self)
            }

            /// Arena slot of this handle.
            #[must_use]
            pub const fn slot(self) -> usize {
                (self.0.get() - 1) as usize
            }
        }
    };
}

arena_handle!(
    /// Module slot in a [`ModuleCache`](crate::loader::ModuleCache).
    ModuleId
);

arena_handle!(
    /// Node of an [`OidTree`](crate::model::OidTree).
    NodeId
);

/// Address of a symbol: owning module plus position in its symbol arena.
///
/// `module: None` addresses the synthetic roots of the default context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId {
    /// Owning module, or `None` for a default-context root.
    pub module: Option<ModuleId>,
    /// Position in the owner's symbol arena.
    pub index: u32,
}

impl SymbolId {
    /// Symbol `index` of `module`.
    #[must_use]
    pub const fn new(module: ModuleId, index: u32) -> Self {
        Self {
            module: Some(module),
            index,
        }
    }

    /// Default-context root symbol `index`.
    #[must_use]
    pub const fn root(index: u32) -> Self {
        Self {
            module: None,
            index,
        }
    }

    /// Whether this addresses a default-context root.
    #[must_use]
    pub const fn is_root(self) -> bool {
        self.module.is_none()
    }
}
