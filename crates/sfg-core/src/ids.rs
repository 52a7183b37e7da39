use core::fmt;
use core::num::NonZeroU32;

/// Compact handle into a slot vector (graph nodes, branches, expression arena).
///
/// Stored as `index + 1` so `Option<Id>` costs nothing extra.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(NonZeroU32);

impl Id {
    /// Create an Id from a 0-based index.
    ///
    /// Returns `None` for `u32::MAX`, the one index that cannot be offset by one.
    pub fn try_from_index(index: u32) -> Option<Self> {
        index.checked_add(1).and_then(NonZeroU32::new).map(Self)
    }

    /// Create an Id from a 0-based index.
    ///
    /// Indices come from `Vec` lengths that are bounded well below `u32::MAX`
    /// by the allocators in this workspace; `u32::MAX` saturates to the last
    /// representable handle.
    pub fn from_index(index: u32) -> Self {
        Self(NonZeroU32::new(index.saturating_add(1)).unwrap_or(NonZeroU32::MAX))
    }

    /// Recover the 0-based index.
    pub fn index(self) -> u32 {
        self.0.get() - 1
    }

    /// Index as `usize`, for slot lookups.
    pub fn slot(self) -> usize {
        self.index() as usize
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.index())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// Graph node handle.
pub type NodeId = Id;
/// Graph branch handle.
pub type BranchId = Id;
/// Expression arena slot handle.
pub type ExprNodeId = Id;
