// crates/kryon-core/src/invalidation.rs

use bitflags::bitflags;

bitflags! {
    /// Layout work requested by a property change on its owner.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Invalidation: u8 {
        const OWNER_MEASURE = 1 << 0;
        const OWNER_ARRANGE = 1 << 1;
        /// Owner keeps its size but must recompute its world matrix.
        const OWNER_ARRANGE_CHANGED = 1 << 2;
        const PARENT_MEASURE = 1 << 3;
        const PARENT_ARRANGE = 1 << 4;
        /// Parent must re-sort its visual children.
        const PARENT_CHILD_ORDER = 1 << 5;
    }
}

impl Default for Invalidation {
    fn default() -> Self {
        Self::empty()
    }
}
