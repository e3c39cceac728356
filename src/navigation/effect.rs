//! Effect flags returned by the interaction controller.
//!
//! A handled UI event reports what changed as an [`EffectSet`]; the session
//! re-renders when [`EffectSet::needs_render`] says so and runs any fetches.

use bitflags::bitflags;

bitflags! {
    /// Set of effects produced by one UI event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EffectSet: u16 {
        /// No effects.
        const NONE = 0;

        // =====================================================================
        // NAVIGATION EFFECTS
        // =====================================================================

        /// View mode or breadcrumb stack changed.
        const NAVIGATED = 1 << 0;

        /// Selected node changed.
        const SELECTION_CHANGED = 1 << 1;

        /// One or more tagged fetches were issued.
        const FETCH_ISSUED = 1 << 2;

        // =====================================================================
        // LAYOUT EFFECTS
        // =====================================================================

        /// A manual position was stored for the active scope.
        const LAYOUT_STORED = 1 << 3;

        /// The active scope's manual positions were cleared.
        const LAYOUT_RESET = 1 << 4;

        /// Switched between auto and arrange.
        const LAYOUT_MODE_CHANGED = 1 << 5;

        // =====================================================================
        // OUTBOUND EFFECTS
        // =====================================================================

        /// A drill session should be started.
        const DRILL_REQUESTED = 1 << 6;

        /// The scene must be recomputed.
        const RERENDER = 1 << 7;
    }
}

impl Default for EffectSet {
    fn default() -> Self {
        EffectSet::NONE
    }
}

impl EffectSet {
    pub fn needs_render(&self) -> bool {
        self.contains(EffectSet::RERENDER)
    }

    pub fn has_layout_effects(&self) -> bool {
        self.intersects(
            EffectSet::LAYOUT_STORED | EffectSet::LAYOUT_RESET | EffectSet::LAYOUT_MODE_CHANGED,
        )
    }
}
