//! Forward migration of positions authored against the legacy canvas.
//!
//! A screen is considered legacy only when every explicitly positioned block
//! fits inside the old canvas. One coordinate past the old bounds is proof the
//! screen was authored against the current canvas, and the whole screen is
//! left alone. Blocks pinned to the bottom stack never use canvas coordinates
//! and take no part in the decision.

use crate::block::{ContentBlock, Position};
use crate::scale::{CanvasSize, DESIGN_CANVAS, LEGACY_CANVAS};
use crate::screen::Screen;

/// Rescales positions from one canvas to another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegacyMigrator {
    from: CanvasSize,
    to: CanvasSize,
}

impl Default for LegacyMigrator {
    fn default() -> Self {
        Self::new(LEGACY_CANVAS, DESIGN_CANVAS)
    }
}

impl LegacyMigrator {
    /// Create a migrator between two canvases.
    #[must_use]
    pub const fn new(from: CanvasSize, to: CanvasSize) -> Self {
        Self { from, to }
    }

    fn fits_old_canvas(&self, position: Position) -> bool {
        position.x <= self.from.width && position.y <= self.from.height
    }

    /// Whether the blocks of a screen were authored against the old canvas.
    ///
    /// Screens without any explicitly positioned block have nothing to migrate.
    pub fn applies_to<'a>(&self, blocks: impl IntoIterator<Item = &'a ContentBlock>) -> bool {
        let mut positioned = blocks.into_iter().filter_map(|b| b.position).peekable();
        if positioned.peek().is_none() {
            return false;
        }
        positioned.all(|p| self.fits_old_canvas(p))
    }

    /// Whether a screen was authored against the old canvas.
    ///
    /// Considers every block in the canvas flow, visible or not; pinned blocks
    /// are skipped.
    #[must_use]
    pub fn applies_to_screen(&self, screen: &Screen) -> bool {
        self.applies_to(screen.blocks().iter().filter(|b| !b.pin_to_bottom))
    }

    /// Rescale one position, rounding to whole logical units.
    #[must_use]
    pub fn migrate(&self, position: Position) -> Position {
        if self.from.width <= 0.0 || self.from.height <= 0.0 {
            return position;
        }
        Position {
            x: (position.x * self.to.width / self.from.width).round(),
            y: (position.y * self.to.height / self.from.height).round(),
        }
    }
}
