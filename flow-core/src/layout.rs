//! Block placement on the device viewport.
//!
//! ```text
//! ┌──────────────── viewport ────────────────┐
//! │ 24 ┌──────── full-width lane ────────┐ 24│
//! │    │ checklist, input, slider, ...   │   │
//! │    └─────────────────────────────────┘   │
//! │    ┌── content lane (280) ──┐            │
//! │    │ text, image, button... │            │
//! │    └────────────────────────┘            │
//! │  ........ canvas flow (absolute) ......  │
//! │ ┌────────── bottom stack ──────────────┐ │
//! │ │ pinToBottom blocks, in paint order   │ │
//! └─┴──────────────────────────────────────┴─┘
//! ```

use serde::{Deserialize, Serialize};

use crate::block::{BlockType, ContentBlock, Position};
use crate::migrate::LegacyMigrator;
use crate::scale::{CanvasSize, CoordinateScaler, DevicePoint};
use crate::screen::Screen;

/// Horizontal inset of full-width blocks and default positions, in logical units.
pub const CONTENT_INSET: f32 = 24.0;

/// Maximum width of content-lane blocks, in logical units.
pub const CONTENT_MAX_WIDTH: f32 = 280.0;

/// Y of the first block without an explicit position, in logical units.
pub const DEFAULT_ORIGIN_Y: f32 = 150.0;

/// Vertical distance between consecutive default positions, in logical units.
pub const DEFAULT_PITCH: f32 = 80.0;

/// Width assumed for icons when centering them, in logical units.
pub const DEFAULT_ICON_SIZE: f32 = 64.0;

/// Which width lane a block occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutCategory {
    /// Pinned to canvas width minus both insets.
    FullWidth,
    /// Capped at the content lane width.
    ContentWidth,
}

/// Decide the width lane of a block.
///
/// Buttons are full width unless their content sets `fullWidth: false`.
#[must_use]
pub fn classify(block_type: BlockType, full_width: Option<bool>) -> LayoutCategory {
    match block_type {
        BlockType::Checklist
        | BlockType::Input
        | BlockType::Progress
        | BlockType::Divider
        | BlockType::Slider
        | BlockType::ScrollContainer => LayoutCategory::FullWidth,
        BlockType::Button if full_width != Some(false) => LayoutCategory::FullWidth,
        _ => LayoutCategory::ContentWidth,
    }
}

/// Maximum render width of a block in device pixels.
///
/// An explicit numeric `styling.width` wins over both lanes. The same value is
/// used for layout and handed to the renderer as its wrap constraint.
#[must_use]
pub fn max_width(block: &ContentBlock, scaler: &CoordinateScaler) -> f32 {
    if let Some(width) = block.explicit_width() {
        return scaler.scale(width);
    }
    match classify(block.block_type, block.declared_full_width()) {
        LayoutCategory::FullWidth => {
            scaler.scale(scaler.canvas().width - 2.0 * CONTENT_INSET)
        }
        LayoutCategory::ContentWidth => scaler.scale(CONTENT_MAX_WIDTH),
    }
}

/// Position of the `index`-th block of a screen when it declares none.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn default_position(block_type: BlockType, index: usize, canvas: CanvasSize) -> Position {
    let x = if block_type == BlockType::Icon {
        (canvas.width - DEFAULT_ICON_SIZE) / 2.0
    } else {
        CONTENT_INSET
    };
    Position::new(x, DEFAULT_ORIGIN_Y + index as f32 * DEFAULT_PITCH)
}

/// Where a placed block is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PlacementAnchor {
    /// Absolute device position within the canvas flow.
    Absolute {
        /// Top-left corner in device pixels.
        point: DevicePoint,
    },
    /// Slot in the bottom-anchored stack, 0 being the topmost.
    BottomStack {
        /// Stack slot.
        slot: usize,
    },
}

/// Computed placement of one visible block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockPlacement {
    /// Block identifier.
    pub block_id: String,
    /// Block type.
    pub block_type: BlockType,
    /// Anchor.
    pub anchor: PlacementAnchor,
    /// Width lane.
    pub category: LayoutCategory,
    /// Maximum width in device pixels.
    pub max_width: f32,
    /// Assigned width: full-width lanes and explicit widths fill it.
    pub width: Option<f32>,
    /// Explicit height in device pixels.
    pub height: Option<f32>,
    /// Paint order among all visible blocks of the screen.
    pub paint_index: usize,
}

/// Placements of every visible block of a screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenLayout {
    /// Screen identifier.
    pub screen_id: String,
    /// Blocks in the canvas flow, in paint order.
    pub canvas: Vec<BlockPlacement>,
    /// Blocks in the bottom stack, top to bottom.
    pub pinned: Vec<BlockPlacement>,
    /// Whether legacy positions were migrated.
    pub migrated: bool,
    /// Width-based scale handed to renderers.
    pub scale_factor: f32,
    /// Height-based scale used for Y positions.
    pub y_scale: f32,
}

impl ScreenLayout {
    /// Look up a placement by block id.
    #[must_use]
    pub fn placement(&self, block_id: &str) -> Option<&BlockPlacement> {
        self.canvas
            .iter()
            .chain(&self.pinned)
            .find(|p| p.block_id == block_id)
    }

    /// Number of placed blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.canvas.len() + self.pinned.len()
    }

    /// Whether nothing is placed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.canvas.is_empty() && self.pinned.is_empty()
    }
}

/// Computes screen layouts for one viewport.
#[derive(Debug, Clone, Copy)]
pub struct LayoutEngine {
    scaler: CoordinateScaler,
    migrator: LegacyMigrator,
}

impl LayoutEngine {
    /// Create an engine with the default legacy migrator.
    #[must_use]
    pub fn new(scaler: CoordinateScaler) -> Self {
        Self {
            scaler,
            migrator: LegacyMigrator::default(),
        }
    }

    /// Replace the legacy migrator.
    #[must_use]
    pub fn with_migrator(mut self, migrator: LegacyMigrator) -> Self {
        self.migrator = migrator;
        self
    }

    /// The scaler in use.
    #[must_use]
    pub const fn scaler(&self) -> &CoordinateScaler {
        &self.scaler
    }

    fn place(&self, block: &ContentBlock, anchor: PlacementAnchor, paint_index: usize) -> BlockPlacement {
        let category = classify(block.block_type, block.declared_full_width());
        let max_width = max_width(block, &self.scaler);
        let width = match (block.explicit_width(), category) {
            (Some(_), _) | (None, LayoutCategory::FullWidth) => Some(max_width),
            (None, LayoutCategory::ContentWidth) => None,
        };
        BlockPlacement {
            block_id: block.id.clone(),
            block_type: block.block_type,
            anchor,
            category,
            max_width,
            width,
            height: block.explicit_height().map(|h| self.scaler.scale(h)),
            paint_index,
        }
    }

    /// Place every visible block of a screen.
    #[must_use]
    pub fn layout_screen(&self, screen: &Screen) -> ScreenLayout {
        let migrated = self.migrator.applies_to_screen(screen);
        if migrated {
            tracing::debug!("Migrating legacy block positions on screen {}", screen.id);
        }

        let canvas_size = self.scaler.canvas();
        let mut canvas = Vec::new();
        let mut pinned = Vec::new();

        for (paint_index, block) in screen.visible_blocks().into_iter().enumerate() {
            if block.pin_to_bottom {
                let anchor = PlacementAnchor::BottomStack { slot: pinned.len() };
                pinned.push(self.place(block, anchor, paint_index));
                continue;
            }

            let logical = match block.position {
                Some(p) if migrated => self.migrator.migrate(p),
                Some(p) => p,
                None => default_position(block.block_type, canvas.len(), canvas_size),
            };
            let anchor = PlacementAnchor::Absolute {
                point: self.scaler.scale_position(logical),
            };
            canvas.push(self.place(block, anchor, paint_index));
        }

        ScreenLayout {
            screen_id: screen.id.clone(),
            canvas,
            pinned,
            migrated,
            scale_factor: self.scaler.uniform_scale(),
            y_scale: self.scaler.y_scale(),
        }
    }
}
