//! Content blocks - the building blocks of screens.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::FlowAction;

/// The declared type of a content block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockType {
    /// Text label or paragraph.
    Text,
    /// Static image.
    Image,
    /// Video clip.
    Video,
    /// Lottie animation.
    Lottie,
    /// Icon glyph.
    Icon,
    /// Tappable button carrying a flow action.
    Button,
    /// Empty vertical space.
    Spacer,
    /// Horizontal rule.
    Divider,
    /// Text input bound to a field.
    Input,
    /// Multi-choice checklist bound to a field.
    Checklist,
    /// Numeric slider bound to a field.
    Slider,
    /// Static progress bar.
    Progress,
    /// Card highlighting a product feature.
    FeatureCard,
    /// Scrollable container of nested content.
    ScrollContainer,
    /// Host-rendered block, looked up by identifier.
    Custom,
}

impl BlockType {
    /// Wire name of this block type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
            Self::Lottie => "lottie",
            Self::Icon => "icon",
            Self::Button => "button",
            Self::Spacer => "spacer",
            Self::Divider => "divider",
            Self::Input => "input",
            Self::Checklist => "checklist",
            Self::Slider => "slider",
            Self::Progress => "progress",
            Self::FeatureCard => "feature-card",
            Self::ScrollContainer => "scroll-container",
            Self::Custom => "custom",
        }
    }

    /// Whether blocks of this type write into the collected data.
    #[must_use]
    pub const fn collects_data(self) -> bool {
        matches!(self, Self::Input | Self::Checklist | Self::Slider)
    }
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point in logical canvas units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// X from the left edge of the canvas.
    pub x: f32,
    /// Y from the top edge of the canvas.
    pub y: f32,
}

impl Position {
    /// Create a position.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A styling dimension: either logical units or a relative string such as `"100%"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dimension {
    /// Logical canvas units.
    Points(f32),
    /// Relative or keyword value, left to the renderer.
    Relative(String),
}

impl Dimension {
    /// The explicit numeric value, if any.
    #[must_use]
    pub fn points(&self) -> Option<f32> {
        match self {
            Self::Points(value) => Some(*value),
            Self::Relative(_) => None,
        }
    }
}

/// Optional visual styling of a block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockStyling {
    /// Inner padding in logical units.
    #[serde(default)]
    pub padding: Option<f32>,
    /// Outer margin in logical units.
    #[serde(default)]
    pub margin: Option<f32>,
    /// Explicit width.
    #[serde(default)]
    pub width: Option<Dimension>,
    /// Explicit height.
    #[serde(default)]
    pub height: Option<Dimension>,
    /// Border width in logical units.
    #[serde(default)]
    pub border_width: Option<f32>,
    /// Border color as hex.
    #[serde(default)]
    pub border_color: Option<String>,
    /// Corner radius in logical units.
    #[serde(default)]
    pub border_radius: Option<f32>,
    /// Background color as hex.
    #[serde(default)]
    pub background_color: Option<String>,
    /// Shadow description, passed through to the renderer.
    #[serde(default)]
    pub shadow: Option<Value>,
    /// Rotation in degrees.
    #[serde(default)]
    pub rotation: Option<f32>,
}

impl BlockStyling {
    /// Explicit numeric width in logical units.
    #[must_use]
    pub fn explicit_width(&self) -> Option<f32> {
        self.width.as_ref().and_then(Dimension::points)
    }

    /// Explicit numeric height in logical units.
    #[must_use]
    pub fn explicit_height(&self) -> Option<f32> {
        self.height.as_ref().and_then(Dimension::points)
    }
}

/// Entrance animation of a block, independent of screen transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockAnimation {
    /// Animation name, e.g. `fade-in` or `slide-up`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Delay before the animation starts, in milliseconds.
    #[serde(default)]
    pub delay: u32,
    /// Animation duration in milliseconds.
    #[serde(default = "BlockAnimation::default_duration")]
    pub duration: u32,
}

impl BlockAnimation {
    const fn default_duration() -> u32 {
        300
    }
}

/// A block placed on a screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBlock {
    /// Block identifier.
    pub id: String,
    /// Declared block type.
    #[serde(rename = "type")]
    pub block_type: BlockType,
    /// Paint/layout order. Only relative order matters.
    #[serde(default)]
    pub order: i32,
    /// Explicit position in logical canvas units.
    #[serde(default)]
    pub position: Option<Position>,
    /// Invisible blocks are excluded from layout and validation.
    #[serde(default = "ContentBlock::default_visible")]
    pub visible: bool,
    /// Place the block in the bottom-anchored stack.
    #[serde(default)]
    pub pin_to_bottom: bool,
    /// Optional styling.
    #[serde(default)]
    pub styling: Option<BlockStyling>,
    /// Optional entrance animation.
    #[serde(default)]
    pub animation: Option<BlockAnimation>,
    /// Type-specific payload.
    #[serde(default)]
    pub content: Value,
}

impl ContentBlock {
    const fn default_visible() -> bool {
        true
    }

    /// Create a visible block with an empty payload.
    #[must_use]
    pub fn new(id: impl Into<String>, block_type: BlockType) -> Self {
        Self {
            id: id.into(),
            block_type,
            order: 0,
            position: None,
            visible: true,
            pin_to_bottom: false,
            styling: None,
            animation: None,
            content: Value::Object(serde_json::Map::new()),
        }
    }

    /// Set the order.
    #[must_use]
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Set an explicit position.
    #[must_use]
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = Some(Position::new(x, y));
        self
    }

    /// Set the payload.
    #[must_use]
    pub fn with_content(mut self, content: Value) -> Self {
        self.content = content;
        self
    }

    /// Set the styling.
    #[must_use]
    pub fn with_styling(mut self, styling: BlockStyling) -> Self {
        self.styling = Some(styling);
        self
    }

    /// Set visibility.
    #[must_use]
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Pin to the bottom stack.
    #[must_use]
    pub fn pinned_to_bottom(mut self) -> Self {
        self.pin_to_bottom = true;
        self
    }

    fn content_str(&self, key: &str) -> Option<&str> {
        self.content.get(key).and_then(Value::as_str)
    }

    /// Field bound by an input, checklist or slider block.
    #[must_use]
    pub fn field_name(&self) -> Option<&str> {
        if !self.block_type.collects_data() {
            return None;
        }
        self.content_str("fieldName").filter(|name| !name.is_empty())
    }

    /// Whether an input block is required.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.block_type == BlockType::Input
            && self
                .content
                .get("required")
                .and_then(Value::as_bool)
                .unwrap_or(false)
    }

    /// Minimum number of selections for a checklist block (0 when unset).
    #[must_use]
    pub fn min_selections(&self) -> u64 {
        if self.block_type != BlockType::Checklist {
            return 0;
        }
        self.content
            .get("minSelections")
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }

    /// The `fullWidth` flag of a button, when declared.
    #[must_use]
    pub fn declared_full_width(&self) -> Option<bool> {
        self.content.get("fullWidth").and_then(Value::as_bool)
    }

    /// Identifier of a custom block.
    #[must_use]
    pub fn custom_identifier(&self) -> Option<&str> {
        if self.block_type != BlockType::Custom {
            return None;
        }
        self.content_str("identifier")
            .or_else(|| self.content_str("componentId"))
    }

    /// Action carried by a button block.
    ///
    /// Buttons without an action advance. Buttons whose action cannot be read
    /// have none, so taps on them are ignored.
    #[must_use]
    pub fn action(&self) -> Option<FlowAction> {
        if self.block_type != BlockType::Button {
            return None;
        }
        let action = match self.content.get("action") {
            None | Some(Value::Null) => return Some(FlowAction::Next),
            Some(Value::String(kind)) => FlowAction::from_kind(kind),
            Some(value) => serde_json::from_value(value.clone()).ok(),
        };
        if action.is_none() {
            tracing::warn!("Button {} has an unreadable action, taps are ignored", self.id);
        }
        action
    }

    /// Explicit numeric width from styling, in logical units.
    #[must_use]
    pub fn explicit_width(&self) -> Option<f32> {
        self.styling.as_ref().and_then(BlockStyling::explicit_width)
    }

    /// Explicit numeric height from styling, in logical units.
    #[must_use]
    pub fn explicit_height(&self) -> Option<f32> {
        self.styling.as_ref().and_then(BlockStyling::explicit_height)
    }
}
