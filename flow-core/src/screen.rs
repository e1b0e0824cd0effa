//! Screens - one full-viewport page of a flow.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::block::ContentBlock;
use crate::transition::TransitionKind;

/// Purpose tag of a screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenType {
    /// Opening screen.
    Welcome,
    /// Feature highlight.
    Feature,
    /// Swipeable carousel.
    Carousel,
    /// Permission prompt.
    Permission,
    /// Closing celebration.
    Celebration,
    /// Screen rendered by native host code.
    Native,
    /// Interstitial screen.
    Filler,
}

/// Screen body: either block-based or legacy fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenContent {
    /// Whether `blocks` should be used instead of the legacy fields.
    #[serde(default)]
    pub use_blocks: bool,
    /// Blocks in declaration order.
    #[serde(default)]
    pub blocks: Vec<ContentBlock>,
    /// Legacy fields (title, subtitle, image, ...), passed through untouched.
    #[serde(flatten)]
    pub legacy: Map<String, Value>,
}

/// A screen of a flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screen {
    /// Screen identifier.
    pub id: String,
    /// Position within the flow as authored.
    #[serde(default)]
    pub order: i32,
    /// Purpose tag.
    #[serde(rename = "type")]
    pub screen_type: ScreenType,
    /// Default transition used when leaving this screen.
    #[serde(default)]
    pub transition: Option<TransitionKind>,
    /// Screen body.
    #[serde(default)]
    pub content: ScreenContent,
}

impl Screen {
    /// Create an empty block-based screen.
    #[must_use]
    pub fn new(id: impl Into<String>, screen_type: ScreenType) -> Self {
        Self {
            id: id.into(),
            order: 0,
            screen_type,
            transition: None,
            content: ScreenContent {
                use_blocks: true,
                ..ScreenContent::default()
            },
        }
    }

    /// Set the default outgoing transition.
    #[must_use]
    pub fn with_transition(mut self, transition: TransitionKind) -> Self {
        self.transition = Some(transition);
        self
    }

    /// Append a block.
    #[must_use]
    pub fn with_block(mut self, block: ContentBlock) -> Self {
        self.content.blocks.push(block);
        self
    }

    /// Whether this screen renders blocks.
    ///
    /// A screen with blocks but no `useBlocks` flag still counts when it has no legacy fields.
    #[must_use]
    pub fn uses_blocks(&self) -> bool {
        self.content.use_blocks
            || (!self.content.blocks.is_empty() && self.content.legacy.is_empty())
    }

    /// All blocks, in declaration order, visible or not.
    #[must_use]
    pub fn blocks(&self) -> &[ContentBlock] {
        &self.content.blocks
    }

    /// Visible blocks in paint order (stable by `order`, ties by declaration order).
    #[must_use]
    pub fn visible_blocks(&self) -> Vec<&ContentBlock> {
        if !self.uses_blocks() {
            return Vec::new();
        }
        let mut blocks: Vec<_> = self.content.blocks.iter().filter(|b| b.visible).collect();
        blocks.sort_by_key(|b| b.order);
        blocks
    }

    /// Visible blocks that take part in the canvas flow.
    #[must_use]
    pub fn canvas_blocks(&self) -> Vec<&ContentBlock> {
        self.visible_blocks()
            .into_iter()
            .filter(|b| !b.pin_to_bottom)
            .collect()
    }

    /// Visible blocks in the bottom-anchored stack.
    #[must_use]
    pub fn pinned_blocks(&self) -> Vec<&ContentBlock> {
        self.visible_blocks()
            .into_iter()
            .filter(|b| b.pin_to_bottom)
            .collect()
    }

    /// Find a visible block by id.
    #[must_use]
    pub fn visible_block(&self, block_id: &str) -> Option<&ContentBlock> {
        self.visible_blocks().into_iter().find(|b| b.id == block_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockType;
    use serde_json::json;

    #[test]
    fn test_parse_block_screen() {
        let screen: Screen = serde_json::from_value(json!({
            "id": "welcome",
            "type": "welcome",
            "transition": "slide-left",
            "content": {
                "useBlocks": true,
                "blocks": [ { "id": "t", "type": "text", "content": { "text": "Hi" } } ]
            }
        }))
        .expect("should parse");

        assert_eq!(screen.screen_type, ScreenType::Welcome);
        assert_eq!(screen.transition, Some(TransitionKind::SlideLeft));
        assert!(screen.uses_blocks());
        assert_eq!(screen.blocks().len(), 1);
    }

    #[test]
    fn test_parse_legacy_screen() {
        let screen: Screen = serde_json::from_value(json!({
            "id": "old",
            "type": "feature",
            "content": { "title": "Track habits", "image": "habits.png" }
        }))
        .expect("should parse");

        assert!(!screen.uses_blocks());
        assert_eq!(screen.content.legacy["title"], "Track habits");
        assert!(screen.visible_blocks().is_empty());
    }

    #[test]
    fn test_visible_blocks_stable_sort() {
        let screen = Screen::new("s", ScreenType::Feature)
            .with_block(ContentBlock::new("c", BlockType::Text).with_order(2))
            .with_block(ContentBlock::new("a", BlockType::Text).with_order(1))
            .with_block(ContentBlock::new("hidden", BlockType::Text).with_visible(false))
            .with_block(ContentBlock::new("b", BlockType::Text).with_order(1))
            .with_block(ContentBlock::new("z", BlockType::Text).with_order(-5));

        let ids: Vec<_> = screen.visible_blocks().iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["z", "a", "b", "c"]);
    }

    #[test]
    fn test_pinned_blocks_split() {
        let screen = Screen::new("s", ScreenType::Feature)
            .with_block(ContentBlock::new("title", BlockType::Text))
            .with_block(ContentBlock::new("cta", BlockType::Button).pinned_to_bottom());

        assert_eq!(screen.canvas_blocks().len(), 1);
        assert_eq!(screen.pinned_blocks()[0].id, "cta");
        assert!(screen.visible_block("cta").is_some());
        assert!(screen.visible_block("missing").is_none());
    }
}
