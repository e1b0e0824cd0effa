//! Renderer registry interface.
//!
//! The core never draws. Hosts register one or more renderers per block type
//! and the registry hands each visible block, together with its computed
//! placement, to the first renderer whose required capability the host
//! supports. Layout and validation never consult capabilities.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::block::{BlockType, ContentBlock};
use crate::layout::{BlockPlacement, ScreenLayout};
use crate::screen::Screen;

/// Optional host rendering features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Gradient fills.
    Gradient,
    /// Platform slider control.
    NativeSlider,
    /// Haptic feedback.
    Haptics,
    /// Lottie animations.
    Lottie,
    /// Video playback.
    Video,
}

/// Reports which optional features the host supports.
pub trait CapabilityProvider {
    /// Whether `capability` is available.
    fn supports(&self, capability: Capability) -> bool;
}

/// Provider that supports everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllCapabilities;

impl CapabilityProvider for AllCapabilities {
    fn supports(&self, _capability: Capability) -> bool {
        true
    }
}

impl CapabilityProvider for [Capability] {
    fn supports(&self, capability: Capability) -> bool {
        self.contains(&capability)
    }
}

impl CapabilityProvider for Vec<Capability> {
    fn supports(&self, capability: Capability) -> bool {
        self.contains(&capability)
    }
}

/// Everything a renderer receives for one block.
#[derive(Debug, Clone, Copy)]
pub struct BlockProps<'a> {
    /// The block, with its raw content.
    pub block: &'a ContentBlock,
    /// Computed position and width constraint.
    pub placement: &'a BlockPlacement,
    /// Uniform scale for sizes, fonts and spacing.
    pub scale_factor: f32,
}

impl BlockProps<'_> {
    /// Width constraint for wrapping text, in device pixels.
    #[must_use]
    pub fn max_width(&self) -> f32 {
        self.placement.max_width
    }
}

/// Renders blocks of one type into host output `O`.
pub trait BlockRenderer<O> {
    /// Render one block.
    fn render(&self, props: &BlockProps<'_>) -> O;

    /// Capability this renderer depends on.
    fn requires(&self) -> Option<Capability> {
        None
    }
}

impl<O, F> BlockRenderer<O> for F
where
    F: Fn(&BlockProps<'_>) -> O,
{
    fn render(&self, props: &BlockProps<'_>) -> O {
        self(props)
    }
}

/// Host hook for `custom` blocks.
pub trait CustomBlockRenderer<O> {
    /// Render a custom block by identifier, or nothing.
    fn render_custom_block(&self, identifier: &str, props: &BlockProps<'_>) -> Option<O>;
}

/// Block renderers keyed by type, with fallback chains.
pub struct RendererRegistry<O> {
    renderers: HashMap<BlockType, Vec<Box<dyn BlockRenderer<O>>>>,
    custom: Option<Box<dyn CustomBlockRenderer<O>>>,
    capabilities: Box<dyn CapabilityProvider>,
}

impl<O> Default for RendererRegistry<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O> RendererRegistry<O> {
    /// Create an empty registry assuming every capability.
    #[must_use]
    pub fn new() -> Self {
        Self {
            renderers: HashMap::new(),
            custom: None,
            capabilities: Box::new(AllCapabilities),
        }
    }

    /// Use a host capability provider.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Box<dyn CapabilityProvider>) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Append a renderer to the chain for `block_type`.
    ///
    /// Earlier registrations take precedence when their capability is available.
    pub fn register(&mut self, block_type: BlockType, renderer: Box<dyn BlockRenderer<O>>) {
        self.renderers.entry(block_type).or_default().push(renderer);
    }

    /// Set the hook for `custom` blocks.
    pub fn set_custom_renderer(&mut self, renderer: Box<dyn CustomBlockRenderer<O>>) {
        self.custom = Some(renderer);
    }

    /// Render one block, or nothing when no renderer applies.
    pub fn render_block(&self, props: &BlockProps<'_>) -> Option<O> {
        if props.block.block_type == BlockType::Custom {
            let identifier = props.block.custom_identifier()?;
            return self
                .custom
                .as_ref()
                .and_then(|hook| hook.render_custom_block(identifier, props));
        }

        let chain = self.renderers.get(&props.block.block_type)?;
        let renderer = chain.iter().find(|r| {
            r.requires()
                .is_none_or(|capability| self.capabilities.supports(capability))
        });
        if renderer.is_none() {
            tracing::debug!(
                "No supported renderer for {} block {}",
                props.block.block_type,
                props.block.id
            );
        }
        renderer.map(|r| r.render(props))
    }

    /// Render every placed block of a screen: canvas flow first, then the bottom stack.
    pub fn render_screen(&self, screen: &Screen, layout: &ScreenLayout) -> Vec<O> {
        layout
            .canvas
            .iter()
            .chain(&layout.pinned)
            .filter_map(|placement| {
                let block = screen.visible_block(&placement.block_id)?;
                self.render_block(&BlockProps {
                    block,
                    placement,
                    scale_factor: layout.scale_factor,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutEngine;
    use crate::scale::{CoordinateScaler, Viewport};
    use crate::screen::ScreenType;
    use serde_json::json;

    struct Lottie;

    impl BlockRenderer<String> for Lottie {
        fn render(&self, props: &BlockProps<'_>) -> String {
            format!("lottie:{}", props.block.id)
        }

        fn requires(&self) -> Option<Capability> {
            Some(Capability::Lottie)
        }
    }

    struct Hook;

    impl CustomBlockRenderer<String> for Hook {
        fn render_custom_block(&self, identifier: &str, _props: &BlockProps<'_>) -> Option<String> {
            (identifier == "map").then(|| "custom:map".to_string())
        }
    }

    fn screen() -> Screen {
        Screen::new("s", ScreenType::Feature)
            .with_block(ContentBlock::new("hero", BlockType::Image))
            .with_block(ContentBlock::new("title", BlockType::Text))
            .with_block(ContentBlock::new("cta", BlockType::Button).pinned_to_bottom())
            .with_block(
                ContentBlock::new("map", BlockType::Custom)
                    .with_content(json!({ "identifier": "map" })),
            )
            .with_block(
                ContentBlock::new("chart", BlockType::Custom)
                    .with_content(json!({ "componentId": "chart" })),
            )
    }

    fn registry(capabilities: Vec<Capability>) -> RendererRegistry<String> {
        let mut registry = RendererRegistry::new().with_capabilities(Box::new(capabilities));
        registry.register(BlockType::Image, Box::new(Lottie));
        registry.register(
            BlockType::Image,
            Box::new(|p: &BlockProps<'_>| format!("image:{}", p.block.id)),
        );
        registry.register(
            BlockType::Button,
            Box::new(|p: &BlockProps<'_>| format!("button:{}:{}", p.block.id, p.max_width())),
        );
        registry.set_custom_renderer(Box::new(Hook));
        registry
    }

    fn layout(screen: &Screen) -> ScreenLayout {
        LayoutEngine::new(CoordinateScaler::for_viewport(Viewport::default())).layout_screen(screen)
    }

    #[test]
    fn test_fallback_chain_respects_capabilities() {
        let screen = screen();
        let layout = layout(&screen);

        let rich = registry(vec![Capability::Lottie]).render_screen(&screen, &layout);
        assert_eq!(rich[0], "lottie:hero");

        let plain = registry(Vec::new()).render_screen(&screen, &layout);
        assert_eq!(plain[0], "image:hero");
    }

    #[test]
    fn test_unregistered_and_custom_blocks() {
        let screen = screen();
        let layout = layout(&screen);
        let output = registry(Vec::new()).render_screen(&screen, &layout);

        // Text has no renderer; chart's hook returns nothing; pinned cta is last.
        assert_eq!(output, vec!["image:hero", "custom:map", "button:cta:345"]);
    }

    #[test]
    fn test_all_capabilities_default() {
        assert!(AllCapabilities.supports(Capability::Video));
        assert!(![Capability::Haptics][..].supports(Capability::Gradient));
    }
}
