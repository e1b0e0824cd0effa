//! Flow configuration as delivered by the config source.
//!
//! ## Example
//!
//! ```json
//! {
//!   "version": "3",
//!   "screens": [
//!     { "id": "welcome", "type": "welcome", "transition": "fade",
//!       "content": { "useBlocks": true, "blocks": [
//!         { "id": "title", "type": "text", "content": { "text": "Hello" } }
//!       ] } }
//!   ],
//!   "progressIndicator": { "enabled": true, "variant": "bar", "position": "top" },
//!   "transitions": [ { "fromScreenId": "welcome", "toScreenId": "goals", "transition": "scale" } ],
//!   "experiment": { "id": "exp-42", "variant": "b" }
//! }
//! ```

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::screen::Screen;
use crate::transition::TransitionKind;
use crate::{FlowError, FlowResult};

/// Complete flow as fetched from the config source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowConfig {
    /// Opaque configuration version.
    #[serde(default)]
    pub version: String,
    /// Screens in presentation order.
    #[serde(default)]
    pub screens: Vec<Screen>,
    /// Progress indicator settings.
    #[serde(default)]
    pub progress_indicator: Option<ProgressIndicatorConfig>,
    /// Explicit transition overrides.
    #[serde(default)]
    pub transitions: ScreenTransitionConfig,
    /// Experiment the flow belongs to.
    #[serde(default)]
    pub experiment: Option<Experiment>,
}

/// Experiment assignment reported with `onboarding_started`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experiment {
    /// Experiment identifier.
    pub id: String,
    /// Assigned variant.
    #[serde(default)]
    pub variant: Option<String>,
}

/// Visual style of the progress indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressVariant {
    /// Continuous bar.
    #[default]
    Bar,
    /// One dot per screen.
    Dots,
    /// Segmented bar.
    Segments,
    /// Circular ring.
    Circular,
}

/// Edge the progress indicator is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressPosition {
    /// Above the screen content.
    #[default]
    Top,
    /// Below the screen content.
    Bottom,
}

/// Progress indicator settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressIndicatorConfig {
    /// Whether the indicator is shown.
    #[serde(default)]
    pub enabled: bool,
    /// Visual style.
    #[serde(default)]
    pub variant: ProgressVariant,
    /// Anchor edge.
    #[serde(default)]
    pub position: ProgressPosition,
    /// First screen index counted (default 0).
    #[serde(default)]
    pub start_screen: Option<usize>,
    /// Last screen index counted (default last screen).
    #[serde(default)]
    pub end_screen: Option<usize>,
    /// Screen indices excluded from progress.
    #[serde(default)]
    pub skip_screens: Vec<usize>,
}

/// One explicit transition between two screens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionOverride {
    /// Source screen id.
    pub from_screen_id: String,
    /// Target screen id.
    pub to_screen_id: String,
    /// Transition to use on that edge.
    pub transition: TransitionKind,
}

/// Table of `(from, to) → transition` overrides.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScreenTransitionConfig {
    overrides: Vec<TransitionOverride>,
}

impl ScreenTransitionConfig {
    /// Build a table from overrides. Later entries for the same edge are ignored.
    #[must_use]
    pub fn new(overrides: Vec<TransitionOverride>) -> Self {
        Self { overrides }
    }

    /// Add an override.
    #[must_use]
    pub fn with_override(
        mut self,
        from_screen_id: &str,
        to_screen_id: &str,
        transition: TransitionKind,
    ) -> Self {
        self.overrides.push(TransitionOverride {
            from_screen_id: from_screen_id.to_string(),
            to_screen_id: to_screen_id.to_string(),
            transition,
        });
        self
    }

    /// Exact-match lookup of an edge.
    #[must_use]
    pub fn lookup(&self, from_screen_id: &str, to_screen_id: &str) -> Option<&TransitionKind> {
        self.overrides
            .iter()
            .find(|o| o.from_screen_id == from_screen_id && o.to_screen_id == to_screen_id)
            .map(|o| &o.transition)
    }

    /// All overrides.
    #[must_use]
    pub fn overrides(&self) -> &[TransitionOverride] {
        &self.overrides
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}

impl FlowConfig {
    /// Create a flow from screens with no progress, overrides or experiment.
    #[must_use]
    pub fn new(screens: Vec<Screen>) -> Self {
        Self {
            version: String::new(),
            screens,
            progress_indicator: None,
            transitions: ScreenTransitionConfig::default(),
            experiment: None,
        }
    }

    /// Parse a flow from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid or doesn't match the flow schema.
    pub fn from_json(json: &str) -> FlowResult<Self> {
        serde_json::from_str(json).map_err(FlowError::Serialization)
    }

    /// Serialize the flow to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> FlowResult<String> {
        serde_json::to_string(self).map_err(FlowError::Serialization)
    }

    /// Check that the flow has something to show.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::InvalidConfig`] if the flow has no screens.
    pub fn ensure_renderable(&self) -> FlowResult<()> {
        if self.screens.is_empty() {
            return Err(FlowError::InvalidConfig("flow has no screens".to_string()));
        }
        Ok(())
    }

    /// Index of a screen by id.
    #[must_use]
    pub fn screen_index(&self, screen_id: &str) -> Option<usize> {
        self.screens.iter().position(|s| s.id == screen_id)
    }

    /// Report configuration problems the engine tolerates but authors should fix.
    #[must_use]
    pub fn lint(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let mut seen_screens = HashSet::new();
        for screen in &self.screens {
            if !seen_screens.insert(screen.id.as_str()) {
                warnings.push(format!("duplicate screen id '{}'", screen.id));
            }
        }

        let mut field_owners: HashMap<&str, &str> = HashMap::new();
        for screen in &self.screens {
            for block in screen.blocks() {
                let Some(field) = block.field_name() else {
                    if block.block_type.collects_data() {
                        warnings.push(format!(
                            "{} block '{}' on screen '{}' has no fieldName",
                            block.block_type, block.id, screen.id
                        ));
                    }
                    continue;
                };
                if let Some(owner) = field_owners.insert(field, block.id.as_str()) {
                    warnings.push(format!(
                        "field '{field}' is bound by both '{owner}' and '{}'",
                        block.id
                    ));
                }
            }
        }

        for rule in self.transitions.overrides() {
            for id in [&rule.from_screen_id, &rule.to_screen_id] {
                if !seen_screens.contains(id.as_str()) {
                    warnings.push(format!("transition override references unknown screen '{id}'"));
                }
            }
        }

        if let Some(progress) = &self.progress_indicator {
            let last = self.screens.len().saturating_sub(1);
            if progress.start_screen.is_some_and(|s| s > last) {
                warnings.push("progressIndicator.startScreen is past the last screen".to_string());
            }
            if progress.end_screen.is_some_and(|e| e > last) {
                warnings.push("progressIndicator.endScreen is past the last screen".to_string());
            }
        }

        warnings
    }
}
