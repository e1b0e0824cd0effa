//! Screen-to-screen transitions.
//!
//! Every navigation produces a fresh, immutable [`AnimationPlan`]. The
//! [`TransitionAnimator`] only tracks which plan is in flight so that a late
//! completion callback for a superseded plan can be recognised and ignored.
//!
//! ```text
//!   begin(kind)            finish(ticket)
//! Idle ──────────▶ Animating ──────────────▶ Idle
//!   ▲                 │  begin(kind) again:
//!   └─ kind == none   └─ snap previous plan, start new one
//! ```

use serde::{Deserialize, Serialize};

use crate::config::ScreenTransitionConfig;
use crate::scale::Viewport;
use crate::screen::Screen;

/// Duration shared by every animated transition.
pub const TRANSITION_DURATION_MS: u32 = 300;

/// Starting scale of the `scale` transition.
const SCALE_FROM: f32 = 0.8;

/// Requested transition between two screens.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransitionKind {
    /// Swap without animation.
    None,
    /// Cross-fade the incoming screen in.
    #[default]
    Fade,
    /// Incoming screen enters from the right edge.
    SlideLeft,
    /// Incoming screen enters from the left edge.
    SlideRight,
    /// Incoming screen enters from the bottom edge.
    SlideUp,
    /// Incoming screen enters from the top edge.
    SlideDown,
    /// Fade combined with a horizontal slide, edge chosen by direction.
    FadeSlideLeft,
    /// Fade combined with a horizontal slide, edge chosen by direction.
    FadeSlideRight,
    /// Fade combined with a zoom from 80%.
    Scale,
    /// Any other name; animated as a direction-aware fade-slide.
    Other(String),
}

impl TransitionKind {
    /// Parse a wire name. Unknown names are preserved in [`TransitionKind::Other`].
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            "none" => Self::None,
            "fade" => Self::Fade,
            "slide-left" => Self::SlideLeft,
            "slide-right" => Self::SlideRight,
            "slide-up" => Self::SlideUp,
            "slide-down" => Self::SlideDown,
            "fade-slide-left" => Self::FadeSlideLeft,
            "fade-slide-right" => Self::FadeSlideRight,
            "scale" => Self::Scale,
            other => Self::Other(other.to_string()),
        }
    }

    /// Wire name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::None => "none",
            Self::Fade => "fade",
            Self::SlideLeft => "slide-left",
            Self::SlideRight => "slide-right",
            Self::SlideUp => "slide-up",
            Self::SlideDown => "slide-down",
            Self::FadeSlideLeft => "fade-slide-left",
            Self::FadeSlideRight => "fade-slide-right",
            Self::Scale => "scale",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for TransitionKind {
    fn from(name: String) -> Self {
        Self::parse(&name)
    }
}

impl From<TransitionKind> for String {
    fn from(kind: TransitionKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick the transition for navigating `from` → `to`.
///
/// Explicit overrides win, then the source screen's default, then `fade`.
#[must_use]
pub fn resolve_transition(
    overrides: &ScreenTransitionConfig,
    from: &Screen,
    to: &Screen,
) -> TransitionKind {
    overrides
        .lookup(&from.id, &to.id)
        .or(from.transition.as_ref())
        .cloned()
        .unwrap_or_default()
}

/// Animatable properties of the incoming screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimatedValues {
    /// Opacity, 0..1.
    pub opacity: f32,
    /// Horizontal offset in device pixels.
    pub translate_x: f32,
    /// Vertical offset in device pixels.
    pub translate_y: f32,
    /// Uniform scale factor.
    pub scale: f32,
}

impl AnimatedValues {
    /// Values of a fully settled screen.
    pub const REST: Self = Self {
        opacity: 1.0,
        translate_x: 0.0,
        translate_y: 0.0,
        scale: 1.0,
    };

    fn lerp(from: Self, to: Self, t: f32) -> Self {
        let mix = |a: f32, b: f32| a + (b - a) * t;
        Self {
            opacity: mix(from.opacity, to.opacity),
            translate_x: mix(from.translate_x, to.translate_x),
            translate_y: mix(from.translate_y, to.translate_y),
            scale: mix(from.scale, to.scale),
        }
    }
}

impl Default for AnimatedValues {
    fn default() -> Self {
        Self::REST
    }
}

/// Timing curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Easing {
    /// Constant speed.
    Linear,
    /// Cubic ease-in-ease-out.
    EaseInOut,
}

impl Easing {
    /// Map linear progress `t` in 0..1 to eased progress.
    #[must_use]
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::EaseInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
        }
    }
}

/// Immutable description of one transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationPlan {
    /// Requested kind.
    pub kind: TransitionKind,
    /// Whether navigation moves to a higher screen index.
    pub is_forward: bool,
    /// Values at the start.
    pub from: AnimatedValues,
    /// Values at the end (always rest).
    pub to: AnimatedValues,
    /// Duration in milliseconds; zero for instant swaps.
    pub duration_ms: u32,
    /// Timing curve.
    pub easing: Easing,
}

impl AnimationPlan {
    /// Build the plan for a transition kind on a viewport.
    #[must_use]
    pub fn build(kind: TransitionKind, is_forward: bool, viewport: Viewport) -> Self {
        let rest = AnimatedValues::REST;
        let (w, h) = (viewport.width, viewport.height);
        // Forward fade-slides take the opposite edge from their plain slide.
        let directional = if is_forward { -1.0 } else { 1.0 };

        let from = match &kind {
            TransitionKind::None => rest,
            TransitionKind::Fade => AnimatedValues {
                opacity: 0.0,
                ..rest
            },
            TransitionKind::SlideLeft => AnimatedValues {
                translate_x: w,
                ..rest
            },
            TransitionKind::SlideRight => AnimatedValues {
                translate_x: -w,
                ..rest
            },
            TransitionKind::SlideUp => AnimatedValues {
                translate_y: h,
                ..rest
            },
            TransitionKind::SlideDown => AnimatedValues {
                translate_y: -h,
                ..rest
            },
            TransitionKind::FadeSlideLeft => AnimatedValues {
                opacity: 0.0,
                translate_x: w * directional,
                ..rest
            },
            TransitionKind::FadeSlideRight => AnimatedValues {
                opacity: 0.0,
                translate_x: -w * directional,
                ..rest
            },
            TransitionKind::Scale => AnimatedValues {
                opacity: 0.0,
                scale: SCALE_FROM,
                ..rest
            },
            TransitionKind::Other(_) => AnimatedValues {
                opacity: 0.0,
                translate_x: if is_forward { w } else { -w },
                ..rest
            },
        };

        let duration_ms = if kind == TransitionKind::None {
            0
        } else {
            TRANSITION_DURATION_MS
        };

        Self {
            kind,
            is_forward,
            from,
            to: rest,
            duration_ms,
            easing: Easing::EaseInOut,
        }
    }

    /// Whether the plan applies synchronously.
    #[must_use]
    pub const fn is_instant(&self) -> bool {
        self.duration_ms == 0
    }

    /// Values `elapsed_ms` after the plan started.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn sample(&self, elapsed_ms: u64) -> AnimatedValues {
        if self.is_instant() || elapsed_ms >= u64::from(self.duration_ms) {
            return self.to;
        }
        let t = elapsed_ms as f32 / self.duration_ms as f32;
        AnimatedValues::lerp(self.from, self.to, self.easing.apply(t))
    }
}

/// Identifies one started transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransitionTicket(u64);

/// A transition that has been started on a screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTransition {
    /// Ticket to hand back on completion.
    pub ticket: TransitionTicket,
    /// Screen the plan animates in.
    pub screen_id: String,
    /// The plan.
    pub plan: AnimationPlan,
}

/// Tracks the single in-flight transition of a flow.
#[derive(Debug, Clone, Default)]
pub struct TransitionAnimator {
    active: Option<ActiveTransition>,
    issued: u64,
}

impl TransitionAnimator {
    /// Create an idle animator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a transition animating `screen_id` in.
    ///
    /// A transition still in flight is snapped to rest first; its ticket
    /// becomes stale. `none` applies synchronously and leaves the animator idle.
    pub fn begin(
        &mut self,
        screen_id: &str,
        kind: TransitionKind,
        is_forward: bool,
        viewport: Viewport,
    ) -> ActiveTransition {
        if let Some(previous) = self.active.take() {
            tracing::debug!(
                "Snapping in-flight {} transition on {} to rest",
                previous.plan.kind,
                previous.screen_id
            );
        }

        self.issued += 1;
        let transition = ActiveTransition {
            ticket: TransitionTicket(self.issued),
            screen_id: screen_id.to_string(),
            plan: AnimationPlan::build(kind, is_forward, viewport),
        };

        if !transition.plan.is_instant() {
            self.active = Some(transition.clone());
        }
        transition
    }

    /// Mark a transition finished. Returns `false` for stale or unknown tickets.
    pub fn finish(&mut self, ticket: TransitionTicket) -> bool {
        match &self.active {
            Some(active) if active.ticket == ticket => {
                self.active = None;
                true
            }
            _ => false,
        }
    }

    /// Drop any in-flight transition.
    pub fn snap_to_rest(&mut self) {
        self.active = None;
    }

    /// Whether a transition is in flight.
    #[must_use]
    pub const fn is_animating(&self) -> bool {
        self.active.is_some()
    }

    /// The in-flight transition, if any.
    #[must_use]
    pub const fn active(&self) -> Option<&ActiveTransition> {
        self.active.as_ref()
    }
}
