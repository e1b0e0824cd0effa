//! # Flow Core
//!
//! Rendering and layout engine for server-driven onboarding flows.
//! Compiles to WASM for embedding in mobile hosts.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                flow-core.wasm               │
//! ├─────────────────────────────────────────────┤
//! │  Flow Model      │  Layout Engine           │
//! │  - Screens       │  - Coordinate scaling    │
//! │  - Blocks        │  - Legacy migration      │
//! │  - Actions       │  - Width lanes           │
//! ├─────────────────────────────────────────────┤
//! │  Flow Controller │  Transition Animator     │
//! │  - Navigation    │  - Animation plans       │
//! │  - Validation    │  - Stale ticket guard    │
//! │  - Telemetry     │  - Progress indicator    │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod block;
pub mod config;
pub mod controller;
pub mod data;
pub mod error;
pub mod event;
pub mod layout;
pub mod migrate;
pub mod progress;
pub mod renderer;
pub mod scale;
pub mod screen;
pub mod transition;
pub mod validation;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use block::{BlockAnimation, BlockStyling, BlockType, ContentBlock, Dimension, Position};
pub use config::{
    Experiment, FlowConfig, ProgressIndicatorConfig, ProgressPosition, ProgressVariant,
    ScreenTransitionConfig, TransitionOverride,
};
pub use controller::{ActionOutcome, FlowController, FlowObserver, FlowSnapshot};
pub use data::{CollectedData, FieldValue};
pub use error::{FlowError, FlowResult};
pub use event::{
    FlowAction, MemoryTelemetry, NoopTelemetry, TelemetryEvent, TelemetryEventType, TelemetrySink,
};
pub use layout::{BlockPlacement, LayoutCategory, LayoutEngine, PlacementAnchor, ScreenLayout};
pub use migrate::LegacyMigrator;
pub use progress::progress_fraction;
pub use renderer::{
    AllCapabilities, BlockProps, BlockRenderer, Capability, CapabilityProvider,
    CustomBlockRenderer, RendererRegistry,
};
pub use scale::{CanvasSize, CoordinateScaler, DevicePoint, Viewport, DESIGN_CANVAS, LEGACY_CANVAS};
pub use screen::{Screen, ScreenContent, ScreenType};
pub use transition::{
    ActiveTransition, AnimatedValues, AnimationPlan, Easing, TransitionAnimator, TransitionKind,
    TransitionTicket, TRANSITION_DURATION_MS,
};
pub use validation::{validate_screen, ValidationErrors};

/// Flow core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
