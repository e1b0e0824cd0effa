//! Navigation intents and lifecycle telemetry.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A navigation intent raised by a button or the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FlowAction {
    /// Advance one screen, or complete the flow on the last screen.
    Next,
    /// Go back one screen.
    Previous,
    /// Jump to a screen by id.
    Screen {
        /// Target screen id.
        #[serde(rename = "screenId")]
        screen_id: String,
    },
    /// Complete the flow from any screen.
    Complete,
    /// Forward an identifier to the host without navigating.
    Custom {
        /// Host-defined identifier.
        identifier: String,
    },
}

impl FlowAction {
    /// Parse a bare action kind (`next`, `previous`, `complete`).
    #[must_use]
    pub fn from_kind(kind: &str) -> Option<Self> {
        match kind {
            "next" => Some(Self::Next),
            "previous" | "back" => Some(Self::Previous),
            "complete" => Some(Self::Complete),
            _ => None,
        }
    }

    /// Wire name of the action kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Next => "next",
            Self::Previous => "previous",
            Self::Screen { .. } => "screen",
            Self::Complete => "complete",
            Self::Custom { .. } => "custom",
        }
    }

    /// Whether field validation gates this action.
    #[must_use]
    pub const fn requires_validation(&self) -> bool {
        matches!(self, Self::Next | Self::Screen { .. } | Self::Complete)
    }
}

/// Lifecycle event types reported to the telemetry sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryEventType {
    /// A screen became the current screen.
    ScreenViewed,
    /// The user navigated away from a screen.
    ScreenCompleted,
    /// The flow was mounted for the first time.
    OnboardingStarted,
    /// The flow finished.
    OnboardingCompleted,
    /// A button block was tapped.
    ButtonTapped,
    /// A custom action was forwarded to the host.
    CustomAction,
}

/// A telemetry event emitted by the flow controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryEvent {
    /// Event type.
    pub event_type: TelemetryEventType,
    /// Screen the event relates to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_id: Option<String>,
    /// Free-form properties.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
}

impl TelemetryEvent {
    /// Create an event without properties.
    #[must_use]
    pub fn new(event_type: TelemetryEventType, screen_id: Option<&str>) -> Self {
        Self {
            event_type,
            screen_id: screen_id.map(str::to_string),
            properties: Map::new(),
        }
    }

    /// Attach a property.
    #[must_use]
    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }
}

/// Fire-and-forget receiver of telemetry events.
///
/// Delivery, batching and retry are the sink's responsibility.
pub trait TelemetrySink: Send + Sync {
    /// Record an event.
    fn track(&self, event: TelemetryEvent);
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl TelemetrySink for NoopTelemetry {
    fn track(&self, _event: TelemetryEvent) {}
}

/// Sink that keeps events in memory, for hosts that drain them on their own schedule.
#[derive(Debug, Default)]
pub struct MemoryTelemetry {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl MemoryTelemetry {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Remove and return all recorded events.
    pub fn drain(&self) -> Vec<TelemetryEvent> {
        std::mem::take(
            &mut *self
                .events
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
        )
    }

    /// Recorded events of one type.
    #[must_use]
    pub fn of_type(&self, event_type: TelemetryEventType) -> Vec<TelemetryEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }
}

impl TelemetrySink for MemoryTelemetry {
    fn track(&self, event: TelemetryEvent) {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(event);
    }
}
