//! Flow controller: navigation, collected data and lifecycle telemetry.
//!
//! The controller exclusively owns the current index, the collected data and
//! the validation errors. Hosts read snapshots and write through
//! [`FlowController::handle_action`], [`FlowController::handle_button_tap`]
//! and [`FlowController::on_data_change`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::FlowConfig;
use crate::data::{CollectedData, FieldValue};
use crate::event::{FlowAction, TelemetryEvent, TelemetryEventType, TelemetrySink};
use crate::layout::{LayoutEngine, ScreenLayout};
use crate::scale::{CoordinateScaler, Viewport};
use crate::screen::Screen;
use crate::transition::{resolve_transition, ActiveTransition, TransitionAnimator, TransitionTicket};
use crate::validation::{validate_screen, ValidationErrors};

/// Host callbacks for flow outcomes.
pub trait FlowObserver {
    /// Called once when the flow completes.
    fn on_complete(&mut self, data: &CollectedData);

    /// Called for `custom` actions.
    fn on_custom_action(&mut self, identifier: &str) {
        let _ = identifier;
    }
}

/// What a call to the controller did.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// The current screen changed.
    Navigated {
        /// Previous index.
        from: usize,
        /// New index.
        to: usize,
        /// Transition started on the new screen.
        transition: ActiveTransition,
    },
    /// The flow completed and the observer was notified.
    Completed,
    /// Validation failed; the current screen is unchanged.
    Blocked {
        /// Failing field names.
        errors: ValidationErrors,
    },
    /// A custom action was forwarded to the observer.
    Forwarded {
        /// Host-defined identifier.
        identifier: String,
    },
    /// Nothing happened.
    Ignored,
}

/// Read-only view of the controller state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSnapshot {
    /// Current screen index.
    pub current_index: usize,
    /// Current screen id.
    pub screen_id: Option<String>,
    /// Data collected so far.
    pub collected_data: CollectedData,
    /// Fields failing validation on the current screen.
    pub validation_errors: ValidationErrors,
    /// Progress fraction, when the indicator is enabled.
    pub progress: Option<f32>,
    /// Whether a transition is in flight.
    pub animating: bool,
    /// Transition in flight.
    pub transition: Option<ActiveTransition>,
    /// Whether the flow has completed.
    pub completed: bool,
}

/// Drives one rendering session of a flow.
pub struct FlowController {
    config: FlowConfig,
    viewport: Viewport,
    telemetry: Arc<dyn TelemetrySink>,
    observer: Option<Box<dyn FlowObserver>>,
    current_index: usize,
    collected_data: CollectedData,
    validation_errors: ValidationErrors,
    animator: TransitionAnimator,
    started: bool,
    completed: bool,
    last_viewed: Option<String>,
}

impl FlowController {
    /// Create a controller positioned on the first screen.
    #[must_use]
    pub fn new(config: FlowConfig, viewport: Viewport, telemetry: Arc<dyn TelemetrySink>) -> Self {
        Self {
            config,
            viewport,
            telemetry,
            observer: None,
            current_index: 0,
            collected_data: CollectedData::new(),
            validation_errors: ValidationErrors::new(),
            animator: TransitionAnimator::new(),
            started: false,
            completed: false,
            last_viewed: None,
        }
    }

    /// Attach host callbacks.
    #[must_use]
    pub fn with_observer(mut self, observer: Box<dyn FlowObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Start the session: emits `onboarding_started` once and views the first screen.
    ///
    /// Idempotent. Called implicitly by the first action.
    pub fn mount(&mut self) {
        if !self.started {
            self.started = true;
            let mut event = TelemetryEvent::new(TelemetryEventType::OnboardingStarted, None)
                .with_property("totalScreens", self.config.screens.len())
                .with_property("version", self.config.version.clone());
            if let Some(experiment) = &self.config.experiment {
                event = event.with_property("experimentId", experiment.id.clone());
                if let Some(variant) = &experiment.variant {
                    event = event.with_property("experimentVariant", variant.clone());
                }
            }
            tracing::info!(
                "Onboarding flow started with {} screens",
                self.config.screens.len()
            );
            self.telemetry.track(event);
        }
        self.record_screen_view();
    }

    fn record_screen_view(&mut self) {
        let Some(screen) = self.config.screens.get(self.current_index) else {
            return;
        };
        if self.last_viewed.as_deref() == Some(screen.id.as_str()) {
            return;
        }
        self.last_viewed = Some(screen.id.clone());
        self.telemetry.track(
            TelemetryEvent::new(TelemetryEventType::ScreenViewed, Some(&screen.id))
                .with_property("screenIndex", self.current_index)
                .with_property(
                    "screenType",
                    serde_json::to_value(screen.screen_type).unwrap_or_default(),
                ),
        );
    }

    /// Dispatch a navigation intent.
    pub fn handle_action(&mut self, action: &FlowAction) -> ActionOutcome {
        self.mount();

        let screen_target = match action {
            FlowAction::Screen { screen_id } => {
                let Some(target) = self.config.screen_index(screen_id) else {
                    tracing::warn!("Ignoring navigation to unknown screen {screen_id}");
                    return ActionOutcome::Ignored;
                };
                Some(target)
            }
            _ => None,
        };

        if action.requires_validation() && !self.validate_current() {
            tracing::debug!(
                "{} blocked by validation: {:?}",
                action.kind(),
                self.validation_errors
            );
            return ActionOutcome::Blocked {
                errors: self.validation_errors.clone(),
            };
        }

        match action {
            FlowAction::Next => {
                if self.config.screens.is_empty() {
                    ActionOutcome::Ignored
                } else if self.is_last_screen() {
                    self.complete()
                } else {
                    self.navigate_to(self.current_index + 1)
                }
            }
            FlowAction::Previous => match self.current_index.checked_sub(1) {
                Some(target) => self.navigate_to(target),
                None => ActionOutcome::Ignored,
            },
            FlowAction::Screen { .. } => match screen_target {
                Some(target) => self.navigate_to(target),
                None => ActionOutcome::Ignored,
            },
            FlowAction::Complete => self.complete(),
            FlowAction::Custom { identifier } => {
                self.telemetry.track(
                    TelemetryEvent::new(TelemetryEventType::CustomAction, self.current_screen_id())
                        .with_property("identifier", identifier.clone()),
                );
                if let Some(observer) = self.observer.as_mut() {
                    observer.on_custom_action(identifier);
                }
                ActionOutcome::Forwarded {
                    identifier: identifier.clone(),
                }
            }
        }
    }

    /// Handle a tap on a button block of the current screen.
    ///
    /// Emits `button_tapped` and dispatches the button's action. Unknown or
    /// non-button blocks are ignored.
    pub fn handle_button_tap(&mut self, block_id: &str) -> ActionOutcome {
        self.mount();

        let Some((screen_id, action)) = self.current_screen().and_then(|screen| {
            let action = screen.visible_block(block_id)?.action()?;
            Some((screen.id.clone(), action))
        }) else {
            tracing::debug!("Ignoring tap on {block_id}: not a visible button with a readable action");
            return ActionOutcome::Ignored;
        };

        self.telemetry.track(
            TelemetryEvent::new(TelemetryEventType::ButtonTapped, Some(&screen_id))
                .with_property("blockId", block_id)
                .with_property("action", action.kind()),
        );
        self.handle_action(&action)
    }

    /// Move to `target` without validation.
    ///
    /// Out-of-range targets and the current index are no-ops. The index is
    /// committed before the transition starts so the plan animates the new
    /// screen's content.
    pub fn navigate_to(&mut self, target: usize) -> ActionOutcome {
        self.mount();

        if target >= self.config.screens.len() || target == self.current_index {
            tracing::debug!(
                "Ignoring navigation to {target} (current {}, {} screens)",
                self.current_index,
                self.config.screens.len()
            );
            return ActionOutcome::Ignored;
        }

        let from = self.current_index;
        let is_forward = target > from;
        let (outgoing, incoming, kind) = {
            let from_screen = &self.config.screens[from];
            let to_screen = &self.config.screens[target];
            (
                from_screen.id.clone(),
                to_screen.id.clone(),
                resolve_transition(&self.config.transitions, from_screen, to_screen),
            )
        };

        self.current_index = target;
        self.validation_errors.clear();

        self.telemetry.track(
            TelemetryEvent::new(TelemetryEventType::ScreenCompleted, Some(&outgoing))
                .with_property("screenIndex", from)
                .with_property("toScreenId", incoming.clone())
                .with_property("direction", if is_forward { "forward" } else { "backward" }),
        );

        tracing::debug!("Navigating {outgoing} -> {incoming} with {kind} transition");
        let transition = self.animator.begin(&incoming, kind, is_forward, self.viewport);
        self.record_screen_view();

        ActionOutcome::Navigated {
            from,
            to: target,
            transition,
        }
    }

    fn complete(&mut self) -> ActionOutcome {
        if self.completed {
            tracing::debug!("Flow already completed, ignoring completion");
            return ActionOutcome::Ignored;
        }
        self.completed = true;
        self.animator.snap_to_rest();

        self.telemetry.track(
            TelemetryEvent::new(TelemetryEventType::OnboardingCompleted, self.current_screen_id())
                .with_property("screenIndex", self.current_index)
                .with_property("fieldCount", self.collected_data.len()),
        );
        tracing::info!("Onboarding flow completed on screen {}", self.current_index);

        if let Some(observer) = self.observer.as_mut() {
            observer.on_complete(&self.collected_data);
        }
        ActionOutcome::Completed
    }

    /// Record a field value and clear that field's validation error.
    pub fn on_data_change(&mut self, field_name: &str, value: impl Into<FieldValue>) {
        self.collected_data
            .insert(field_name.to_string(), value.into());
        self.validation_errors.remove(field_name);
    }

    /// Re-run validation on the current screen, replacing the error set.
    pub fn validate_current(&mut self) -> bool {
        self.validation_errors = self
            .current_screen()
            .map(|screen| validate_screen(screen, &self.collected_data))
            .unwrap_or_default();
        self.validation_errors.is_empty()
    }

    /// Completion callback from the host's animation clock.
    ///
    /// Returns `false` when the ticket belongs to a superseded transition.
    pub fn finish_transition(&mut self, ticket: TransitionTicket) -> bool {
        self.animator.finish(ticket)
    }

    /// Update the viewport, e.g. after rotation.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Placements of the current screen at the current viewport.
    #[must_use]
    pub fn current_layout(&self) -> Option<ScreenLayout> {
        let engine = LayoutEngine::new(CoordinateScaler::for_viewport(self.viewport));
        self.current_screen().map(|screen| engine.layout_screen(screen))
    }

    /// The flow configuration.
    #[must_use]
    pub const fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// The viewport.
    #[must_use]
    pub const fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Current screen index.
    #[must_use]
    pub const fn current_index(&self) -> usize {
        self.current_index
    }

    /// Current screen.
    #[must_use]
    pub fn current_screen(&self) -> Option<&Screen> {
        self.config.screens.get(self.current_index)
    }

    fn current_screen_id(&self) -> Option<&str> {
        self.current_screen().map(|s| s.id.as_str())
    }

    fn is_last_screen(&self) -> bool {
        self.current_index + 1 >= self.config.screens.len()
    }

    /// Data collected so far.
    #[must_use]
    pub const fn collected_data(&self) -> &CollectedData {
        &self.collected_data
    }

    /// Fields failing validation on the current screen.
    #[must_use]
    pub const fn validation_errors(&self) -> &ValidationErrors {
        &self.validation_errors
    }

    /// Whether a transition is in flight.
    #[must_use]
    pub const fn is_animating(&self) -> bool {
        self.animator.is_animating()
    }

    /// The transition in flight.
    #[must_use]
    pub const fn active_transition(&self) -> Option<&ActiveTransition> {
        self.animator.active()
    }

    /// Whether the flow has completed.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.completed
    }

    /// Progress fraction at the current index, when enabled.
    #[must_use]
    pub fn progress(&self) -> Option<f32> {
        self.config
            .progress_indicator
            .as_ref()
            .and_then(|p| p.fraction(self.current_index, self.config.screens.len()))
    }

    /// Snapshot of the controller state.
    #[must_use]
    pub fn snapshot(&self) -> FlowSnapshot {
        FlowSnapshot {
            current_index: self.current_index,
            screen_id: self.current_screen_id().map(str::to_string),
            collected_data: self.collected_data.clone(),
            validation_errors: self.validation_errors.clone(),
            progress: self.progress(),
            animating: self.animator.is_animating(),
            transition: self.animator.active().cloned(),
            completed: self.completed,
        }
    }
}
