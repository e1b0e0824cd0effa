//! # Flow CLI
//!
//! Command-line companion for onboarding flow authors.
//!
//! ## Usage
//!
//! ```bash
//! # Placements of a screen on an iPhone SE sized viewport
//! flow-cli layout flow.json --screen welcome --width 375 --height 667
//!
//! # Authoring problems the engine tolerates
//! flow-cli lint flow.json
//!
//! # Dry-run a session
//! flow-cli run flow.json --set name=Ada --action next --action complete
//!
//! # Fetch the live flow
//! ONBOARDING_API_KEY=... flow-cli fetch --base-url https://api.example.com
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use clap::{Args, Parser, Subcommand};
use flow_client::{ConfigOrigin, OnboardingClient, SdkConfig};
use flow_core::{
    ActionOutcome, CoordinateScaler, FieldValue, FlowAction, FlowConfig, FlowController,
    LayoutEngine, LegacyMigrator, MemoryTelemetry, Viewport, DESIGN_CANVAS,
};
use serde::Serialize;

/// Command-line arguments for flow-cli.
#[derive(Debug, Clone, Parser)]
#[command(name = "flow-cli")]
#[command(about = "Inspect, lint and dry-run onboarding flows")]
#[command(version)]
pub struct CliArgs {
    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the computed layout of a screen as JSON.
    Layout(LayoutArgs),
    /// Report authoring problems in a flow file.
    Lint {
        /// Flow configuration file.
        file: PathBuf,
    },
    /// Drive a session through a sequence of actions.
    Run(RunArgs),
    /// Fetch the flow from the backend and print it.
    Fetch(FetchArgs),
}

/// Arguments of `layout`.
#[derive(Debug, Clone, Args)]
pub struct LayoutArgs {
    /// Flow configuration file.
    pub file: PathBuf,
    /// Screen id or index; defaults to the first screen.
    #[arg(long)]
    pub screen: Option<String>,
    /// Viewport width in device pixels.
    #[arg(long, default_value_t = DESIGN_CANVAS.width)]
    pub width: f32,
    /// Viewport height in device pixels.
    #[arg(long, default_value_t = DESIGN_CANVAS.height)]
    pub height: f32,
}

/// Arguments of `run`.
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Flow configuration file.
    pub file: PathBuf,
    /// Field values applied before the actions, as `field=value`.
    /// Comma-separated values become a selection list.
    #[arg(long = "set", value_name = "FIELD=VALUE")]
    pub set: Vec<String>,
    /// Actions in order: `next`, `previous`, `complete`, `screen:<id>`,
    /// `custom:<identifier>` or `tap:<block id>`.
    #[arg(long = "action", value_name = "ACTION")]
    pub actions: Vec<String>,
}

/// Arguments of `fetch`.
#[derive(Debug, Clone, Args)]
pub struct FetchArgs {
    /// Backend base URL.
    #[arg(long, env = "ONBOARDING_BASE_URL", default_value = flow_client::config::DEFAULT_BASE_URL)]
    pub base_url: String,
    /// API key.
    #[arg(long, env = "ONBOARDING_API_KEY", hide_env_values = true)]
    pub api_key: String,
    /// Directory for the config cache; in-memory when unset.
    #[arg(long, env = "ONBOARDING_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
    /// Print the whole configuration instead of a summary.
    #[arg(long)]
    pub json: bool,
}

/// One step of a dry run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// A navigation intent.
    Action(FlowAction),
    /// A button tap by block id.
    Tap(String),
}

/// Parse a `--action` value.
///
/// # Errors
///
/// Returns an error for unknown action kinds or empty targets.
pub fn parse_step(raw: &str) -> anyhow::Result<Step> {
    if let Some(action) = FlowAction::from_kind(raw) {
        return Ok(Step::Action(action));
    }
    let (kind, target) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("unknown action '{raw}'"))?;
    if target.is_empty() {
        bail!("action '{kind}' needs a target");
    }
    match kind {
        "screen" => Ok(Step::Action(FlowAction::Screen {
            screen_id: target.to_string(),
        })),
        "custom" => Ok(Step::Action(FlowAction::Custom {
            identifier: target.to_string(),
        })),
        "tap" => Ok(Step::Tap(target.to_string())),
        _ => bail!("unknown action '{raw}'"),
    }
}

/// Parse a `--set` value into a field name and value.
///
/// # Errors
///
/// Returns an error if there is no `=` or the field name is empty.
pub fn parse_assignment(raw: &str) -> anyhow::Result<(String, FieldValue)> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected FIELD=VALUE, got '{raw}'"))?;
    let field = field.trim();
    if field.is_empty() {
        bail!("empty field name in '{raw}'");
    }
    let value = if value.contains(',') {
        FieldValue::from(
            value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>(),
        )
    } else {
        FieldValue::from(value)
    };
    Ok((field.to_string(), value))
}

/// Read and parse a flow file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a flow configuration.
pub fn load_flow(path: &Path) -> anyhow::Result<FlowConfig> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config = FlowConfig::from_json(&json)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(config)
}

/// `layout`: JSON placements of one screen.
///
/// # Errors
///
/// Returns an error if the flow cannot be loaded or the screen is unknown.
pub fn layout(args: &LayoutArgs) -> anyhow::Result<String> {
    let config = load_flow(&args.file)?;
    config.ensure_renderable()?;
    let index = match &args.screen {
        Some(key) => config
            .screen_index(key)
            .or_else(|| key.parse::<usize>().ok().filter(|i| *i < config.screens.len()))
            .ok_or_else(|| anyhow!("no screen '{key}' in {}", args.file.display()))?,
        None => 0,
    };
    let screen = &config.screens[index];
    let viewport = Viewport::new(args.width, args.height);
    let engine = LayoutEngine::new(CoordinateScaler::for_viewport(viewport));
    let layout = engine.layout_screen(screen);
    Ok(serde_json::to_string_pretty(&layout)?)
}

/// `lint`: one line per problem, or `ok`.
///
/// # Errors
///
/// Returns an error if the flow cannot be loaded or has nothing to render.
pub fn lint(file: &Path) -> anyhow::Result<String> {
    let config = load_flow(file)?;
    config.ensure_renderable()?;

    let mut lines = config.lint();
    let migrator = LegacyMigrator::default();
    for screen in &config.screens {
        if migrator.applies_to_screen(screen) {
            lines.push(format!(
                "screen '{}' uses legacy canvas coordinates and will be migrated",
                screen.id
            ));
        }
    }

    if lines.is_empty() {
        Ok("ok".to_string())
    } else {
        Ok(lines.join("\n"))
    }
}

/// Result of a dry run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// What each step did.
    pub steps: Vec<String>,
    /// Final controller state.
    pub snapshot: flow_core::FlowSnapshot,
    /// Telemetry emitted during the run.
    pub events: Vec<flow_core::TelemetryEvent>,
}

/// `run`: drive a controller and report the outcome.
///
/// Transitions are finished immediately after each step.
///
/// # Errors
///
/// Returns an error if the flow cannot be loaded or an argument is malformed.
pub fn run(args: &RunArgs) -> anyhow::Result<RunReport> {
    let config = load_flow(&args.file)?;
    config.ensure_renderable()?;
    let assignments = args
        .set
        .iter()
        .map(|raw| parse_assignment(raw))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let steps = args
        .actions
        .iter()
        .map(|raw| parse_step(raw))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let telemetry = Arc::new(MemoryTelemetry::new());
    let mut controller = FlowController::new(config, Viewport::default(), telemetry.clone());
    controller.mount();
    for (field, value) in assignments {
        controller.on_data_change(&field, value);
    }

    let mut described = Vec::with_capacity(steps.len());
    for step in &steps {
        let outcome = match step {
            Step::Action(action) => controller.handle_action(action),
            Step::Tap(block_id) => controller.handle_button_tap(block_id),
        };
        if let Some(ticket) = controller.active_transition().map(|t| t.ticket) {
            controller.finish_transition(ticket);
        }
        described.push(describe(&outcome));
    }

    Ok(RunReport {
        steps: described,
        snapshot: controller.snapshot(),
        events: telemetry.events(),
    })
}

fn describe(outcome: &ActionOutcome) -> String {
    match outcome {
        ActionOutcome::Navigated { from, to, transition } => {
            format!("navigated {from} -> {to} ({:?})", transition.plan.kind)
        }
        ActionOutcome::Completed => "completed".to_string(),
        ActionOutcome::Blocked { errors } => {
            let fields: Vec<&str> = errors.iter().map(String::as_str).collect();
            format!("blocked: {}", fields.join(", "))
        }
        ActionOutcome::Forwarded { identifier } => format!("forwarded {identifier}"),
        ActionOutcome::Ignored => "ignored".to_string(),
    }
}

/// `fetch`: load the flow through the client and summarize it.
///
/// # Errors
///
/// Returns an error if the client cannot be built or the flow cannot be loaded.
pub async fn fetch(args: &FetchArgs) -> anyhow::Result<String> {
    let mut sdk = SdkConfig::new(args.api_key.clone()).with_base_url(args.base_url.clone());
    if let Some(dir) = &args.data_dir {
        sdk = sdk.with_data_dir(dir);
    }
    let client = OnboardingClient::new(sdk)?;
    let loaded = client.load_config().await?;
    match loaded.origin {
        ConfigOrigin::Remote => tracing::info!("Fetched flow version {}", loaded.config.version),
        ConfigOrigin::Cache { stale } => tracing::warn!(
            "Backend unavailable, printing cached flow version {} (stale: {stale})",
            loaded.config.version
        ),
    }
    if args.json {
        return Ok(serde_json::to_string_pretty(&loaded.config)?);
    }
    Ok(summarize(&loaded.config, loaded.origin))
}

/// One-screen-per-line summary of a flow.
#[must_use]
pub fn summarize(config: &FlowConfig, origin: ConfigOrigin) -> String {
    let source = match origin {
        ConfigOrigin::Remote => "remote",
        ConfigOrigin::Cache { stale: false } => "cache",
        ConfigOrigin::Cache { stale: true } => "stale cache",
    };
    let mut lines = vec![format!(
        "flow version {} ({source}), {} screens",
        config.version,
        config.screens.len()
    )];
    if let Some(experiment) = &config.experiment {
        lines.push(format!(
            "experiment {} variant {}",
            experiment.id,
            experiment.variant.as_deref().unwrap_or("unassigned")
        ));
    }
    for (index, screen) in config.screens.iter().enumerate() {
        lines.push(format!(
            "  {index}: {} ({:?}, {} blocks)",
            screen.id,
            screen.screen_type,
            screen.blocks().len()
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FLOW: &str = r#"{
        "version": "3",
        "screens": [
            { "id": "welcome", "type": "welcome", "content": { "useBlocks": true, "blocks": [
                { "id": "name", "type": "input", "content": { "fieldName": "name", "required": true } },
                { "id": "go", "type": "button", "pinToBottom": true, "content": { "text": "Go", "action": "next" } }
            ] } },
            { "id": "done", "type": "celebration" }
        ]
    }"#;

    fn flow_file(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(json.as_bytes()).expect("write");
        file
    }

    // ========================================================================
    // Argument parsing
    // ========================================================================

    #[test]
    fn test_parse_step_kinds() {
        assert_eq!(parse_step("next").expect("next"), Step::Action(FlowAction::Next));
        assert_eq!(
            parse_step("screen:done").expect("screen"),
            Step::Action(FlowAction::Screen {
                screen_id: "done".into()
            })
        );
        assert_eq!(parse_step("tap:go").expect("tap"), Step::Tap("go".into()));
        assert!(parse_step("jump").is_err());
        assert!(parse_step("screen:").is_err());
    }

    #[test]
    fn test_parse_assignment() {
        let (field, value) = parse_assignment("name=Ada").expect("assignment");
        assert_eq!(field, "name");
        assert_eq!(value, FieldValue::from("Ada"));

        let (_, list) = parse_assignment("goals=fitness, sleep").expect("list");
        assert_eq!(list, FieldValue::from(vec!["fitness", "sleep"]));

        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=x").is_err());
    }

    #[test]
    fn test_cli_parses_run_command() {
        let args = CliArgs::try_parse_from([
            "flow-cli", "run", "flow.json", "--set", "name=Ada", "--action", "next",
        ])
        .expect("parse");
        match args.command {
            Command::Run(run) => {
                assert_eq!(run.set, vec!["name=Ada"]);
                assert_eq!(run.actions, vec!["next"]);
            }
            other => panic!("expected run, got {other:?}"),
        }
    }

    // ========================================================================
    // Commands
    // ========================================================================

    #[test]
    fn test_run_blocked_then_completed() {
        let file = flow_file(FLOW);
        let blocked = run(&RunArgs {
            file: file.path().to_path_buf(),
            set: vec![],
            actions: vec!["tap:go".into()],
        })
        .expect("run");
        assert_eq!(blocked.steps, vec!["blocked: name"]);
        assert_eq!(blocked.snapshot.current_index, 0);

        let done = run(&RunArgs {
            file: file.path().to_path_buf(),
            set: vec!["name=Ada".into()],
            actions: vec!["tap:go".into(), "next".into()],
        })
        .expect("run");
        assert_eq!(done.steps[1], "completed");
        assert!(done.snapshot.completed);
        assert!(!done.snapshot.animating);
    }

    #[test]
    fn test_layout_scales_to_viewport() {
        let file = flow_file(FLOW);
        let json = layout(&LayoutArgs {
            file: file.path().to_path_buf(),
            screen: None,
            width: 786.0,
            height: 1704.0,
        })
        .expect("layout");
        let value: serde_json::Value = serde_json::from_str(&json).expect("json");
        assert_eq!(value["screenId"], "welcome");
        assert_eq!(value["scaleFactor"], 2.0);
        assert_eq!(value["pinned"][0]["blockId"], "go");
    }

    #[test]
    fn test_layout_by_index() {
        let file = flow_file(FLOW);
        let json = layout(&LayoutArgs {
            file: file.path().to_path_buf(),
            screen: Some("1".into()),
            width: 393.0,
            height: 852.0,
        })
        .expect("layout");
        let value: serde_json::Value = serde_json::from_str(&json).expect("json");
        assert_eq!(value["screenId"], "done");
    }

    #[test]
    fn test_summarize_lists_screens() {
        let config = FlowConfig::from_json(FLOW).expect("flow");
        let summary = summarize(&config, ConfigOrigin::Cache { stale: true });
        assert!(summary.starts_with("flow version 3 (stale cache), 2 screens"));
        assert!(summary.contains("  0: welcome (Welcome, 2 blocks)"));
        assert!(summary.contains("  1: done (Celebration, 0 blocks)"));
    }

    #[test]
    fn test_layout_unknown_screen() {
        let file = flow_file(FLOW);
        let result = layout(&LayoutArgs {
            file: file.path().to_path_buf(),
            screen: Some("missing".into()),
            width: 393.0,
            height: 852.0,
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_lint_reports_legacy_screens() {
        let file = flow_file(
            r#"{ "screens": [ { "id": "old", "type": "feature", "content": { "useBlocks": true, "blocks": [
                { "id": "t", "type": "text", "position": { "x": 20, "y": 100 } }
            ] } } ] }"#,
        );
        let report = lint(file.path()).expect("lint");
        assert!(report.contains("screen 'old' uses legacy canvas coordinates"));

        let clean = flow_file(FLOW);
        assert_eq!(lint(clean.path()).expect("lint"), "ok");
    }

    #[test]
    fn test_lint_rejects_empty_flow() {
        let file = flow_file(r#"{ "screens": [] }"#);
        assert!(lint(file.path()).is_err());
    }
}
