use std::env;

use fieldplay_engine::{LoopConfig, StageConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const SCENARIO_ENV_VAR: &str = "FIELDPLAY_SCENARIO";
const VIEW_ENV_VAR: &str = "FIELDPLAY_VIEW";

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
}

pub(crate) fn build_app() -> AppWiring {
    init_tracing();
    info!("=== Fieldplay Startup ===");

    let stage = match read_env(VIEW_ENV_VAR) {
        Some(raw) => stage_config_for_view(&raw).unwrap_or_else(|| {
            warn!(
                env_var = VIEW_ENV_VAR,
                value = raw.as_str(),
                "unknown view; expected plane or ground, falling back to plane"
            );
            StageConfig::plane()
        }),
        None => StageConfig::plane(),
    };
    let config = LoopConfig {
        stage,
        initial_scenario: read_env(SCENARIO_ENV_VAR).and_then(|raw| non_empty(&raw)),
        ..LoopConfig::default()
    };

    AppWiring { config }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn read_env(var: &'static str) -> Option<String> {
    match env::var(var) {
        Ok(value) => Some(value),
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!(env_var = var, error = %err, "unable to read env var; ignoring");
            None
        }
    }
}

fn stage_config_for_view(raw: &str) -> Option<StageConfig> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "plane" | "2d" => Some(StageConfig::plane()),
        "ground" | "3d" => Some(StageConfig::ground()),
        _ => None,
    }
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
