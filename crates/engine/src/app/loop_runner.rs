use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

use crate::scenario::{ScenarioError, ScenarioLibrary};
use crate::stage::{PlaybackConfig, RenderSurface, ScenarioSession, StageConfig};
use crate::{resolve_app_paths, StartupError};

use super::input::ActionEdges;
use super::{InputAction, Renderer};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub max_render_fps: Option<u32>,
    pub stage: StageConfig,
    pub playback: PlaybackConfig,
    /// Overrides `<root>/assets/scenarios.json`.
    pub scenario_path: Option<PathBuf>,
    pub initial_scenario: Option<String>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Fieldplay".to_string(),
            window_width: 1280,
            window_height: 720,
            max_render_fps: Some(60),
            stage: StageConfig::default(),
            playback: PlaybackConfig::default(),
            scenario_path: None,
            initial_scenario: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    #[error("scenario library at {path} contains no scenarios")]
    EmptyLibrary { path: PathBuf },
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// The scenario library plus the session playing one of its entries.
struct ScenarioDeck {
    library: ScenarioLibrary,
    current_key: String,
    session: ScenarioSession,
}

impl ScenarioDeck {
    fn new(
        library: ScenarioLibrary,
        initial: Option<&str>,
        stage: StageConfig,
        playback: PlaybackConfig,
    ) -> Option<Self> {
        let current_key = select_initial_key(&library, initial)?;
        Some(Self {
            library,
            current_key,
            session: ScenarioSession::new(stage, playback),
        })
    }

    fn open(
        &mut self,
        key: &str,
        now: Duration,
        surface: &mut dyn RenderSurface,
    ) -> Result<(), ScenarioError> {
        let scenario = self.library.get(key)?;
        let sequence = scenario.sequence()?;
        info!(
            scenario = key,
            name = scenario.name.as_str(),
            frame_count = sequence.len(),
            "scenario_opened"
        );
        self.current_key = key.to_string();
        self.session.load_sequence(sequence, now, surface);
        Ok(())
    }

    fn open_current(
        &mut self,
        now: Duration,
        surface: &mut dyn RenderSurface,
    ) -> Result<(), ScenarioError> {
        let key = self.current_key.clone();
        self.open(&key, now, surface)
    }

    /// Applies one input action. Returns `true` when the viewer should quit.
    fn apply(
        &mut self,
        action: InputAction,
        now: Duration,
        surface: &mut dyn RenderSurface,
    ) -> bool {
        match action {
            InputAction::StepBack => {
                self.session.step(-1, now, surface);
            }
            InputAction::StepForward => {
                self.session.step(1, now, surface);
            }
            InputAction::TogglePlay => {
                self.session.toggle_play(now);
            }
            InputAction::Restart => {
                self.session.restart(now, surface);
            }
            InputAction::NextScenario => {
                let Some(next) = self.library.next_key(&self.current_key).map(str::to_string)
                else {
                    return false;
                };
                if let Err(error) = self.open(&next, now, surface) {
                    warn!(scenario = next.as_str(), error = %error, "scenario_open_failed");
                }
            }
            InputAction::Quit => return true,
        }
        false
    }

    fn title(&self, base: &str) -> String {
        let playback = self.session.playback();
        let name = self
            .library
            .get(&self.current_key)
            .map_or(self.current_key.as_str(), |scenario| scenario.name.as_str());
        let marker = if playback.is_playing() { " >" } else { "" };
        let caption = playback.caption();
        if caption.is_empty() {
            format!("{base} | {name} | {}{marker}", playback.step_indicator())
        } else {
            format!(
                "{base} | {name} | {}{marker} | {caption}",
                playback.step_indicator()
            )
        }
    }
}

/// Requested key when the library has it, otherwise the first key.
fn select_initial_key(library: &ScenarioLibrary, requested: Option<&str>) -> Option<String> {
    if let Some(requested) = requested {
        if library.get(requested).is_ok() {
            return Some(requested.to_string());
        }
        warn!(
            scenario = requested,
            "unknown initial scenario; falling back to first"
        );
    }
    library.first_key().map(str::to_string)
}

pub fn run_app(config: LoopConfig) -> Result<(), AppError> {
    let app_paths = resolve_app_paths()?;
    let scenario_path = config
        .scenario_path
        .clone()
        .unwrap_or_else(|| app_paths.scenarios_path.clone());
    info!(
        root = %app_paths.root.display(),
        scenarios = %scenario_path.display(),
        "startup"
    );
    let library = ScenarioLibrary::load(&scenario_path)?;
    let mut deck = ScenarioDeck::new(
        library,
        config.initial_scenario.as_deref(),
        config.stage,
        config.playback,
    )
    .ok_or_else(|| AppError::EmptyLibrary {
        path: scenario_path.clone(),
    })?;

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer =
        Renderer::new(Arc::clone(&window), config.stage.mapper).map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let effective_render_cap = normalize_render_fps_cap(config.max_render_fps);
    let render_frame_target = target_frame_duration(effective_render_cap);
    info!(
        mapper = ?config.stage.mapper,
        show_labels = config.stage.show_labels,
        render_fps_cap = %format_render_cap(effective_render_cap),
        "loop_config"
    );

    let started = Instant::now();
    deck.open_current(Duration::ZERO, &mut renderer)?;

    let mut edges = ActionEdges::default();
    let mut last_present_instant = Instant::now();
    let mut last_applied_title: Option<String> = None;

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    if let Err(error) = renderer.resize(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    if let Some(action) = InputAction::from_key(event.physical_key) {
                        edges.set(action, event.state == ElementState::Pressed);
                    }
                }
                WindowEvent::RedrawRequested => {
                    let now = started.elapsed();
                    for action in edges.take_pressed() {
                        if deck.apply(action, now, &mut renderer) {
                            info!(reason = "escape_key", "shutdown_requested");
                            window_target.exit();
                            return;
                        }
                    }
                    deck.session.tick(now, &mut renderer);

                    // Single sleep point for render pacing.
                    let elapsed_since_last_present =
                        Instant::now().saturating_duration_since(last_present_instant);
                    let cap_sleep =
                        compute_cap_sleep(elapsed_since_last_present, render_frame_target);
                    if cap_sleep > Duration::ZERO {
                        thread::sleep(cap_sleep);
                    }

                    if let Err(error) = renderer.render(now) {
                        warn!(error = %error, "renderer_draw_failed");
                        window_target.exit();
                    }
                    last_present_instant = Instant::now();

                    let next_title = deck.title(&config.window_title);
                    if last_applied_title.as_deref() != Some(next_title.as_str()) {
                        window.set_title(&next_title);
                        last_applied_title = Some(next_title);
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                deck.session.clear_stage(&mut renderer);
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

fn normalize_render_fps_cap(cap: Option<u32>) -> Option<u32> {
    cap.filter(|value| *value > 0)
}

fn target_frame_duration(max_render_fps: Option<u32>) -> Option<Duration> {
    max_render_fps.map(|fps| Duration::from_secs_f64(1.0 / fps as f64))
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

fn format_render_cap(cap: Option<u32>) -> String {
    match cap {
        Some(value) => value.to_string(),
        None => "off".to_string(),
    }
}
