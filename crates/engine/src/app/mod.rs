mod input;
mod loop_runner;
mod rendering;

pub use input::InputAction;
pub use loop_runner::{run_app, AppError, LoopConfig};
pub use rendering::{
    lerp_rect, pitch_to_screen, pixels_per_unit, PitchCanvas, Renderer, Viewport,
};
