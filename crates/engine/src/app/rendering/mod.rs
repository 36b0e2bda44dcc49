mod renderer;
mod transform;

pub use renderer::{PitchCanvas, Renderer};
pub use transform::{lerp_rect, pitch_to_screen, pixels_per_unit, Viewport};
