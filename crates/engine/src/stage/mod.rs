mod config;
mod playback;
mod reconciler;
mod session;
mod store;
mod surface;
#[cfg(test)]
pub(crate) mod testing;

pub use config::{
    role_display_name, zone_opacity, Elevations, PlaybackConfig, StageConfig, Timings,
};
pub use playback::{PlaybackController, PlaybackState, RenderRequest};
pub use reconciler::{ReconcileReport, Reconciler, SkippedEntity, TickReport, TweenKey};
pub use session::ScenarioSession;
pub use store::{LiveEntity, LiveEntityStore, Phase, RetiringEntity};
pub use surface::{
    EntityClass, EntityKey, HandleAllocator, RenderHandle, RenderState, RenderSurface, Visual,
};
