use std::time::Duration;

use crate::scenario::{Frame, ScenarioError, Sequence};

use super::config::{PlaybackConfig, StageConfig};
use super::playback::{PlaybackController, RenderRequest};
use super::reconciler::{ReconcileReport, Reconciler, TickReport};
use super::surface::RenderSurface;

/// Playback wired to reconciliation: every selected frame is rendered
/// through the reconciler onto the surface passed in.
#[derive(Debug)]
pub struct ScenarioSession {
    playback: PlaybackController,
    reconciler: Reconciler,
}

impl ScenarioSession {
    pub fn new(stage: StageConfig, playback: PlaybackConfig) -> Self {
        Self {
            playback: PlaybackController::new(playback),
            reconciler: Reconciler::new(stage),
        }
    }

    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn load(
        &mut self,
        frames: Vec<Frame>,
        now: Duration,
        surface: &mut dyn RenderSurface,
    ) -> Result<ReconcileReport, ScenarioError> {
        let request = self.playback.load(frames)?;
        Ok(self.render(request, now, surface))
    }

    pub fn load_sequence(
        &mut self,
        sequence: Sequence,
        now: Duration,
        surface: &mut dyn RenderSurface,
    ) -> ReconcileReport {
        let request = self.playback.load_sequence(sequence);
        self.render(request, now, surface)
    }

    pub fn step(
        &mut self,
        delta: i64,
        now: Duration,
        surface: &mut dyn RenderSurface,
    ) -> Option<ReconcileReport> {
        let request = self.playback.step(delta)?;
        Some(self.render(request, now, surface))
    }

    pub fn seek(
        &mut self,
        index: usize,
        now: Duration,
        surface: &mut dyn RenderSurface,
    ) -> Option<ReconcileReport> {
        let request = self.playback.seek(index)?;
        Some(self.render(request, now, surface))
    }

    pub fn seek_fraction(
        &mut self,
        fraction: f32,
        now: Duration,
        surface: &mut dyn RenderSurface,
    ) -> Option<ReconcileReport> {
        let request = self.playback.seek_fraction(fraction)?;
        Some(self.render(request, now, surface))
    }

    pub fn restart(
        &mut self,
        now: Duration,
        surface: &mut dyn RenderSurface,
    ) -> Option<ReconcileReport> {
        let request = self.playback.restart()?;
        Some(self.render(request, now, surface))
    }

    pub fn play(&mut self, now: Duration) -> bool {
        self.playback.play(now)
    }

    pub fn pause(&mut self) -> bool {
        self.playback.pause()
    }

    pub fn toggle_play(&mut self, now: Duration) -> bool {
        self.playback.toggle_play(now)
    }

    /// Advances playback if due, then applies animation progress.
    pub fn tick(&mut self, now: Duration, surface: &mut dyn RenderSurface) -> TickReport {
        if let Some(request) = self.playback.poll(now) {
            self.render(request, now, surface);
        }
        self.reconciler.tick(now, surface)
    }

    /// Drops everything from the surface, keeping the loaded sequence.
    pub fn clear_stage(&mut self, surface: &mut dyn RenderSurface) {
        self.reconciler.reset(surface);
    }

    fn render(
        &mut self,
        request: RenderRequest,
        now: Duration,
        surface: &mut dyn RenderSurface,
    ) -> ReconcileReport {
        let Some(frame) = self
            .playback
            .sequence()
            .and_then(|sequence| sequence.frame(request.index))
        else {
            return ReconcileReport::default();
        };
        self.reconciler
            .reconcile(frame, request.animate, now, surface)
    }
}
