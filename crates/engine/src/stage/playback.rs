use std::time::Duration;

use tracing::{debug, info};

use crate::motion::{TimerId, TimerQueue};
use crate::scenario::{Frame, ScenarioError, Sequence};

use super::config::PlaybackConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Ready,
    Playing,
}

/// Frame the reconciler should show next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderRequest {
    pub index: usize,
    pub animate: bool,
}

/// Step/seek/play state machine over a loaded sequence. Owns at most one
/// pending advance timer.
#[derive(Debug)]
pub struct PlaybackController {
    config: PlaybackConfig,
    sequence: Option<Sequence>,
    index: usize,
    state: PlaybackState,
    timers: TimerQueue<usize>,
    advance: Option<TimerId>,
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new(PlaybackConfig::default())
    }
}

impl PlaybackController {
    pub fn new(config: PlaybackConfig) -> Self {
        Self {
            config,
            sequence: None,
            index: 0,
            state: PlaybackState::Idle,
            timers: TimerQueue::new(),
            advance: None,
        }
    }

    /// Validates and installs `frames`. On failure nothing changes.
    pub fn load(&mut self, frames: Vec<Frame>) -> Result<RenderRequest, ScenarioError> {
        let sequence = Sequence::new(frames)?;
        Ok(self.load_sequence(sequence))
    }

    pub fn load_sequence(&mut self, sequence: Sequence) -> RenderRequest {
        self.cancel_advance();
        info!(frame_count = sequence.len(), "scenario_loaded");
        self.sequence = Some(sequence);
        self.index = 0;
        self.set_state(PlaybackState::Ready);
        RenderRequest {
            index: 0,
            animate: false,
        }
    }

    /// Moves by `delta` steps, clamped to the sequence. Stops playback.
    pub fn step(&mut self, delta: i64) -> Option<RenderRequest> {
        let target = self.index as i64 + delta;
        self.jump_to(target)
    }

    pub fn seek(&mut self, index: usize) -> Option<RenderRequest> {
        self.jump_to(i64::try_from(index).unwrap_or(i64::MAX))
    }

    /// Seeks to the step under a timeline position in `[0, 1]`.
    pub fn seek_fraction(&mut self, fraction: f32) -> Option<RenderRequest> {
        let len = self.len();
        if len == 0 || !fraction.is_finite() {
            return None;
        }
        let index = (fraction * len as f32).floor() as i64;
        self.jump_to(index)
    }

    pub fn restart(&mut self) -> Option<RenderRequest> {
        self.seek(0)
    }

    /// Starts advancing after the current step's duration. Only valid from `Ready`.
    pub fn play(&mut self, now: Duration) -> bool {
        if self.state != PlaybackState::Ready || !self.can_play() {
            return false;
        }
        self.set_state(PlaybackState::Playing);
        self.schedule_advance(now);
        true
    }

    pub fn pause(&mut self) -> bool {
        if self.state != PlaybackState::Playing {
            return false;
        }
        self.cancel_advance();
        self.set_state(PlaybackState::Ready);
        true
    }

    pub fn toggle_play(&mut self, now: Duration) -> bool {
        match self.state {
            PlaybackState::Playing => self.pause(),
            PlaybackState::Ready => self.play(now),
            PlaybackState::Idle => false,
        }
    }

    /// Fires the advance timer when due. Returns the frame to show, if any.
    pub fn poll(&mut self, now: Duration) -> Option<RenderRequest> {
        let (due, timer, index) = self.timers.pop_due(now)?;
        if self.advance != Some(timer) || self.state != PlaybackState::Playing {
            return None;
        }
        self.advance = None;

        let last_index = self.sequence.as_ref()?.last_index();
        if index >= last_index {
            self.set_state(PlaybackState::Ready);
            return None;
        }
        self.index = index + 1;
        debug!(index = self.index, "playback_advanced");
        self.schedule_advance(due);
        Some(RenderRequest {
            index: self.index,
            animate: true,
        })
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_due()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.sequence.as_ref().map_or(0, Sequence::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sequence(&self) -> Option<&Sequence> {
        self.sequence.as_ref()
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.sequence.as_ref()?.frame(self.index)
    }

    pub fn caption(&self) -> &str {
        self.current_frame()
            .map_or("", |frame| frame.caption.as_str())
    }

    pub fn step_duration(&self) -> Duration {
        self.current_frame().map_or(self.config.default_step_duration, |frame| {
            frame.step_duration(self.config.default_step_duration)
        })
    }

    /// Share of the sequence shown so far, counting the current step.
    pub fn progress(&self) -> f32 {
        match self.len() {
            0 => 0.0,
            len => (self.index + 1) as f32 / len as f32,
        }
    }

    pub fn can_step_back(&self) -> bool {
        !self.is_empty() && self.index > 0
    }

    pub fn can_step_forward(&self) -> bool {
        self.index + 1 < self.len()
    }

    pub fn can_play(&self) -> bool {
        self.len() > 1
    }

    pub fn step_indicator(&self) -> String {
        match self.len() {
            0 => "-".to_string(),
            len => format!("{}/{}", self.index + 1, len),
        }
    }

    fn jump_to(&mut self, target: i64) -> Option<RenderRequest> {
        let index = self.sequence.as_ref()?.clamp_index(target);
        self.cancel_advance();
        self.set_state(PlaybackState::Ready);
        self.index = index;
        Some(RenderRequest {
            index,
            animate: true,
        })
    }

    fn schedule_advance(&mut self, from: Duration) {
        self.cancel_advance();
        let due = from.saturating_add(self.step_duration());
        self.advance = Some(self.timers.schedule(due, self.index));
    }

    fn cancel_advance(&mut self) {
        if let Some(timer) = self.advance.take() {
            self.timers.cancel(timer);
        }
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            debug!(from = ?self.state, to = ?state, index = self.index, "playback_state_changed");
            self.state = state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn frames(count: usize) -> Vec<Frame> {
        (0..count)
            .map(|index| Frame {
                caption: format!("step {index}"),
                ..Frame::default()
            })
            .collect()
    }

    fn loaded(count: usize) -> PlaybackController {
        let mut playback = PlaybackController::default();
        playback.load(frames(count)).expect("load");
        playback
    }

    #[test]
    fn load_goes_ready_with_instant_render() {
        let mut playback = PlaybackController::default();
        assert_eq!(playback.state(), PlaybackState::Idle);
        let request = playback.load(frames(3)).expect("load");
        assert_eq!(
            request,
            RenderRequest {
                index: 0,
                animate: false
            }
        );
        assert_eq!(playback.state(), PlaybackState::Ready);
        assert_eq!(playback.caption(), "step 0");
        assert_eq!(playback.step_indicator(), "1/3");
    }

    #[test]
    fn failed_load_leaves_state_untouched() {
        let mut playback = loaded(3);
        playback.step(2);
        assert!(playback.load(Vec::new()).is_err());
        assert_eq!(playback.index(), 2);
        assert_eq!(playback.len(), 3);
        assert_eq!(playback.state(), PlaybackState::Ready);

        let mut idle = PlaybackController::default();
        assert!(idle.load(Vec::new()).is_err());
        assert_eq!(idle.state(), PlaybackState::Idle);
        assert!(idle.step(1).is_none());
    }

    #[test]
    fn step_and_seek_clamp() {
        let mut playback = loaded(4);
        assert_eq!(playback.step(-1).map(|request| request.index), Some(0));
        assert_eq!(playback.step(10).map(|request| request.index), Some(3));
        assert_eq!(playback.seek(1).map(|request| request.index), Some(1));
        assert_eq!(playback.seek_fraction(0.99).map(|request| request.index), Some(3));
        assert_eq!(playback.seek_fraction(0.3).map(|request| request.index), Some(1));
        assert_eq!(playback.seek_fraction(-0.5).map(|request| request.index), Some(0));
        assert!(playback.step(1).is_some_and(|request| request.animate));
    }

    #[test]
    fn play_from_index_advances_until_last_then_stops() {
        for start in 0..5 {
            let mut playback = loaded(5);
            playback.seek(start);
            assert!(playback.play(ms(0)));

            let mut advances = 0;
            let mut now = ms(0);
            while playback.is_playing() {
                now += ms(100);
                if playback.poll(now).is_some() {
                    advances += 1;
                }
                assert!(now < ms(60_000), "playback never stopped");
            }
            assert_eq!(advances, 5 - 1 - start);
            assert_eq!(playback.index(), 4);
            assert_eq!(playback.state(), PlaybackState::Ready);
            assert!(playback.next_deadline().is_none());
        }
    }

    #[test]
    fn advances_use_each_steps_duration() {
        let mut sequence = frames(3);
        sequence[0].duration_ms = Some(1000.0);
        sequence[1].duration_ms = Some(400.0);
        let mut playback = PlaybackController::default();
        playback.load(sequence).expect("load");
        playback.play(ms(0));

        assert!(playback.poll(ms(999)).is_none());
        assert_eq!(playback.poll(ms(1000)).map(|request| request.index), Some(1));
        assert_eq!(playback.next_deadline(), Some(ms(1400)));
        assert_eq!(playback.poll(ms(1400)).map(|request| request.index), Some(2));
        assert_eq!(playback.next_deadline(), Some(ms(3900)));
    }

    #[test]
    fn oversized_durations_never_overflow_the_schedule() {
        let mut sequence = frames(2);
        sequence[0].duration_ms = Some(1e300);
        let mut playback = PlaybackController::default();
        playback.load(sequence).expect("load");
        assert_eq!(playback.step_duration(), ms(2500));
        assert!(playback.play(ms(0)));
        assert_eq!(playback.next_deadline(), Some(ms(2500)));

        let mut sequence = frames(2);
        sequence[0].duration_ms = Some(1.5e22);
        playback.load(sequence).expect("load");
        assert!(playback.play(Duration::from_secs(10_000_000_000_000_000_000)));
        assert_eq!(playback.next_deadline(), Some(Duration::MAX));
    }

    #[test]
    fn pause_and_step_cancel_the_pending_advance() {
        let mut playback = loaded(3);
        assert!(playback.toggle_play(ms(0)));
        assert!(playback.is_playing());
        assert!(playback.toggle_play(ms(10)));
        assert_eq!(playback.state(), PlaybackState::Ready);
        assert!(playback.next_deadline().is_none());
        assert!(playback.poll(ms(10_000)).is_none());

        playback.play(ms(0));
        playback.step(1);
        assert_eq!(playback.state(), PlaybackState::Ready);
        assert!(playback.poll(ms(10_000)).is_none());
        assert_eq!(playback.index(), 1);
    }

    #[test]
    fn play_is_rejected_when_idle_or_single_frame() {
        let mut idle = PlaybackController::default();
        assert!(!idle.play(ms(0)));
        let mut single = loaded(1);
        assert!(!single.play(ms(0)));
        assert!(!single.can_play());
    }

    #[test]
    fn read_only_surface_tracks_position() {
        let mut playback = loaded(5);
        playback.seek(1);
        assert_eq!(playback.step_indicator(), "2/5");
        assert!((playback.progress() - 0.4).abs() < f32::EPSILON);
        assert!(playback.can_step_back());
        assert!(playback.can_step_forward());
        assert_eq!(playback.step_duration(), ms(2500));
        playback.seek(4);
        assert!(!playback.can_step_forward());
    }
}
