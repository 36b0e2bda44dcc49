use std::collections::BTreeMap;
use std::f32::consts::{PI, TAU};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Easing {
    #[default]
    OutCubic,
    Linear,
    InOutCubic,
    /// Overshooting pop-in; exactly 1 at t = 1.
    OutElastic,
    /// Rises and falls back: `sin(pi t)`, so a job ends on its `from` value.
    Arc,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::OutCubic => 1.0 - (1.0 - t).powi(3),
            Easing::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) * 0.5
                }
            }
            Easing::OutElastic => {
                if t >= 1.0 {
                    1.0
                } else {
                    1.0 - 2f32.powf(-10.0 * t) * (TAU * t).cos()
                }
            }
            Easing::Arc => {
                if t >= 1.0 {
                    0.0
                } else {
                    (PI * t).sin()
                }
            }
        }
    }
}

/// Animatable scalar channel of a rendered entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Property {
    PositionX,
    PositionY,
    PositionZ,
    Rotation,
    Opacity,
    Scale,
}

impl Property {
    pub const ALL: [Property; 6] = [
        Property::PositionX,
        Property::PositionY,
        Property::PositionZ,
        Property::Rotation,
        Property::Opacity,
        Property::Scale,
    ];
}

/// Identifies one started job. Stale handles are ignored by [`Animator::cancel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TweenHandle(u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TweenSpec {
    pub from: f32,
    pub to: f32,
    pub duration: Duration,
    pub delay: Duration,
    pub easing: Easing,
}

impl TweenSpec {
    pub fn new(from: f32, to: f32, duration: Duration) -> Self {
        Self {
            from,
            to,
            duration,
            delay: Duration::ZERO,
            easing: Easing::OutCubic,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Value at `elapsed` since the job started, and whether the job is done.
    pub fn value_at(&self, elapsed: Duration) -> (f32, bool) {
        let Some(active) = elapsed.checked_sub(self.delay) else {
            return (self.from, false);
        };
        let t = if self.duration.is_zero() {
            1.0
        } else {
            (active.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
        };
        let value = self.from + (self.to - self.from) * self.easing.apply(t);
        (value, t >= 1.0)
    }
}

#[derive(Debug, Clone)]
struct TweenJob {
    handle: TweenHandle,
    spec: TweenSpec,
    started_at: Duration,
    last_value: f32,
}

/// Keyed scalar interpolation. At most one job runs per key; starting a job
/// on a busy key cancels the previous one first.
#[derive(Debug, Clone)]
pub struct Animator<K: Ord + Copy> {
    jobs: BTreeMap<K, TweenJob>,
    next_handle: u64,
}

impl<K: Ord + Copy> Default for Animator<K> {
    fn default() -> Self {
        Self {
            jobs: BTreeMap::new(),
            next_handle: 1,
        }
    }
}

impl<K: Ord + Copy> Animator<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn animate(&mut self, key: K, spec: TweenSpec, now: Duration) -> TweenHandle {
        self.jobs.remove(&key);
        let handle = TweenHandle(self.next_handle);
        self.next_handle += 1;
        self.jobs.insert(
            key,
            TweenJob {
                handle,
                spec,
                started_at: now,
                last_value: spec.from,
            },
        );
        handle
    }

    /// Rotation variant: `to` is shifted by a full turn when that is the shorter way round.
    pub fn animate_angle(&mut self, key: K, spec: TweenSpec, now: Duration) -> TweenHandle {
        self.animate(
            key,
            TweenSpec {
                to: shortest_angle_target(spec.from, spec.to),
                ..spec
            },
            now,
        )
    }

    /// Stops the job. Returns the last value it applied, or `None` for a stale handle.
    pub fn cancel(&mut self, handle: TweenHandle) -> Option<f32> {
        let key = self
            .jobs
            .iter()
            .find(|(_, job)| job.handle == handle)
            .map(|(key, _)| *key)?;
        self.jobs.remove(&key).map(|job| job.last_value)
    }

    pub fn cancel_key(&mut self, key: &K) -> Option<f32> {
        self.jobs.remove(key).map(|job| job.last_value)
    }

    /// Cancels every job whose key matches. Returns how many were stopped.
    pub fn cancel_where(&mut self, mut matches: impl FnMut(&K) -> bool) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|key, _| !matches(key));
        before - self.jobs.len()
    }

    pub fn is_running(&self, key: &K) -> bool {
        self.jobs.contains_key(key)
    }

    pub fn handle_of(&self, key: &K) -> Option<TweenHandle> {
        self.jobs.get(key).map(|job| job.handle)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Current value of every running job. A job emits its final value once
    /// and is then dropped.
    pub fn sample(&mut self, now: Duration) -> Vec<(K, f32)> {
        let mut values = Vec::with_capacity(self.jobs.len());
        let mut finished = Vec::new();
        for (key, job) in &mut self.jobs {
            let elapsed = now.saturating_sub(job.started_at);
            let (value, done) = job.spec.value_at(elapsed);
            job.last_value = value;
            values.push((*key, value));
            if done {
                finished.push(*key);
            }
        }
        for key in finished {
            self.jobs.remove(&key);
        }
        values
    }
}

pub fn shortest_angle_target(from: f32, to: f32) -> f32 {
    let delta = to - from;
    if delta > PI {
        to - TAU
    } else if delta < -PI {
        to + TAU
    } else {
        to
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn easings_hit_their_endpoints() {
        for easing in [
            Easing::Linear,
            Easing::OutCubic,
            Easing::InOutCubic,
            Easing::OutElastic,
        ] {
            assert!(easing.apply(0.0).abs() < EPSILON, "{easing:?} at 0");
            assert_eq!(easing.apply(1.0), 1.0, "{easing:?} at 1");
        }
        assert_eq!(Easing::Arc.apply(1.0), 0.0);
        assert!((Easing::Arc.apply(0.5) - 1.0).abs() < EPSILON);
        assert!((Easing::OutCubic.apply(0.5) - 0.875).abs() < EPSILON);
    }

    #[test]
    fn job_interpolates_then_completes_once() {
        let mut animator = Animator::new();
        animator.animate(
            1u32,
            TweenSpec::new(0.0, 10.0, ms(100)).with_easing(Easing::Linear),
            ms(0),
        );

        let halfway = animator.sample(ms(50));
        assert_eq!(halfway.len(), 1);
        assert!((halfway[0].1 - 5.0).abs() < EPSILON);

        assert_eq!(animator.sample(ms(150)), vec![(1, 10.0)]);
        assert!(animator.sample(ms(200)).is_empty());
        assert!(animator.is_empty());
    }

    #[test]
    fn delay_holds_the_from_value() {
        let mut animator = Animator::new();
        animator.animate(
            7u32,
            TweenSpec::new(0.0, 1.0, ms(100))
                .with_delay(ms(300))
                .with_easing(Easing::Linear),
            ms(1000),
        );
        assert_eq!(animator.sample(ms(1200)), vec![(7, 0.0)]);
        let values = animator.sample(ms(1350));
        assert!((values[0].1 - 0.5).abs() < EPSILON);
    }

    #[test]
    fn zero_duration_completes_on_first_sample() {
        let mut animator = Animator::new();
        animator.animate(3u32, TweenSpec::new(2.0, 8.0, Duration::ZERO), ms(10));
        assert_eq!(animator.sample(ms(10)), vec![(3, 8.0)]);
        assert!(animator.is_empty());
    }

    #[test]
    fn restarting_a_key_replaces_the_job_and_stays_continuous() {
        let mut animator = Animator::new();
        let first = animator.animate(
            1u32,
            TweenSpec::new(0.0, 10.0, ms(100)).with_easing(Easing::Linear),
            ms(0),
        );
        let current = animator.sample(ms(40))[0].1;

        let second = animator.animate(
            1u32,
            TweenSpec::new(current, -10.0, ms(100)).with_easing(Easing::Linear),
            ms(40),
        );
        assert_ne!(first, second);
        assert_eq!(animator.handle_of(&1), Some(second));
        assert_eq!(animator.len(), 1);
        assert_eq!(animator.cancel(first), None);

        let resumed = animator.sample(ms(40));
        assert!((resumed[0].1 - current).abs() < EPSILON);
    }

    #[test]
    fn cancel_keeps_last_applied_value() {
        let mut animator = Animator::new();
        let handle = animator.animate(
            5u32,
            TweenSpec::new(1.0, 0.0, ms(400)).with_easing(Easing::Linear),
            ms(0),
        );
        animator.sample(ms(100));
        assert_eq!(animator.handle_of(&5), Some(handle));
        let last = animator.cancel(handle).expect("running job");
        assert!((last - 0.75).abs() < EPSILON);
        assert_eq!(animator.handle_of(&5), None);
        assert!(animator.sample(ms(500)).is_empty());
    }

    #[test]
    fn angles_take_the_short_way_round() {
        assert!((shortest_angle_target(0.1, TAU - 0.1) - (-0.1)).abs() < EPSILON);
        assert!((shortest_angle_target(-3.0, 3.0) - (3.0 - TAU)).abs() < EPSILON);
        assert_eq!(shortest_angle_target(0.0, PI), PI);
    }

    #[test]
    fn cancel_where_filters_by_key() {
        let mut animator = Animator::new();
        for key in 0u32..4 {
            animator.animate(key, TweenSpec::new(0.0, 1.0, ms(100)), ms(0));
        }
        assert_eq!(animator.cancel_where(|key| key % 2 == 0), 2);
        assert!(animator.is_running(&1));
        assert!(!animator.is_running(&2));
    }
}
