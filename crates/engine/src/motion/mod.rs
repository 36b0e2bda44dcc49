mod timers;
mod tween;

pub use timers::{TimerId, TimerQueue};
pub use tween::{shortest_angle_target, Animator, Easing, Property, TweenHandle, TweenSpec};
