use std::time::Duration;

use crate::layout::{CoordinateMapper, FormationConfig, DEFAULT_POSSESSION_THRESHOLD};
use crate::scenario::{ZoneKind, DEFAULT_STEP_DURATION};

/// Heights above the pitch each entity class is placed at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Elevations {
    pub player: f32,
    pub ball: f32,
    pub zone: f32,
    pub arrow: f32,
    pub annotation: f32,
    pub label: f32,
}

impl Default for Elevations {
    fn default() -> Self {
        Self {
            player: 0.0,
            ball: 0.55,
            zone: 0.02,
            arrow: 0.3,
            annotation: 3.5,
            label: 12.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timings {
    pub player_move: Duration,
    pub player_fade_in: Duration,
    pub player_fade_out: Duration,
    pub pose_cross_fade: Duration,
    pub ball_move: Duration,
    pub ball_scale: Duration,
    pub zone_fade: Duration,
    pub arrow_grow: Duration,
    pub arrow_stagger: Duration,
    pub annotation_pop: Duration,
    pub annotation_stagger: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            player_move: Duration::from_millis(600),
            player_fade_in: Duration::from_millis(500),
            player_fade_out: Duration::from_millis(400),
            pose_cross_fade: Duration::from_millis(300),
            ball_move: Duration::from_millis(600),
            ball_scale: Duration::from_millis(300),
            zone_fade: Duration::from_millis(400),
            arrow_grow: Duration::from_millis(400),
            arrow_stagger: Duration::from_millis(150),
            annotation_pop: Duration::from_millis(500),
            annotation_stagger: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageConfig {
    pub mapper: CoordinateMapper,
    pub formation: FormationConfig,
    pub possession_threshold: f32,
    pub show_labels: bool,
    /// Peak height of the ball's arc when it moves; zero disables the hop.
    pub ball_hop: f32,
    pub elevations: Elevations,
    pub timings: Timings,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self::plane()
    }
}

impl StageConfig {
    /// Flat top-down view.
    pub fn plane() -> Self {
        Self {
            mapper: CoordinateMapper::Plane,
            formation: FormationConfig::default(),
            possession_threshold: DEFAULT_POSSESSION_THRESHOLD,
            show_labels: false,
            ball_hop: 0.0,
            elevations: Elevations::default(),
            timings: Timings::default(),
        }
    }

    /// Pitch laid on the ground plane with floating labels and a hopping ball.
    pub fn ground() -> Self {
        Self {
            mapper: CoordinateMapper::Ground,
            show_labels: true,
            ball_hop: 0.3,
            timings: Timings {
                ball_move: Duration::from_millis(500),
                ..Timings::default()
            },
            ..Self::plane()
        }
    }
}

/// Resting fill opacity of a zone overlay.
pub fn zone_opacity(kind: ZoneKind) -> f32 {
    match kind {
        ZoneKind::Bully | ZoneKind::Rougeable => 0.15,
        ZoneKind::Sneaking | ZoneKind::OnTheLine => 0.12,
        ZoneKind::Other => 0.1,
    }
}

/// Display name shown above a player for its role key.
pub fn role_display_name(role: &str) -> String {
    match role {
        "post" => "Post".to_string(),
        "sp1" | "sp2" => "Side Post".to_string(),
        "c1" | "c2" => "Corner".to_string(),
        "bup" => "Bup".to_string(),
        "fly" => "Fly".to_string(),
        "short" => "Short".to_string(),
        "long1" | "long2" => "Long".to_string(),
        "goals" => "Goals".to_string(),
        other => other.to_uppercase(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackConfig {
    pub default_step_duration: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            default_step_duration: DEFAULT_STEP_DURATION,
        }
    }
}
