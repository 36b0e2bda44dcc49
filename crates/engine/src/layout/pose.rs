use crate::scenario::{Side, Vec2};

/// Default per-axis distance within which a player is treated as carrying the ball.
pub const DEFAULT_POSSESSION_THRESHOLD: f32 = 2.0;

/// Body pose a player is drawn in. A change of pose rebuilds the visual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pose {
    RunningWithBall,
    Running,
    FormationCrouch,
    FormationStand,
}

impl Pose {
    /// Formation roles take their side's set-piece pose; everyone else runs,
    /// with the ball when it lies within `threshold` on both axes. Several
    /// players may qualify for possession at once.
    pub fn infer(
        side: Side,
        in_formation: bool,
        position: Vec2,
        ball: Option<Vec2>,
        threshold: f32,
    ) -> Pose {
        if in_formation {
            return match side {
                Side::Attacking => Pose::FormationCrouch,
                Side::Defending => Pose::FormationStand,
            };
        }
        match ball {
            Some(ball)
                if (position.x - ball.x).abs() < threshold
                    && (position.y - ball.y).abs() < threshold =>
            {
                Pose::RunningWithBall
            }
            _ => Pose::Running,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Pose::RunningWithBall => "running_with_ball",
            Pose::Running => "running",
            Pose::FormationCrouch => "formation_crouch",
            Pose::FormationStand => "formation_stand",
        }
    }

    pub fn is_formation(self) -> bool {
        matches!(self, Pose::FormationCrouch | Pose::FormationStand)
    }
}
