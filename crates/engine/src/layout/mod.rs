mod formation;
mod mapping;
mod pose;

pub use formation::{
    is_formation_role, FormationAssignment, FormationConfig, FormationLayout, FRONT_ROW_ORDER,
    MIN_FORMATION_ROLES, RESERVE_ROLE,
};
pub use mapping::{CoordinateMapper, RenderAxis, RenderPos};
pub use pose::{Pose, DEFAULT_POSSESSION_THRESHOLD};
