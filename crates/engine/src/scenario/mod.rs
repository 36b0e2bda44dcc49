mod diagram;
mod library;
mod types;

pub use diagram::{parse_diagram, split_reply, AssistantReply, Diagram};
pub use library::{Scenario, ScenarioError, ScenarioLibrary, Sequence};
pub use types::{
    Annotation, AnnotationKind, Arrow, AuthoredPoint, CameraFocus, CameraRect, DeclaredPlayer,
    EntityError, Frame, PlayerState, Side, Vec2, Zone, ZoneKind, ZoneRect,
    CAMERA_FOCUS_MAX_DISTANCE, CAMERA_FOCUS_MIN_DISTANCE, DEFAULT_STEP_DURATION,
    MIN_ARROW_LENGTH,
};
