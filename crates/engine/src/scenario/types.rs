use std::collections::BTreeMap;
use std::f32::consts::PI;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub const DEFAULT_STEP_DURATION: Duration = Duration::from_millis(2500);

/// Arrows shorter than this are not drawable.
pub const MIN_ARROW_LENGTH: f32 = 0.5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Vec2) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Problem with a single declared entity. The entity is skipped for the
/// frame; the rest of the frame still renders.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EntityError {
    #[error("missing required field `{field}`")]
    MissingField { field: &'static str },
    #[error("field `{field}` is not a finite number ({value})")]
    NonFinite { field: &'static str, value: f32 },
    #[error("arrow is too short to draw (length {length:.3}, minimum {min_length})")]
    DegenerateArrow { length: f32, min_length: f32 },
    #[error("zone has non-positive size {width}x{height}")]
    EmptyZone { width: f32, height: f32 },
    #[error("annotation text is empty")]
    EmptyText,
}

fn required(value: Option<f32>, field: &'static str) -> Result<f32, EntityError> {
    let value = value.ok_or(EntityError::MissingField { field })?;
    if !value.is_finite() {
        return Err(EntityError::NonFinite { field, value });
    }
    Ok(value)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthoredPoint {
    #[serde(default)]
    pub x: Option<f32>,
    #[serde(default)]
    pub y: Option<f32>,
}

impl AuthoredPoint {
    pub const fn at(x: f32, y: f32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
        }
    }

    pub fn resolve(&self) -> Result<Vec2, EntityError> {
        Ok(Vec2 {
            x: required(self.x, "x")?,
            y: required(self.y, "y")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Side {
    Attacking,
    Defending,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Attacking, Side::Defending];

    /// Each side faces the opposing goal.
    pub fn facing(self) -> f32 {
        match self {
            Side::Attacking => 0.0,
            Side::Defending => PI,
        }
    }

    pub fn as_token(self) -> &'static str {
        match self {
            Side::Attacking => "atk",
            Side::Defending => "def",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    #[serde(default)]
    pub x: Option<f32>,
    #[serde(default)]
    pub y: Option<f32>,
    #[serde(rename = "l", default, deserialize_with = "string_or_number")]
    pub label: String,
    #[serde(rename = "r", default, deserialize_with = "string_or_number")]
    pub caption: String,
    #[serde(rename = "hl", default)]
    pub highlighted: bool,
    #[serde(rename = "sn", default)]
    pub sneaking: bool,
    #[serde(rename = "cn", default)]
    pub cornering: bool,
    #[serde(rename = "hlPart", default, skip_serializing_if = "Option::is_none")]
    pub highlight_part: Option<String>,
}

impl PlayerState {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    pub fn position(&self) -> Result<Vec2, EntityError> {
        Ok(Vec2 {
            x: required(self.x, "x")?,
            y: required(self.y, "y")?,
        })
    }
}

/// A player as declared by a frame, with the side it was declared under.
#[derive(Debug, Clone, Copy)]
pub struct DeclaredPlayer<'a> {
    pub side: Side,
    pub role: &'a str,
    pub state: &'a PlayerState,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ZoneKind {
    Bully,
    Sneaking,
    OnTheLine,
    Rougeable,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ZoneRect {
    pub fn center(&self) -> Vec2 {
        Vec2 {
            x: self.x + self.width * 0.5,
            y: self.y + self.height * 0.5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    #[serde(rename = "t", default)]
    pub kind: ZoneKind,
    #[serde(default)]
    pub x: Option<f32>,
    #[serde(default)]
    pub y: Option<f32>,
    #[serde(default)]
    pub w: Option<f32>,
    #[serde(default)]
    pub h: Option<f32>,
}

impl Zone {
    pub fn new(kind: ZoneKind, x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            kind,
            x: Some(x),
            y: Some(y),
            w: Some(w),
            h: Some(h),
        }
    }

    pub fn rect(&self) -> Result<ZoneRect, EntityError> {
        let rect = ZoneRect {
            x: required(self.x, "x")?,
            y: required(self.y, "y")?,
            width: required(self.w, "w")?,
            height: required(self.h, "h")?,
        };
        if rect.width <= 0.0 || rect.height <= 0.0 {
            return Err(EntityError::EmptyZone {
                width: rect.width,
                height: rect.height,
            });
        }
        Ok(rect)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Arrow {
    #[serde(default)]
    pub from: AuthoredPoint,
    #[serde(default)]
    pub to: AuthoredPoint,
    #[serde(rename = "c", default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(rename = "lbl", default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "anim", default)]
    pub animated: bool,
}

impl Arrow {
    pub fn between(from: Vec2, to: Vec2) -> Self {
        Self {
            from: AuthoredPoint::at(from.x, from.y),
            to: AuthoredPoint::at(to.x, to.y),
            ..Self::default()
        }
    }

    pub fn segment(&self) -> Result<(Vec2, Vec2), EntityError> {
        let from = self.from.resolve()?;
        let to = self.to.resolve()?;
        let length = from.distance(to);
        if length < MIN_ARROW_LENGTH {
            return Err(EntityError::DegenerateArrow {
                length,
                min_length: MIN_ARROW_LENGTH,
            });
        }
        Ok((from, to))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnnotationKind {
    Warning,
    Scoring,
    #[default]
    #[serde(other)]
    Info,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(rename = "t", default)]
    pub kind: AnnotationKind,
    #[serde(default)]
    pub x: Option<f32>,
    #[serde(default)]
    pub y: Option<f32>,
    #[serde(rename = "txt", default)]
    pub text: String,
}

impl Annotation {
    pub fn position(&self) -> Result<Vec2, EntityError> {
        if self.text.trim().is_empty() {
            return Err(EntityError::EmptyText);
        }
        Ok(Vec2 {
            x: required(self.x, "x")?,
            y: required(self.y, "y")?,
        })
    }
}

/// Camera rectangle in the authored plane (the 2D view box).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

pub const CAMERA_FOCUS_MIN_DISTANCE: f32 = 20.0;
pub const CAMERA_FOCUS_MAX_DISTANCE: f32 = 90.0;

/// Orbit-camera target derived from a camera rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraFocus {
    pub target: Vec2,
    pub distance: f32,
}

impl CameraRect {
    pub const FULL_PITCH: CameraRect = CameraRect {
        x: -5.0,
        y: -5.0,
        w: 120.0,
        h: 85.0,
    };

    pub fn center(&self) -> Vec2 {
        Vec2 {
            x: self.x + self.w * 0.5,
            y: self.y + self.h * 0.5,
        }
    }

    pub fn focus(&self) -> CameraFocus {
        CameraFocus {
            target: self.center(),
            distance: (self.w.max(self.h) * 0.9)
                .clamp(CAMERA_FOCUS_MIN_DISTANCE, CAMERA_FOCUS_MAX_DISTANCE),
        }
    }
}

/// One authored step of a scenario.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(default)]
    pub ball: Option<AuthoredPoint>,
    #[serde(rename = "atk", default)]
    pub attacking: BTreeMap<String, PlayerState>,
    #[serde(rename = "def", default)]
    pub defending: BTreeMap<String, PlayerState>,
    #[serde(default)]
    pub zones: Vec<Zone>,
    #[serde(rename = "arrs", default)]
    pub arrows: Vec<Arrow>,
    #[serde(rename = "ann", default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub caption: String,
    #[serde(rename = "dur", default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    #[serde(rename = "vb", default, skip_serializing_if = "Option::is_none")]
    pub camera: Option<CameraRect>,
}

impl Frame {
    pub fn side(&self, side: Side) -> &BTreeMap<String, PlayerState> {
        match side {
            Side::Attacking => &self.attacking,
            Side::Defending => &self.defending,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut BTreeMap<String, PlayerState> {
        match side {
            Side::Attacking => &mut self.attacking,
            Side::Defending => &mut self.defending,
        }
    }

    /// Attacking players first, then defending, each in role-key order.
    pub fn players(&self) -> impl Iterator<Item = DeclaredPlayer<'_>> {
        Side::ALL.into_iter().flat_map(move |side| {
            self.side(side)
                .iter()
                .map(move |(role, state)| DeclaredPlayer {
                    side,
                    role: role.as_str(),
                    state,
                })
        })
    }

    /// Authored duration, or `default` when absent, not positive, NaN or
    /// too large to represent.
    pub fn step_duration(&self, default: Duration) -> Duration {
        match self.duration_ms {
            Some(ms) if ms.is_finite() && ms > 0.0 => {
                Duration::try_from_secs_f64(ms / 1000.0).unwrap_or(default)
            }
            _ => default,
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Text {
        Str(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Option::<Text>::deserialize(deserializer)? {
        Some(Text::Str(value)) => value,
        Some(Text::Int(value)) => value.to_string(),
        Some(Text::Float(value)) => value.to_string(),
        None => String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn frame_decodes_authored_keys() {
        let frame: Frame = serde_json::from_value(json!({
            "ball": { "x": 40, "y": 45 },
            "atk": { "short": { "x": 40, "y": 45, "l": "S", "r": 9, "hl": true } },
            "def": { "post": { "x": 60, "y": 37.5, "sn": true, "hlPart": "head" } },
            "zones": [{ "t": "bully", "x": 50, "y": 30, "w": 14, "h": 14 }],
            "arrs": [{
                "from": { "x": 40, "y": 45 },
                "to": { "x": 50, "y": 45 },
                "c": "#ff0",
                "lbl": "run"
            }],
            "ann": [{ "t": "warning", "x": 55, "y": 60, "txt": "Sneaking!" }],
            "caption": "Short runs",
            "dur": 3000,
            "vb": { "x": 20, "y": 10, "w": 60, "h": 45 }
        }))
        .expect("frame");

        assert_eq!(frame.ball, Some(AuthoredPoint::at(40.0, 45.0)));
        let short = &frame.attacking["short"];
        assert_eq!(short.label, "S");
        assert_eq!(short.caption, "9");
        assert!(short.highlighted);
        assert!(frame.defending["post"].sneaking);
        assert_eq!(frame.defending["post"].highlight_part.as_deref(), Some("head"));
        assert_eq!(frame.zones[0].kind, ZoneKind::Bully);
        assert_eq!(frame.arrows[0].label.as_deref(), Some("run"));
        assert_eq!(frame.annotations[0].kind, AnnotationKind::Warning);
        assert_eq!(
            frame.step_duration(DEFAULT_STEP_DURATION),
            Duration::from_millis(3000)
        );
        assert_eq!(frame.camera.map(|rect| rect.w), Some(60.0));
    }

    #[test]
    fn unknown_tags_fall_back_to_defaults() {
        let zone: Zone =
            serde_json::from_value(json!({ "t": "tramline", "x": 0, "y": 0, "w": 1, "h": 1 }))
                .expect("zone");
        let annotation: Annotation =
            serde_json::from_value(json!({ "t": "note", "x": 1, "y": 1, "txt": "hi" }))
                .expect("annotation");
        assert_eq!(zone.kind, ZoneKind::Other);
        assert_eq!(annotation.kind, AnnotationKind::Info);

        let warning: Annotation =
            serde_json::from_value(json!({ "t": "warning", "x": 1, "y": 1, "txt": "offside" }))
                .expect("warning");
        assert_eq!(warning.kind, AnnotationKind::Warning);
    }

    #[test]
    fn missing_coordinates_are_entity_errors_not_decode_errors() {
        let frame: Frame = serde_json::from_value(json!({
            "atk": { "fly": { "y": 20 } },
            "ball": null
        }))
        .expect("frame");
        assert_eq!(
            frame.attacking["fly"].position(),
            Err(EntityError::MissingField { field: "x" })
        );
        assert!(frame.ball.is_none());
    }

    #[test]
    fn arrow_with_coincident_points_is_degenerate() {
        let arrow = Arrow::between(Vec2::new(10.0, 10.0), Vec2::new(10.0, 10.2));
        assert!(matches!(
            arrow.segment(),
            Err(EntityError::DegenerateArrow { .. })
        ));
        let arrow = Arrow::between(Vec2::new(10.0, 10.0), Vec2::new(14.0, 13.0));
        assert!(arrow.segment().is_ok());
    }

    #[test]
    fn zone_rect_rejects_non_positive_size() {
        let zone = Zone::new(ZoneKind::Sneaking, 0.0, 0.0, 0.0, 5.0);
        assert!(matches!(zone.rect(), Err(EntityError::EmptyZone { .. })));
        let zone = Zone::new(ZoneKind::Sneaking, 10.0, 20.0, 4.0, 6.0);
        assert_eq!(zone.rect().expect("rect").center(), Vec2::new(12.0, 23.0));
    }

    #[test]
    fn step_duration_falls_back_for_zero_missing_or_huge() {
        let mut frame = Frame::default();
        assert_eq!(frame.step_duration(DEFAULT_STEP_DURATION), DEFAULT_STEP_DURATION);
        frame.duration_ms = Some(0.0);
        assert_eq!(frame.step_duration(DEFAULT_STEP_DURATION), DEFAULT_STEP_DURATION);
        frame.duration_ms = Some(1200.0);
        assert_eq!(
            frame.step_duration(DEFAULT_STEP_DURATION),
            Duration::from_millis(1200)
        );
        frame.duration_ms = Some(1e300);
        assert_eq!(frame.step_duration(DEFAULT_STEP_DURATION), DEFAULT_STEP_DURATION);
    }

    #[test]
    fn players_iterate_attacking_then_defending() {
        let mut frame = Frame::default();
        frame.defending.insert("post".to_string(), PlayerState::at(1.0, 1.0));
        frame.attacking.insert("fly".to_string(), PlayerState::at(2.0, 2.0));
        frame.attacking.insert("short".to_string(), PlayerState::at(3.0, 3.0));

        let order = frame
            .players()
            .map(|player| (player.side, player.role))
            .collect::<Vec<_>>();
        assert_eq!(
            order,
            vec![
                (Side::Attacking, "fly"),
                (Side::Attacking, "short"),
                (Side::Defending, "post"),
            ]
        );
    }

    #[test]
    fn camera_focus_distance_is_clamped() {
        let wide = CameraRect::FULL_PITCH.focus();
        assert_eq!(wide.distance, CAMERA_FOCUS_MAX_DISTANCE);
        assert_eq!(wide.target, Vec2::new(55.0, 37.5));
        let tight = CameraRect {
            x: 40.0,
            y: 30.0,
            w: 10.0,
            h: 8.0,
        }
        .focus();
        assert_eq!(tight.distance, CAMERA_FOCUS_MIN_DISTANCE);
    }
}
