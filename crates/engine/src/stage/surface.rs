use std::cmp::Ordering;
use std::fmt;

use crate::layout::{Pose, RenderPos};
use crate::motion::Property;
use crate::scenario::{AnnotationKind, CameraRect, Side, ZoneKind};

/// Opaque handle issued by a [`RenderSurface`] for one created visual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RenderHandle(u64);

impl RenderHandle {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Monotonic handle source for surfaces that have no native ids.
#[derive(Debug, Clone)]
pub struct HandleAllocator {
    next: u64,
}

impl Default for HandleAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl HandleAllocator {
    pub fn allocate(&mut self) -> RenderHandle {
        let handle = RenderHandle(self.next);
        self.next += 1;
        handle
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityClass {
    Player,
    Ball,
    Zone,
    Arrow,
    Annotation,
    Label,
}

/// Diff identity of a live entity. Player roles are scoped per side.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKey {
    Player { side: Side, role: String },
    Ball,
    Zone(usize),
    Arrow(usize),
    Annotation(usize),
    Label { side: Side, role: String },
}

impl EntityKey {
    pub fn player(side: Side, role: &str) -> Self {
        EntityKey::Player {
            side,
            role: role.to_string(),
        }
    }

    pub fn label(side: Side, role: &str) -> Self {
        EntityKey::Label {
            side,
            role: role.to_string(),
        }
    }

    pub fn class(&self) -> EntityClass {
        match self {
            EntityKey::Player { .. } => EntityClass::Player,
            EntityKey::Ball => EntityClass::Ball,
            EntityKey::Zone(_) => EntityClass::Zone,
            EntityKey::Arrow(_) => EntityClass::Arrow,
            EntityKey::Annotation(_) => EntityClass::Annotation,
            EntityKey::Label { .. } => EntityClass::Label,
        }
    }

    fn sort_key(&self) -> (EntityClass, Option<Side>, &str, usize) {
        match self {
            EntityKey::Player { side, role } | EntityKey::Label { side, role } => {
                (self.class(), Some(*side), role.as_str(), 0)
            }
            EntityKey::Ball => (EntityClass::Ball, None, "", 0),
            EntityKey::Zone(index) | EntityKey::Arrow(index) | EntityKey::Annotation(index) => {
                (self.class(), None, "", *index)
            }
        }
    }
}

impl Ord for EntityKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for EntityKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::Player { side, role } => write!(f, "{side}_{role}"),
            EntityKey::Ball => f.write_str("ball"),
            EntityKey::Zone(index) => write!(f, "zone_{index}"),
            EntityKey::Arrow(index) => write!(f, "arrow_{index}"),
            EntityKey::Annotation(index) => write!(f, "annotation_{index}"),
            EntityKey::Label { side, role } => write!(f, "label_{side}_{role}"),
        }
    }
}

/// What to draw, independent of where.
#[derive(Debug, Clone, PartialEq)]
pub enum Visual {
    Player {
        side: Side,
        role: String,
        label: String,
        caption: String,
        pose: Pose,
        highlighted: bool,
        sneaking: bool,
        cornering: bool,
        highlight_part: Option<String>,
    },
    Ball,
    Zone {
        kind: ZoneKind,
        width: f32,
        height: f32,
    },
    /// Drawn from the entity position towards `to`, shortened by the entity scale.
    Arrow {
        to: RenderPos,
        color: Option<String>,
        label: Option<String>,
        animated: bool,
    },
    Annotation {
        kind: AnnotationKind,
        text: String,
    },
    Label {
        text: String,
        side: Side,
        highlighted: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderState {
    pub position: RenderPos,
    pub rotation: f32,
    pub opacity: f32,
    pub scale: f32,
    pub visual: Visual,
}

impl RenderState {
    pub fn new(position: RenderPos, visual: Visual) -> Self {
        Self {
            position,
            rotation: 0.0,
            opacity: 1.0,
            scale: 1.0,
            visual,
        }
    }

    pub fn get(&self, property: Property) -> f32 {
        match property {
            Property::PositionX => self.position.x,
            Property::PositionY => self.position.y,
            Property::PositionZ => self.position.z,
            Property::Rotation => self.rotation,
            Property::Opacity => self.opacity,
            Property::Scale => self.scale,
        }
    }

    pub fn set(&mut self, property: Property, value: f32) {
        match property {
            Property::PositionX => self.position.x = value,
            Property::PositionY => self.position.y = value,
            Property::PositionZ => self.position.z = value,
            Property::Rotation => self.rotation = value,
            Property::Opacity => self.opacity = value,
            Property::Scale => self.scale = value,
        }
    }
}

/// Render collaborator driven by the reconciler. Implementations own the
/// actual drawing; the engine only tells them what exists and where.
pub trait RenderSurface {
    fn create_entity(
        &mut self,
        class: EntityClass,
        key: &EntityKey,
        state: &RenderState,
    ) -> RenderHandle;

    fn update_entity(&mut self, handle: RenderHandle, state: &RenderState);

    fn destroy_entity(&mut self, handle: RenderHandle);

    fn set_camera_rect(&mut self, rect: CameraRect, animate: bool);
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn entity_keys_order_by_class_then_identity() {
        let keys = [
            EntityKey::label(Side::Attacking, "fly"),
            EntityKey::Zone(1),
            EntityKey::Ball,
            EntityKey::player(Side::Defending, "post"),
            EntityKey::player(Side::Attacking, "short"),
            EntityKey::Zone(0),
        ]
        .into_iter()
        .collect::<BTreeSet<_>>();
        let names = keys.iter().map(ToString::to_string).collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![
                "atk_short",
                "def_post",
                "ball",
                "zone_0",
                "zone_1",
                "label_atk_fly"
            ]
        );
    }

    #[test]
    fn render_state_properties_round_trip() {
        let mut state = RenderState::new(RenderPos::default(), Visual::Ball);
        for (offset, property) in Property::ALL.into_iter().enumerate() {
            state.set(property, offset as f32 + 0.5);
        }
        assert_eq!(state.position, RenderPos::new(0.5, 1.5, 2.5));
        assert_eq!(state.get(Property::Scale), 5.5);
    }
}
