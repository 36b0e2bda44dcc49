use crate::scenario::Vec2;

/// Position in render space.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RenderPos {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl RenderPos {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderAxis {
    X,
    Y,
    Z,
}

/// Converts authored pitch coordinates into render space.
///
/// `Plane` keeps the authored plane and stacks by elevation; `Ground` lays the
/// authored plane on the floor so that authored y becomes render z.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CoordinateMapper {
    #[default]
    Plane,
    Ground,
}

impl CoordinateMapper {
    pub fn map(self, point: Vec2, elevation: f32) -> RenderPos {
        match self {
            CoordinateMapper::Plane => RenderPos::new(point.x, point.y, elevation),
            CoordinateMapper::Ground => RenderPos::new(point.x, elevation, point.y),
        }
    }

    /// Inverse of [`CoordinateMapper::map`], dropping elevation.
    pub fn unmap(self, position: RenderPos) -> Vec2 {
        match self {
            CoordinateMapper::Plane => Vec2::new(position.x, position.y),
            CoordinateMapper::Ground => Vec2::new(position.x, position.z),
        }
    }

    pub fn vertical_axis(self) -> RenderAxis {
        match self {
            CoordinateMapper::Plane => RenderAxis::Z,
            CoordinateMapper::Ground => RenderAxis::Y,
        }
    }

    /// Facing angles are shared between both spaces.
    pub fn facing(self, angle: f32) -> f32 {
        angle
    }
}
