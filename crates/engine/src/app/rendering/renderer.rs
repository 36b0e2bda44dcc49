use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use pixels::{Error, Pixels, SurfaceTexture};
use tracing::{debug, info};
use winit::window::Window;

use crate::layout::{CoordinateMapper, Pose};
use crate::motion::Easing;
use crate::scenario::{AnnotationKind, CameraRect, Side, Vec2, ZoneKind};
use crate::stage::{
    EntityClass, EntityKey, HandleAllocator, RenderHandle, RenderState, RenderSurface, Visual,
};

use super::transform::{lerp_rect, pitch_to_screen, pixels_per_unit, Viewport};

const CLEAR_COLOR: [u8; 4] = [18, 22, 26, 255];
const GRASS_COLOR: [u8; 4] = [44, 98, 58, 255];
const LINE_COLOR: [u8; 4] = [225, 235, 225, 255];
const ATTACKING_COLOR: [u8; 4] = [0x29, 0x80, 0xb9, 255];
const DEFENDING_COLOR: [u8; 4] = [0xc0, 0x39, 0x2b, 255];
const HIGHLIGHT_COLOR: [u8; 4] = [0xf1, 0xc4, 0x0f, 255];
const SNEAKING_COLOR: [u8; 4] = [0xe7, 0x4c, 0x3c, 255];
const CORNERING_COLOR: [u8; 4] = [0x34, 0x98, 0xdb, 255];
const BALL_COLOR: [u8; 4] = [250, 250, 245, 255];
const ARROW_DEFAULT_COLOR: [u8; 4] = [240, 240, 240, 255];

const PITCH_LENGTH: f32 = 110.0;
const PITCH_WIDTH: f32 = 75.0;
const PLAYER_RADIUS: f32 = 1.3;
const CROUCH_RADIUS: f32 = 1.0;
const BALL_RADIUS: f32 = 0.6;
const POSSESSION_RING_RADIUS: f32 = 1.9;
const ARROW_HEAD_LENGTH: f32 = 1.5;
const MARKER_BAR_HEIGHT: f32 = 1.0;
const MARKER_CHAR_WIDTH: f32 = 0.6;
const LABEL_LIFT: f32 = 2.8;
const ANIMATED_DASH_PX: i32 = 6;
const CAMERA_TRANSITION: Duration = Duration::from_millis(800);

#[derive(Debug, Clone)]
struct CanvasEntity {
    class: EntityClass,
    key: EntityKey,
    state: RenderState,
}

#[derive(Debug, Clone, Copy)]
struct CameraTrack {
    current: CameraRect,
    from: CameraRect,
    to: CameraRect,
    started: Option<Duration>,
    pending: bool,
}

impl CameraTrack {
    fn new(rect: CameraRect) -> Self {
        Self {
            current: rect,
            from: rect,
            to: rect,
            started: None,
            pending: false,
        }
    }

    fn retarget(&mut self, rect: CameraRect, animate: bool) {
        if animate {
            self.from = self.current;
            self.to = rect;
            self.pending = true;
        } else {
            *self = Self::new(rect);
        }
    }

    /// Transitions start on the first frame drawn after a retarget.
    fn advance(&mut self, now: Duration) -> CameraRect {
        if self.pending {
            self.started = Some(now);
            self.pending = false;
        }
        if let Some(started) = self.started {
            let t = now.saturating_sub(started).as_secs_f32() / CAMERA_TRANSITION.as_secs_f32();
            if t >= 1.0 {
                self.current = self.to;
                self.started = None;
            } else {
                self.current = lerp_rect(self.from, self.to, Easing::InOutCubic.apply(t));
            }
        }
        self.current
    }
}

/// Software pitch drawing behind the reconciler's render surface calls.
#[derive(Debug)]
pub struct PitchCanvas {
    mapper: CoordinateMapper,
    handles: HandleAllocator,
    entities: BTreeMap<RenderHandle, CanvasEntity>,
    camera: CameraTrack,
}

impl PitchCanvas {
    pub fn new(mapper: CoordinateMapper) -> Self {
        Self {
            mapper,
            handles: HandleAllocator::default(),
            entities: BTreeMap::new(),
            camera: CameraTrack::new(CameraRect::FULL_PITCH),
        }
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn camera_rect(&self) -> CameraRect {
        self.camera.current
    }

    pub fn draw(&mut self, frame: &mut [u8], viewport: Viewport, now: Duration) {
        if viewport.width == 0 || viewport.height == 0 {
            return;
        }
        let mut painter = Painter {
            frame,
            viewport,
            rect: self.camera.advance(now),
        };
        for chunk in painter.frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&CLEAR_COLOR);
        }
        painter.draw_pitch();

        let mut ordered = self.entities.values().collect::<Vec<_>>();
        ordered.sort_by_key(|entity| draw_layer(entity.class));
        for entity in ordered {
            let anchor = self.mapper.unmap(entity.state.position);
            painter.draw_entity(anchor, &entity.state, self.mapper, now);
        }
    }
}

impl RenderSurface for PitchCanvas {
    fn create_entity(
        &mut self,
        class: EntityClass,
        key: &EntityKey,
        state: &RenderState,
    ) -> RenderHandle {
        let handle = self.handles.allocate();
        self.entities.insert(
            handle,
            CanvasEntity {
                class,
                key: key.clone(),
                state: state.clone(),
            },
        );
        handle
    }

    fn update_entity(&mut self, handle: RenderHandle, state: &RenderState) {
        match self.entities.get_mut(&handle) {
            Some(entity) => entity.state = state.clone(),
            None => debug!(handle = handle.raw(), "canvas_update_unknown_handle"),
        }
    }

    fn destroy_entity(&mut self, handle: RenderHandle) {
        if let Some(entity) = self.entities.remove(&handle) {
            debug!(entity = %entity.key, "canvas_entity_destroyed");
        }
    }

    fn set_camera_rect(&mut self, rect: CameraRect, animate: bool) {
        let focus = rect.focus();
        info!(
            target_x = focus.target.x,
            target_y = focus.target.y,
            distance = focus.distance,
            animate,
            "camera_focus"
        );
        self.camera.retarget(rect, animate);
    }
}

pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
    canvas: PitchCanvas,
}

impl Renderer {
    pub fn new(window: Arc<Window>, mapper: CoordinateMapper) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport {
                width: size.width,
                height: size.height,
            },
            canvas: PitchCanvas::new(mapper),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport { width, height };
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn canvas(&self) -> &PitchCanvas {
        &self.canvas
    }

    pub fn render(&mut self, now: Duration) -> Result<(), Error> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Ok(());
        }
        self.canvas.draw(self.pixels.frame_mut(), self.viewport, now);
        self.pixels.render()
    }
}

impl RenderSurface for Renderer {
    fn create_entity(
        &mut self,
        class: EntityClass,
        key: &EntityKey,
        state: &RenderState,
    ) -> RenderHandle {
        self.canvas.create_entity(class, key, state)
    }

    fn update_entity(&mut self, handle: RenderHandle, state: &RenderState) {
        self.canvas.update_entity(handle, state);
    }

    fn destroy_entity(&mut self, handle: RenderHandle) {
        self.canvas.destroy_entity(handle);
    }

    fn set_camera_rect(&mut self, rect: CameraRect, animate: bool) {
        self.canvas.set_camera_rect(rect, animate);
    }
}

fn draw_layer(class: EntityClass) -> u8 {
    match class {
        EntityClass::Zone => 0,
        EntityClass::Arrow => 1,
        EntityClass::Player => 2,
        EntityClass::Ball => 3,
        EntityClass::Annotation => 4,
        EntityClass::Label => 5,
    }
}

fn side_color(side: Side) -> [u8; 4] {
    match side {
        Side::Attacking => ATTACKING_COLOR,
        Side::Defending => DEFENDING_COLOR,
    }
}

fn zone_color(kind: ZoneKind) -> [u8; 4] {
    match kind {
        ZoneKind::Bully => [0xf3, 0x9c, 0x12, 255],
        ZoneKind::Sneaking => [0xe7, 0x4c, 0x3c, 255],
        ZoneKind::OnTheLine => [0x34, 0x98, 0xdb, 255],
        ZoneKind::Rougeable => [0x27, 0xae, 0x60, 255],
        ZoneKind::Other => [255, 255, 255, 255],
    }
}

fn annotation_color(kind: AnnotationKind) -> [u8; 4] {
    match kind {
        AnnotationKind::Info => [236, 240, 241, 255],
        AnnotationKind::Warning => [0xf3, 0x9c, 0x12, 255],
        AnnotationKind::Scoring => [0x2e, 0xcc, 0x71, 255],
    }
}

/// Parses `#rrggbb` (leading `#` optional).
fn parse_hex_color(raw: &str) -> Option<[u8; 4]> {
    let hex = raw.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    Some([channel(0..2)?, channel(2..4)?, channel(4..6)?, 255])
}

struct Painter<'a> {
    frame: &'a mut [u8],
    viewport: Viewport,
    rect: CameraRect,
}

impl Painter<'_> {
    fn to_screen(&self, point: Vec2) -> (i32, i32) {
        pitch_to_screen(point, self.rect, self.viewport)
    }

    fn to_pixels(&self, units: f32) -> i32 {
        (units * pixels_per_unit(self.rect, self.viewport)).round().max(1.0) as i32
    }

    fn draw_pitch(&mut self) {
        let top_left = self.to_screen(Vec2::new(0.0, 0.0));
        let bottom_right = self.to_screen(Vec2::new(PITCH_LENGTH, PITCH_WIDTH));
        self.fill_rect(top_left, bottom_right, GRASS_COLOR, 1.0);
        self.rect_outline(top_left, bottom_right, LINE_COLOR);

        let halfway_top = self.to_screen(Vec2::new(PITCH_LENGTH * 0.5, 0.0));
        let halfway_bottom = self.to_screen(Vec2::new(PITCH_LENGTH * 0.5, PITCH_WIDTH));
        self.line(halfway_top, halfway_bottom, LINE_COLOR, 0.6, None);
    }

    fn draw_entity(
        &mut self,
        anchor: Vec2,
        state: &RenderState,
        mapper: CoordinateMapper,
        now: Duration,
    ) {
        let opacity = state.opacity.clamp(0.0, 1.0);
        if opacity <= 0.0 {
            return;
        }
        match &state.visual {
            Visual::Zone {
                kind,
                width,
                height,
            } => {
                let half = Vec2::new(width * 0.5, height * 0.5);
                let top_left = self.to_screen(Vec2::new(anchor.x - half.x, anchor.y - half.y));
                let bottom_right =
                    self.to_screen(Vec2::new(anchor.x + half.x, anchor.y + half.y));
                let color = zone_color(*kind);
                self.fill_rect(top_left, bottom_right, color, opacity);
                self.rect_outline(top_left, bottom_right, color);
            }
            Visual::Arrow {
                to, color, animated, ..
            } => {
                let target = mapper.unmap(*to);
                let scale = state.scale.clamp(0.0, 1.0);
                let tip = Vec2::new(
                    anchor.x + (target.x - anchor.x) * scale,
                    anchor.y + (target.y - anchor.y) * scale,
                );
                let color = color
                    .as_deref()
                    .and_then(parse_hex_color)
                    .unwrap_or(ARROW_DEFAULT_COLOR);
                let dash = animated.then(|| (now.as_millis() / 40 % 8) as i32);
                let start = self.to_screen(anchor);
                let end = self.to_screen(tip);
                self.line(start, end, color, opacity, dash);
                self.arrow_head(anchor, tip, color, opacity);
            }
            Visual::Player {
                side,
                pose,
                highlighted,
                sneaking,
                cornering,
                ..
            } => {
                let center = self.to_screen(anchor);
                let radius = match pose {
                    Pose::FormationCrouch => CROUCH_RADIUS,
                    _ => PLAYER_RADIUS,
                } * state.scale;
                let radius_px = self.to_pixels(radius);
                self.fill_circle(center, radius_px, side_color(*side), opacity);
                if *pose == Pose::RunningWithBall {
                    let ring = self.to_pixels(POSSESSION_RING_RADIUS * state.scale);
                    self.circle_outline(center, ring, BALL_COLOR, opacity);
                }
                if *highlighted {
                    self.circle_outline(center, radius_px + 2, HIGHLIGHT_COLOR, opacity);
                }
                if *sneaking {
                    self.fill_circle(center, (radius_px / 3).max(1), SNEAKING_COLOR, opacity);
                }
                if *cornering {
                    self.circle_outline(center, radius_px + 4, CORNERING_COLOR, opacity);
                }
            }
            Visual::Ball => {
                let radius = self.to_pixels(BALL_RADIUS * state.scale);
                self.fill_circle(self.to_screen(anchor), radius, BALL_COLOR, opacity);
            }
            Visual::Annotation { kind, text } => {
                self.marker_bar(anchor, text, annotation_color(*kind), state.scale, opacity);
            }
            Visual::Label {
                text,
                side,
                highlighted,
            } => {
                let color = if *highlighted {
                    HIGHLIGHT_COLOR
                } else {
                    side_color(*side)
                };
                let lifted = Vec2::new(anchor.x, anchor.y - LABEL_LIFT);
                self.marker_bar(lifted, text, color, state.scale, opacity);
            }
        }
    }

    /// Text stand-in: a bar as wide as the text would be.
    fn marker_bar(&mut self, center: Vec2, text: &str, color: [u8; 4], scale: f32, opacity: f32) {
        let scale = scale.max(0.0);
        let half_width = text.chars().count() as f32 * MARKER_CHAR_WIDTH * 0.5 * scale;
        let half_height = MARKER_BAR_HEIGHT * 0.5 * scale;
        let top_left = self.to_screen(Vec2::new(center.x - half_width, center.y - half_height));
        let bottom_right =
            self.to_screen(Vec2::new(center.x + half_width, center.y + half_height));
        self.fill_rect(top_left, bottom_right, color, opacity);
    }

    fn arrow_head(&mut self, from: Vec2, tip: Vec2, color: [u8; 4], opacity: f32) {
        let length = from.distance(tip);
        if length <= f32::EPSILON {
            return;
        }
        let dir = Vec2::new((tip.x - from.x) / length, (tip.y - from.y) / length);
        let back = Vec2::new(
            tip.x - dir.x * ARROW_HEAD_LENGTH,
            tip.y - dir.y * ARROW_HEAD_LENGTH,
        );
        let spread = ARROW_HEAD_LENGTH * 0.5;
        let end = self.to_screen(tip);
        for sign in [-1.0, 1.0] {
            let wing = Vec2::new(back.x - dir.y * spread * sign, back.y + dir.x * spread * sign);
            let start = self.to_screen(wing);
            self.line(start, end, color, opacity, None);
        }
    }

    fn fill_rect(&mut self, a: (i32, i32), b: (i32, i32), color: [u8; 4], opacity: f32) {
        for y in a.1.min(b.1)..=a.1.max(b.1) {
            for x in a.0.min(b.0)..=a.0.max(b.0) {
                self.blend(x, y, color, opacity);
            }
        }
    }

    fn rect_outline(&mut self, a: (i32, i32), b: (i32, i32), color: [u8; 4]) {
        let (left, right) = (a.0.min(b.0), a.0.max(b.0));
        let (top, bottom) = (a.1.min(b.1), a.1.max(b.1));
        for x in left..=right {
            self.blend(x, top, color, 1.0);
            self.blend(x, bottom, color, 1.0);
        }
        for y in top..=bottom {
            self.blend(left, y, color, 1.0);
            self.blend(right, y, color, 1.0);
        }
    }

    fn fill_circle(&mut self, center: (i32, i32), radius: i32, color: [u8; 4], opacity: f32) {
        let radius_sq = radius * radius;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= radius_sq {
                    self.blend(center.0 + dx, center.1 + dy, color, opacity);
                }
            }
        }
    }

    fn circle_outline(&mut self, center: (i32, i32), radius: i32, color: [u8; 4], opacity: f32) {
        let outer = radius * radius;
        let inner = (radius - 1) * (radius - 1);
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let distance_sq = dx * dx + dy * dy;
                if distance_sq <= outer && distance_sq > inner {
                    self.blend(center.0 + dx, center.1 + dy, color, opacity);
                }
            }
        }
    }

    /// Bresenham line; `dash` is the phase of a marching dash pattern.
    fn line(
        &mut self,
        start: (i32, i32),
        end: (i32, i32),
        color: [u8; 4],
        opacity: f32,
        dash: Option<i32>,
    ) {
        let (mut x, mut y) = start;
        let dx = (end.0 - x).abs();
        let dy = -(end.1 - y).abs();
        let step_x = if x < end.0 { 1 } else { -1 };
        let step_y = if y < end.1 { 1 } else { -1 };
        let mut error = dx + dy;
        let mut walked = 0;
        loop {
            let visible = dash.map_or(true, |phase| {
                (walked + phase) % (ANIMATED_DASH_PX * 2) < ANIMATED_DASH_PX
            });
            if visible {
                self.blend(x, y, color, opacity);
            }
            if (x, y) == end {
                break;
            }
            let doubled = 2 * error;
            if doubled >= dy {
                error += dy;
                x += step_x;
            }
            if doubled <= dx {
                error += dx;
                y += step_y;
            }
            walked += 1;
        }
    }

    fn blend(&mut self, x: i32, y: i32, color: [u8; 4], opacity: f32) {
        let Some(offset) = pixel_offset(self.viewport, x, y) else {
            return;
        };
        let Some(pixel) = self.frame.get_mut(offset..offset + 4) else {
            return;
        };
        let alpha = opacity.clamp(0.0, 1.0) * f32::from(color[3]) / 255.0;
        for channel in 0..3 {
            let dst = f32::from(pixel[channel]);
            let src = f32::from(color[channel]);
            pixel[channel] = (dst + (src - dst) * alpha).round() as u8;
        }
        pixel[3] = 255;
    }
}

fn pixel_offset(viewport: Viewport, x: i32, y: i32) -> Option<usize> {
    if x < 0 || y < 0 || x >= viewport.width as i32 || y >= viewport.height as i32 {
        return None;
    }
    let row = (y as usize).checked_mul(viewport.width as usize)?;
    row.checked_add(x as usize)?.checked_mul(4)
}
