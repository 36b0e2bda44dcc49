use crate::scenario::{CameraRect, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Pixels per pitch unit so that `rect` fits entirely inside the viewport.
pub fn pixels_per_unit(rect: CameraRect, viewport: Viewport) -> f32 {
    if rect.w <= 0.0 || rect.h <= 0.0 || viewport.width == 0 || viewport.height == 0 {
        return 1.0;
    }
    (viewport.width as f32 / rect.w).min(viewport.height as f32 / rect.h)
}

/// Maps an authored pitch point to screen pixels. The rect center lands on
/// the viewport center; authored y grows downwards like screen rows.
pub fn pitch_to_screen(point: Vec2, rect: CameraRect, viewport: Viewport) -> (i32, i32) {
    let scale = pixels_per_unit(rect, viewport);
    let center = rect.center();
    let x = (point.x - center.x) * scale + viewport.width as f32 * 0.5;
    let y = (point.y - center.y) * scale + viewport.height as f32 * 0.5;
    (x.round() as i32, y.round() as i32)
}

pub fn lerp_rect(from: CameraRect, to: CameraRect, t: f32) -> CameraRect {
    let t = t.clamp(0.0, 1.0);
    let lerp = |a: f32, b: f32| a + (b - a) * t;
    CameraRect {
        x: lerp(from.x, to.x),
        y: lerp(from.y, to.y),
        w: lerp(from.w, to.w),
        h: lerp(from.h, to.h),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Viewport = Viewport {
        width: 800,
        height: 600,
    };

    #[test]
    fn rect_center_maps_to_viewport_center() {
        let rect = CameraRect {
            x: 0.0,
            y: 0.0,
            w: 100.0,
            h: 50.0,
        };
        assert_eq!(pitch_to_screen(rect.center(), rect, VIEWPORT), (400, 300));
    }

    #[test]
    fn narrower_axis_limits_the_scale() {
        let wide = CameraRect {
            x: 0.0,
            y: 0.0,
            w: 200.0,
            h: 50.0,
        };
        assert_eq!(pixels_per_unit(wide, VIEWPORT), 4.0);
        assert_eq!(pitch_to_screen(Vec2::new(0.0, 25.0), wide, VIEWPORT), (0, 300));

        let tall = CameraRect { w: 10.0, ..wide };
        assert_eq!(pixels_per_unit(tall, VIEWPORT), 12.0);
    }

    #[test]
    fn degenerate_rect_falls_back_to_unit_scale() {
        let rect = CameraRect {
            x: 0.0,
            y: 0.0,
            w: 0.0,
            h: 10.0,
        };
        assert_eq!(pixels_per_unit(rect, VIEWPORT), 1.0);
    }

    #[test]
    fn lerp_rect_clamps_progress() {
        let from = CameraRect::FULL_PITCH;
        let to = CameraRect {
            x: 45.0,
            y: 25.0,
            w: 20.0,
            h: 20.0,
        };
        assert_eq!(lerp_rect(from, to, 2.0), to);
        assert_eq!(lerp_rect(from, to, 0.0), from);
        assert_eq!(lerp_rect(from, to, 0.5).x, 20.0);
    }
}
