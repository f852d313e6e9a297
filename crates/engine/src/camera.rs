use crate::geom::Vec2;

/// Scroll offset that centers `focus` in a `viewport`-sized window, clamped per axis to
/// `[0, map_size - viewport]` so the window never leaves the map. A map smaller than the
/// viewport pins the offset at zero on that axis.
pub fn camera_offset(focus: Vec2, viewport: Vec2, map_size: Vec2) -> Vec2 {
    Vec2::new(
        clamp_axis(focus.x, viewport.x, map_size.x),
        clamp_axis(focus.y, viewport.y, map_size.y),
    )
}

fn clamp_axis(focus: f32, viewport: f32, map: f32) -> f32 {
    let max_scroll = (map - viewport).max(0.0);
    let centered = focus - viewport * 0.5;
    if !centered.is_finite() {
        return 0.0;
    }
    centered.clamp(0.0, max_scroll)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAP: Vec2 = Vec2::new(448.0, 448.0);
    const VIEWPORT: Vec2 = Vec2::new(256.0, 144.0);

    #[test]
    fn interior_focus_is_centered() {
        let offset = camera_offset(Vec2::new(200.0, 200.0), VIEWPORT, MAP);
        assert_eq!(offset, Vec2::new(72.0, 128.0));
    }

    #[test]
    fn near_origin_clamps_to_zero() {
        let offset = camera_offset(Vec2::new(107.5, 107.5), VIEWPORT, MAP);
        assert_eq!(offset, Vec2::new(0.0, 35.5));
    }

    #[test]
    fn far_edge_clamps_to_max_scroll() {
        let offset = camera_offset(Vec2::new(440.0, 440.0), VIEWPORT, MAP);
        assert_eq!(offset, Vec2::new(192.0, 304.0));
    }

    #[test]
    fn offset_stays_in_range_for_positions_outside_the_map() {
        for x in [-10_000.0, -1.0, 0.0, 128.0, 447.0, 448.0, 10_000.0] {
            for y in [-500.0, 0.0, 300.0, 9_999.0] {
                let offset = camera_offset(Vec2::new(x, y), VIEWPORT, MAP);
                assert!((0.0..=MAP.x - VIEWPORT.x).contains(&offset.x), "x={x}");
                assert!((0.0..=MAP.y - VIEWPORT.y).contains(&offset.y), "y={y}");
            }
        }
    }

    #[test]
    fn map_smaller_than_viewport_pins_at_zero() {
        let small_map = Vec2::new(100.0, 500.0);
        let offset = camera_offset(Vec2::new(90.0, 250.0), VIEWPORT, small_map);
        assert_eq!(offset.x, 0.0);
        assert_eq!(offset.y, 178.0);
    }

    #[test]
    fn same_focus_gives_same_offset() {
        let focus = Vec2::new(311.25, 97.5);
        assert_eq!(
            camera_offset(focus, VIEWPORT, MAP),
            camera_offset(focus, VIEWPORT, MAP)
        );
    }

    #[test]
    fn non_finite_focus_falls_back_to_origin() {
        let offset = camera_offset(Vec2::new(f32::NAN, f32::INFINITY), VIEWPORT, MAP);
        assert_eq!(offset, Vec2::ZERO);
    }
}
