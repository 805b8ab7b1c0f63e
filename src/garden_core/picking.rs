use glam::{Vec2, Vec3};

use crate::garden_core::camera_rig::CameraView;
use crate::garden_core::grid::{Tile, TileGrid};

/// Drawable surface size in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite() && self.width >= 1.0 && self.height >= 1.0)
    }

    pub fn aspect(&self) -> f32 {
        if self.is_degenerate() {
            1.0
        } else {
            self.width / self.height
        }
    }

    /// Pixel position (origin top-left, y down) to normalized device
    /// coordinates (y up).
    pub fn to_ndc(&self, pixel: Vec2) -> Option<Vec2> {
        if self.is_degenerate() || !pixel.is_finite() {
            return None;
        }
        Some(Vec2::new(
            pixel.x / self.width * 2.0 - 1.0,
            1.0 - pixel.y / self.height * 2.0,
        ))
    }
}

/// Casts a ray through `ndc` and returns the first tile, in stored order,
/// whose quad contains the ground hit.
pub fn pick<'g>(ndc: Vec2, view: &CameraView, grid: &'g TileGrid) -> Option<&'g Tile> {
    let hit = view.ray_from_ndc(ndc)?.intersect_ground()?;
    tile_at(grid, hit)
}

/// Ground-plane point to tile. Points on a shared edge go to whichever
/// neighbour comes first in storage order.
pub fn tile_at(grid: &TileGrid, point: Vec3) -> Option<&Tile> {
    let (min, max) = grid.world_bounds();
    if point.x < min.x || point.x > max.x || point.z < min.y || point.z > max.y {
        return None;
    }
    grid.tiles()
        .iter()
        .find(|tile| grid.quad_contains(tile.coord, point))
}

/// `pick` from a pixel position; `None` for a degenerate viewport.
pub fn pick_pixel<'g>(
    pixel: Vec2,
    viewport: Viewport,
    view: &CameraView,
    grid: &'g TileGrid,
) -> Option<&'g Tile> {
    let ndc = viewport.to_ndc(pixel)?;
    pick(ndc, view, grid)
}

#[cfg(test)]
mod tests {
    use super::{pick, pick_pixel, tile_at, Viewport};
    use crate::garden_core::camera_rig::{CameraPose, CameraView, Lens};
    use crate::garden_core::grid::{GridSpec, TileCoord, TileGrid};
    use glam::{Vec2, Vec3};

    fn top_down(target: Vec3) -> CameraView {
        CameraView {
            pose: CameraPose::new(target + Vec3::new(0.0, 5.0, 0.01), target),
            lens: Lens::default(),
            aspect: 1.0,
        }
    }

    #[test]
    fn centre_of_screen_picks_the_tile_under_the_look_target() {
        let grid = TileGrid::build(GridSpec::default()).unwrap();
        let coord = TileCoord::new(14, 15);
        let view = top_down(grid.tile_center(coord));
        let picked = pick(Vec2::ZERO, &view, &grid).unwrap();
        assert_eq!(picked.coord, coord);
        assert!(picked.in_garden);
    }

    #[test]
    fn shared_edges_resolve_to_the_first_stored_tile() {
        let grid = TileGrid::build(GridSpec {
            tile_size: 0.5,
            grid_extent: 4,
            garden_width: 2,
            garden_height: 2,
        })
        .unwrap();
        let edge = Vec3::new(-0.5, 0.0, -0.25);
        assert!(grid.quad_contains(TileCoord::new(0, 1), edge));
        assert!(grid.quad_contains(TileCoord::new(1, 1), edge));
        assert_eq!(tile_at(&grid, edge).unwrap().coord, TileCoord::new(0, 1));
        assert!(tile_at(&grid, Vec3::new(1.01, 0.0, 0.0)).is_none());
    }

    #[test]
    fn off_grid_points_pick_nothing() {
        let grid = TileGrid::build(GridSpec::default()).unwrap();
        let outside = Vec3::new(20.0, 0.0, 0.0);
        let view = top_down(outside);
        assert!(pick(Vec2::ZERO, &view, &grid).is_none());
    }

    #[test]
    fn looking_at_the_sky_picks_nothing() {
        let grid = TileGrid::build(GridSpec::default()).unwrap();
        let view = CameraView {
            pose: CameraPose::new(Vec3::new(0.0, 1.0, 2.0), Vec3::new(0.0, 3.0, 0.0)),
            lens: Lens::default(),
            aspect: 1.0,
        };
        assert!(pick(Vec2::ZERO, &view, &grid).is_none());
    }

    #[test]
    fn degenerate_viewport_picks_nothing() {
        let grid = TileGrid::build(GridSpec::default()).unwrap();
        let view = top_down(Vec3::ZERO);
        let empty = Viewport::new(0.0, 600.0);
        assert!(pick_pixel(Vec2::new(10.0, 10.0), empty, &view, &grid).is_none());

        let viewport = Viewport::new(800.0, 600.0);
        assert!(pick_pixel(Vec2::new(400.0, 300.0), viewport, &view, &grid).is_some());
    }

    #[test]
    fn pixel_to_ndc_flips_y() {
        let viewport = Viewport::new(200.0, 100.0);
        assert_eq!(viewport.to_ndc(Vec2::new(0.0, 0.0)), Some(Vec2::new(-1.0, 1.0)));
        assert_eq!(viewport.to_ndc(Vec2::new(200.0, 100.0)), Some(Vec2::new(1.0, -1.0)));
    }
}
