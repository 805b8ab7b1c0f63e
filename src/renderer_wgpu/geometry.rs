use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::garden_core::grid::{Tile, TileGrid};

pub const OUTLINE_LIFT: f32 = 0.002;
pub const FILL_LIFT: f32 = 0.0005;
pub const OUTLINE_COLOR: [f32; 4] = [0.87, 0.87, 0.87, 1.0];
pub const FILL_COLOR: [f32; 4] = [0.80, 0.90, 0.78, 0.55];

pub const PLANT_QUAD: SpriteSize = SpriteSize {
    width: 0.3,
    height: 0.4,
};
pub const GROUND_COVER_QUAD: SpriteSize = SpriteSize {
    width: 0.2,
    height: 0.24,
};

pub const SPRITE_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Zeroable, Pod)]
pub struct ColorVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Zeroable, Pod)]
pub struct SpriteVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteSize {
    pub width: f32,
    pub height: f32,
}

impl SpriteSize {
    /// Upright quad in the XY plane with its bottom edge centred on the origin,
    /// so instances stand on the point they were placed at.
    pub fn vertices(self) -> [SpriteVertex; 4] {
        let half = self.width * 0.5;
        [
            SpriteVertex {
                position: [-half, 0.0, 0.0],
                uv: [0.0, 1.0],
            },
            SpriteVertex {
                position: [half, 0.0, 0.0],
                uv: [1.0, 1.0],
            },
            SpriteVertex {
                position: [half, self.height, 0.0],
                uv: [1.0, 0.0],
            },
            SpriteVertex {
                position: [-half, self.height, 0.0],
                uv: [0.0, 0.0],
            },
        ]
    }
}

fn tile_corners(grid: &TileGrid, tile: &Tile, lift: f32) -> [Vec3; 4] {
    let size = grid.spec().tile_size;
    let min = grid.tile_center(tile.coord) - Vec3::new(size * 0.5, 0.0, size * 0.5);
    [
        min + Vec3::new(0.0, lift, 0.0),
        min + Vec3::new(size, lift, 0.0),
        min + Vec3::new(size, lift, size),
        min + Vec3::new(0.0, lift, size),
    ]
}

/// Line list tracing every garden tile's edges.
pub fn garden_outline(grid: &TileGrid) -> Vec<ColorVertex> {
    let mut vertices = Vec::new();
    for tile in grid.garden_tiles() {
        let corners = tile_corners(grid, tile, OUTLINE_LIFT);
        for i in 0..4 {
            for corner in [corners[i], corners[(i + 1) % 4]] {
                vertices.push(ColorVertex {
                    position: corner.to_array(),
                    color: OUTLINE_COLOR,
                });
            }
        }
    }
    vertices
}

/// Two triangles per selected tile.
pub fn selection_fill(grid: &TileGrid) -> Vec<ColorVertex> {
    let mut vertices = Vec::new();
    for tile in grid.selected_tiles() {
        let c = tile_corners(grid, tile, FILL_LIFT);
        for corner in [c[0], c[1], c[2], c[0], c[2], c[3]] {
            vertices.push(ColorVertex {
                position: corner.to_array(),
                color: FILL_COLOR,
            });
        }
    }
    vertices
}
