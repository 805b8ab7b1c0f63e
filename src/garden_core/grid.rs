use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Integer address of a tile; `z` runs along the world Z axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: i32,
    pub z: i32,
}

impl TileCoord {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

/// Largest accepted `grid_extent`; keeps the lattice at a million tiles or fewer
/// and every coordinate well inside `i32`.
pub const MAX_GRID_EXTENT: u32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSpec {
    pub tile_size: f32,
    pub grid_extent: u32,
    pub garden_width: u32,
    pub garden_height: u32,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            tile_size: 0.3,
            grid_extent: 30,
            garden_width: 9,
            garden_height: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidSpecError {
    #[error("tile size must be positive, got {0}")]
    NonPositiveTileSize(f32),
    #[error("grid extent must be at least one tile")]
    EmptyExtent,
    #[error("grid extent {extent} exceeds the maximum of {max} tiles")]
    ExtentTooLarge { extent: u32, max: u32 },
    #[error("garden must be at least 1x1 tiles, got {width}x{height}")]
    EmptyGarden { width: u32, height: u32 },
    #[error("garden {width}x{height} does not fit in a {extent}x{extent} grid")]
    GardenExceedsExtent { width: u32, height: u32, extent: u32 },
}

impl GridSpec {
    pub fn validate(&self) -> Result<(), InvalidSpecError> {
        if !(self.tile_size.is_finite() && self.tile_size > 0.0) {
            return Err(InvalidSpecError::NonPositiveTileSize(self.tile_size));
        }
        if self.grid_extent == 0 {
            return Err(InvalidSpecError::EmptyExtent);
        }
        if self.grid_extent > MAX_GRID_EXTENT {
            return Err(InvalidSpecError::ExtentTooLarge {
                extent: self.grid_extent,
                max: MAX_GRID_EXTENT,
            });
        }
        if self.garden_width == 0 || self.garden_height == 0 {
            return Err(InvalidSpecError::EmptyGarden {
                width: self.garden_width,
                height: self.garden_height,
            });
        }
        if self.garden_width > self.grid_extent || self.garden_height > self.grid_extent {
            return Err(InvalidSpecError::GardenExceedsExtent {
                width: self.garden_width,
                height: self.garden_height,
                extent: self.grid_extent,
            });
        }
        Ok(())
    }

    pub fn with_garden_size(self, width: u32, height: u32) -> Self {
        Self {
            garden_width: width,
            garden_height: height,
            ..self
        }
    }

    pub fn garden_area(&self) -> u32 {
        self.garden_width * self.garden_height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub coord: TileCoord,
    pub in_garden: bool,
    pub selected: bool,
}

/// The tile lattice for one `GridSpec`. Rebuilt wholesale when the garden
/// dimensions change; tiles are stored x-major (`x * extent + z`).
#[derive(Debug, Clone)]
pub struct TileGrid {
    spec: GridSpec,
    garden_origin: TileCoord,
    tiles: Vec<Tile>,
}

impl TileGrid {
    pub fn build(spec: GridSpec) -> Result<Self, InvalidSpecError> {
        spec.validate()?;

        let extent = spec.grid_extent as i32;
        let garden_origin = TileCoord::new(
            (extent - spec.garden_width as i32) / 2,
            (extent - spec.garden_height as i32) / 2,
        );
        let x_range = garden_origin.x..garden_origin.x + spec.garden_width as i32;
        let z_range = garden_origin.z..garden_origin.z + spec.garden_height as i32;

        let tile_count = (spec.grid_extent as usize)
            .checked_mul(spec.grid_extent as usize)
            .ok_or(InvalidSpecError::ExtentTooLarge {
                extent: spec.grid_extent,
                max: MAX_GRID_EXTENT,
            })?;
        let mut tiles = Vec::with_capacity(tile_count);
        for x in 0..extent {
            for z in 0..extent {
                let in_garden = x_range.contains(&x) && z_range.contains(&z);
                tiles.push(Tile {
                    coord: TileCoord::new(x, z),
                    in_garden,
                    selected: in_garden,
                });
            }
        }

        Ok(Self {
            spec,
            garden_origin,
            tiles,
        })
    }

    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn garden_origin(&self) -> TileCoord {
        self.garden_origin
    }

    fn index_of(&self, coord: TileCoord) -> Option<usize> {
        let extent = self.spec.grid_extent as i32;
        if !(0..extent).contains(&coord.x) || !(0..extent).contains(&coord.z) {
            return None;
        }
        Some(coord.x as usize * extent as usize + coord.z as usize)
    }

    pub fn tile(&self, coord: TileCoord) -> Option<&Tile> {
        self.index_of(coord).map(|i| &self.tiles[i])
    }

    /// Flips the `selected` flag of an in-garden tile. Returns `false` (and
    /// leaves the grid untouched) for unknown or out-of-garden tiles.
    pub(crate) fn set_selected(&mut self, coord: TileCoord, selected: bool) -> bool {
        let Some(index) = self.index_of(coord) else {
            return false;
        };
        let tile = &mut self.tiles[index];
        if !tile.in_garden {
            return false;
        }
        tile.selected = selected;
        true
    }

    pub fn garden_tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter().filter(|t| t.in_garden)
    }

    pub fn selected_tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter().filter(|t| t.selected)
    }

    fn half_extent(&self) -> f32 {
        self.spec.grid_extent as f32 * self.spec.tile_size * 0.5
    }

    /// Maps continuous tile-space coordinates to the ground plane. Integer
    /// inputs land on tile centres.
    pub fn tile_to_world(&self, x: f32, z: f32) -> Vec3 {
        let size = self.spec.tile_size;
        let half = self.half_extent();
        Vec3::new(x * size - half + size * 0.5, 0.0, z * size - half + size * 0.5)
    }

    pub fn tile_center(&self, coord: TileCoord) -> Vec3 {
        self.tile_to_world(coord.x as f32, coord.z as f32)
    }

    /// Closed containment test against the tile's world-space quad, so points
    /// on a shared edge belong to both neighbours.
    pub fn quad_contains(&self, coord: TileCoord, point: Vec3) -> bool {
        let center = self.tile_center(coord);
        let half = self.spec.tile_size * 0.5;
        (point.x - center.x).abs() <= half && (point.z - center.z).abs() <= half
    }

    /// World-space XZ bounds of the whole lattice.
    pub fn world_bounds(&self) -> (Vec2, Vec2) {
        let half = self.half_extent();
        (Vec2::splat(-half), Vec2::splat(half))
    }

    /// World-space XZ bounds of the garden sub-rectangle.
    pub fn garden_bounds(&self) -> (Vec2, Vec2) {
        let size = self.spec.tile_size;
        let half = self.half_extent();
        let min = Vec2::new(
            self.garden_origin.x as f32 * size - half,
            self.garden_origin.z as f32 * size - half,
        );
        let max = min
            + Vec2::new(
                self.spec.garden_width as f32 * size,
                self.spec.garden_height as f32 * size,
            );
        (min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::{GridSpec, InvalidSpecError, TileCoord, TileGrid, MAX_GRID_EXTENT};

    #[test]
    fn garden_tile_count_matches_dimensions() {
        for (w, h, extent) in [(9, 10, 30), (1, 1, 1), (30, 30, 30), (4, 7, 11), (2, 3, 4)] {
            let spec = GridSpec {
                tile_size: 0.3,
                grid_extent: extent,
                garden_width: w,
                garden_height: h,
            };
            let grid = TileGrid::build(spec).unwrap();
            assert_eq!(grid.tiles().len(), (extent * extent) as usize);
            assert_eq!(grid.garden_tiles().count(), (w * h) as usize);
            assert_eq!(grid.selected_tiles().count(), (w * h) as usize);
        }
    }

    #[test]
    fn garden_is_a_centered_contiguous_rectangle() {
        let grid = TileGrid::build(GridSpec::default()).unwrap();
        let origin = grid.garden_origin();
        assert_eq!(origin, TileCoord::new(10, 10));

        for tile in grid.tiles() {
            let inside = (10..19).contains(&tile.coord.x) && (10..20).contains(&tile.coord.z);
            assert_eq!(tile.in_garden, inside, "tile {:?}", tile.coord);
        }

        let (min, max) = grid.garden_bounds();
        let (world_min, world_max) = grid.world_bounds();
        assert!(min.x >= world_min.x && min.y >= world_min.y);
        assert!(max.x <= world_max.x && max.y <= world_max.y);
    }

    #[test]
    fn tiles_are_stored_x_major_and_unique() {
        let grid = TileGrid::build(GridSpec::default()).unwrap();
        let tiles = grid.tiles();
        assert_eq!(tiles[0].coord, TileCoord::new(0, 0));
        assert_eq!(tiles[1].coord, TileCoord::new(0, 1));
        assert_eq!(tiles[30].coord, TileCoord::new(1, 0));

        let unique: std::collections::HashSet<_> = tiles.iter().map(|t| t.coord).collect();
        assert_eq!(unique.len(), tiles.len());
    }

    #[test]
    fn rejects_invalid_specs() {
        let base = GridSpec::default();
        assert_eq!(
            TileGrid::build(base.with_garden_size(31, 10)).unwrap_err(),
            InvalidSpecError::GardenExceedsExtent {
                width: 31,
                height: 10,
                extent: 30
            }
        );
        assert!(matches!(
            TileGrid::build(base.with_garden_size(0, 4)),
            Err(InvalidSpecError::EmptyGarden { .. })
        ));
        assert!(matches!(
            TileGrid::build(GridSpec {
                tile_size: 0.0,
                ..base
            }),
            Err(InvalidSpecError::NonPositiveTileSize(_))
        ));
        assert!(matches!(
            TileGrid::build(GridSpec {
                grid_extent: 0,
                garden_width: 0,
                garden_height: 0,
                ..base
            }),
            Err(InvalidSpecError::EmptyExtent)
        ));
    }

    #[test]
    fn oversized_extent_is_rejected_before_allocating() {
        let spec = GridSpec {
            tile_size: 0.3,
            grid_extent: 50_000,
            garden_width: 9,
            garden_height: 10,
        };
        assert_eq!(
            spec.validate(),
            Err(InvalidSpecError::ExtentTooLarge {
                extent: 50_000,
                max: MAX_GRID_EXTENT
            })
        );
        assert!(TileGrid::build(spec).is_err());
        assert!(TileGrid::build(GridSpec {
            grid_extent: u32::MAX,
            ..spec
        })
        .is_err());

        let largest = GridSpec {
            grid_extent: MAX_GRID_EXTENT,
            ..spec
        };
        let grid = TileGrid::build(largest).unwrap();
        let corner = TileCoord::new(MAX_GRID_EXTENT as i32 - 1, MAX_GRID_EXTENT as i32 - 1);
        assert_eq!(grid.tile(corner).unwrap().coord, corner);
    }

    #[test]
    fn out_of_garden_tiles_cannot_be_selected() {
        let mut grid = TileGrid::build(GridSpec::default()).unwrap();
        let outside = TileCoord::new(0, 0);
        assert!(!grid.set_selected(outside, true));
        assert!(!grid.tile(outside).unwrap().selected);
        assert!(!grid.set_selected(TileCoord::new(-1, 3), true));
    }

    #[test]
    fn tile_centres_follow_world_mapping() {
        let grid = TileGrid::build(GridSpec::default()).unwrap();
        let first = grid.tile_center(TileCoord::new(0, 0));
        assert!((first.x - (-4.5 + 0.15)).abs() < 1e-5);
        assert!((first.z - (-4.5 + 0.15)).abs() < 1e-5);
        assert_eq!(first.y, 0.0);

        let fractional = grid.tile_to_world(0.5, 0.0);
        assert!((fractional.x - (first.x + 0.15)).abs() < 1e-5);
    }
}
