use std::collections::HashSet;
use std::f32::consts::TAU;

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::garden_core::config::PlacementConfig;
use crate::garden_core::grid::{TileCoord, TileGrid};
use crate::garden_core::layer::Layer;
use crate::garden_core::selection::SelectionSet;
use crate::garden_core::species::{Species, SpeciesCatalog, SpeciesId};

pub const GROUND_COVER_LIFT: f32 = 0.001;

/// Static per-instance attributes, fixed for the lifetime of a generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedInstance {
    pub position: Vec3,
    pub scale: Vec3,
    pub rotation_y: f32,
    pub wind_phase: f32,
    pub wind_speed: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesPlacement {
    pub species: SpeciesId,
    pub instances: Vec<PlacedInstance>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Placement {
    pub seed: u64,
    pub species: Vec<SpeciesPlacement>,
    pub ground_cover: Vec<PlacedInstance>,
    /// Tiles under a plant, in the order they were first claimed.
    pub claimed: Vec<TileCoord>,
}

impl Placement {
    pub fn plant_count(&self) -> usize {
        self.species.iter().map(|s| s.instances.len()).sum()
    }

    pub fn ground_cover_count(&self) -> usize {
        self.ground_cover.len()
    }
}

pub struct PlacementInput<'a> {
    pub grid: &'a TileGrid,
    pub selection: &'a SelectionSet,
    pub catalog: &'a SpeciesCatalog,
    pub seed: u64,
}

pub struct PlacementLayer {
    config: PlacementConfig,
}

impl PlacementLayer {
    pub fn new(config: PlacementConfig) -> Self {
        Self { config }
    }

    fn clusters_for(&self, species: &Species, garden_area: u32) -> u32 {
        if !self.config.scale_clusters_with_area || self.config.area_per_cluster_step == 0 {
            return species.cluster_count;
        }
        garden_area.div_ceil(self.config.area_per_cluster_step).max(1) * species.cluster_count
    }

    fn patch_radius(&self, rng: &mut ChaCha8Rng) -> f32 {
        let min = self.config.patch_radius_min;
        let max = self.config.patch_radius_max.max(min);
        min + rng.random::<f32>() * (max - min)
    }
}

impl<'a> Layer<PlacementInput<'a>, Placement> for PlacementLayer {
    fn generate(&self, input: PlacementInput<'a>) -> Placement {
        let selected = input.selection.as_slice();
        if selected.is_empty() {
            return Placement {
                seed: input.seed,
                ..Placement::default()
            };
        }

        let grid = input.grid;
        let mut rng = ChaCha8Rng::seed_from_u64(input.seed);
        let mut claimed_set = HashSet::new();
        let mut claimed = Vec::new();
        let mut species_out = Vec::with_capacity(input.catalog.len());

        for (id, species) in input.catalog.iter() {
            let clusters = self.clusters_for(species, grid.spec().garden_area());
            let mut instances = Vec::new();

            for _ in 0..clusters {
                let center = selected[rng.random_range(0..selected.len())];
                let radius = self.patch_radius(&mut rng);
                let flowers = rng.random_range(species.min_flowers..=species.max_flowers);

                for _ in 0..flowers {
                    let offset = species.shape.sample_offset(radius, &mut rng);
                    let tx = center.x as f32 + offset.x;
                    let tz = center.z as f32 + offset.y;

                    let tile = TileCoord::new((tx + 0.5).floor() as i32, (tz + 0.5).floor() as i32);
                    if claimed_set.insert(tile) {
                        claimed.push(tile);
                    }

                    let horizontal = 0.7 + rng.random::<f32>() * 0.5;
                    let vertical = species.base_height * (1.0 + rng.random::<f32>() * 0.1 - 0.05);
                    instances.push(PlacedInstance {
                        position: grid.tile_to_world(tx, tz),
                        scale: Vec3::new(horizontal, vertical, horizontal),
                        rotation_y: rng.random::<f32>() * TAU,
                        wind_phase: rng.random::<f32>() * TAU,
                        wind_speed: 0.8 + rng.random::<f32>() * 0.4,
                    });
                }
            }

            species_out.push(SpeciesPlacement {
                species: id,
                instances,
            });
        }

        let open: Vec<TileCoord> = selected
            .iter()
            .filter(|coord| !claimed_set.contains(*coord))
            .copied()
            .collect();
        let ground_cover = self.ground_cover(grid, &open, &mut rng);

        Placement {
            seed: input.seed,
            species: species_out,
            ground_cover,
            claimed,
        }
    }
}

impl PlacementLayer {
    fn ground_cover(
        &self,
        grid: &TileGrid,
        open: &[TileCoord],
        rng: &mut ChaCha8Rng,
    ) -> Vec<PlacedInstance> {
        if open.is_empty() {
            return Vec::new();
        }

        let tile_size = grid.spec().tile_size;
        let jitter = tile_size * self.config.ground_cover_jitter;
        let scale_min = self.config.ground_cover_scale_min;
        let scale_max = self.config.ground_cover_scale_max.max(scale_min);

        (0..self.config.ground_cover_count)
            .map(|_| {
                let tile = open[rng.random_range(0..open.len())];
                let center = grid.tile_center(tile);
                let dx = (rng.random::<f32>() - 0.5) * jitter;
                let dz = (rng.random::<f32>() - 0.5) * jitter;
                let scale = scale_min + rng.random::<f32>() * (scale_max - scale_min);
                PlacedInstance {
                    position: center + Vec3::new(dx, GROUND_COVER_LIFT, dz),
                    scale: Vec3::splat(scale),
                    rotation_y: rng.random::<f32>() * TAU,
                    wind_phase: rng.random::<f32>() * TAU,
                    wind_speed: 0.8 + rng.random::<f32>() * 0.4,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{Placement, PlacementInput, PlacementLayer};
    use crate::garden_core::config::PlacementConfig;
    use crate::garden_core::grid::{GridSpec, TileGrid};
    use crate::garden_core::layer::Layer;
    use crate::garden_core::picking::tile_at;
    use crate::garden_core::selection::{SelectionController, DEFAULT_CAPACITY};
    use crate::garden_core::species::{SpeciesCatalog, SpeciesId};

    fn controller(width: u32, height: u32) -> SelectionController {
        let grid = TileGrid::build(GridSpec::default().with_garden_size(width, height)).unwrap();
        SelectionController::new(grid, DEFAULT_CAPACITY)
    }

    fn generate(
        layer: &PlacementLayer,
        controller: &SelectionController,
        catalog: &SpeciesCatalog,
        seed: u64,
    ) -> Placement {
        layer.generate(PlacementInput {
            grid: controller.grid(),
            selection: controller.selection(),
            catalog,
            seed,
        })
    }

    #[test]
    fn same_seed_same_garden() {
        let layer = PlacementLayer::new(PlacementConfig::default());
        let controller = controller(9, 10);
        let catalog = SpeciesCatalog::default();
        let a = generate(&layer, &controller, &catalog, 42);
        let b = generate(&layer, &controller, &catalog, 42);
        assert_eq!(a, b);
        assert!(a.plant_count() > 0);

        let c = generate(&layer, &controller, &catalog, 43);
        assert_ne!(a, c);
    }

    #[test]
    fn three_clusters_of_four_to_seven_flowers() {
        let layer = PlacementLayer::new(PlacementConfig::default());
        let controller = controller(9, 10);
        let nigra = SpeciesCatalog::default().get(SpeciesId(0)).unwrap().clone();
        assert_eq!((nigra.cluster_count, nigra.min_flowers, nigra.max_flowers), (3, 4, 7));
        let catalog = SpeciesCatalog::new(vec![nigra]).unwrap();

        for seed in 0..200 {
            let placement = generate(&layer, &controller, &catalog, seed);
            let count = placement.plant_count();
            assert!((12..=21).contains(&count), "seed {seed} gave {count}");
        }
    }

    #[test]
    fn empty_selection_places_nothing() {
        let layer = PlacementLayer::new(PlacementConfig::default());
        let mut controller = controller(3, 3);
        let garden: Vec<_> = controller.grid().garden_tiles().map(|t| t.coord).collect();
        for coord in garden {
            controller.toggle(coord);
        }
        assert!(controller.selection().is_empty());

        let placement = generate(&layer, &controller, &SpeciesCatalog::default(), 1);
        assert_eq!(placement.plant_count(), 0);
        assert_eq!(placement.ground_cover_count(), 0);
    }

    #[test]
    fn ground_cover_avoids_claimed_tiles() {
        let layer = PlacementLayer::new(PlacementConfig::default());
        let controller = controller(9, 10);
        let placement = generate(&layer, &controller, &SpeciesCatalog::default(), 5);
        assert_eq!(placement.ground_cover_count(), 2000);

        let grid = controller.grid();
        for instance in &placement.ground_cover {
            let tile = tile_at(grid, instance.position).unwrap();
            assert!(tile.selected, "ground cover on unselected {:?}", tile.coord);
            assert!(!placement.claimed.contains(&tile.coord));
            assert!((0.2..=0.4).contains(&instance.scale.x));
        }
    }

    #[test]
    fn fully_claimed_selection_has_no_ground_cover() {
        let layer = PlacementLayer::new(PlacementConfig::default());
        let controller = controller(1, 1);
        let placement = generate(&layer, &controller, &SpeciesCatalog::default(), 3);
        assert!(placement.plant_count() > 0);
        // every cluster centres on the only tile, so some of ~100 plants land on it
        assert!(placement.claimed.contains(&controller.selection().as_slice()[0]));
        assert_eq!(placement.ground_cover_count(), 0);
    }

    #[test]
    fn plant_attributes_stay_in_range() {
        let layer = PlacementLayer::new(PlacementConfig::default());
        let controller = controller(9, 10);
        let catalog = SpeciesCatalog::default();
        let placement = generate(&layer, &controller, &catalog, 77);
        for group in &placement.species {
            let base = catalog.get(group.species).unwrap().base_height;
            for instance in &group.instances {
                assert_eq!(instance.position.y, 0.0);
                assert!((0.7..=1.2).contains(&instance.scale.x));
                assert_eq!(instance.scale.x, instance.scale.z);
                assert!(instance.scale.y >= base * 0.95 - 1e-5);
                assert!(instance.scale.y <= base * 1.05 + 1e-5);
                assert!((0.0..=std::f32::consts::TAU).contains(&instance.rotation_y));
                assert!((0.8..=1.2).contains(&instance.wind_speed));
            }
        }
    }

    #[test]
    fn cluster_count_can_scale_with_area() {
        let config = PlacementConfig {
            scale_clusters_with_area: true,
            ..PlacementConfig::default()
        };
        let layer = PlacementLayer::new(config);
        let heracleum = SpeciesCatalog::default().get(SpeciesId(6)).unwrap().clone();
        assert_eq!(heracleum.cluster_count, 1);
        let catalog = SpeciesCatalog::new(vec![heracleum]).unwrap();

        // 90 tiles -> two clusters of 2..=3
        let controller = controller(9, 10);
        let count = generate(&layer, &controller, &catalog, 8).plant_count();
        assert!((4..=6).contains(&count), "got {count}");
    }
}
