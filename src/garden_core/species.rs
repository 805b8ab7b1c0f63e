use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scatter distribution used when placing one cluster of a species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchShape {
    Round,
    Patch,
    Oval,
    Stripe,
    Polygon,
    /// Unknown shape names fall back to a uniform square.
    #[serde(other)]
    Scatter,
}

impl PatchShape {
    /// Offset from the cluster centre, in tile units.
    pub fn sample_offset<R: Rng + ?Sized>(self, radius: f32, rng: &mut R) -> Vec2 {
        match self {
            PatchShape::Round => {
                let angle = rng.random::<f32>() * TAU;
                let r = rng.random::<f32>() * radius * 0.5;
                Vec2::new(angle.cos() * r, angle.sin() * r)
            }
            PatchShape::Patch => {
                let angle = rng.random::<f32>() * TAU;
                let r = rng.random::<f32>() * radius;
                Vec2::new(angle.cos() * r * 1.5, angle.sin() * r * 0.8)
            }
            PatchShape::Oval => {
                let angle = rng.random::<f32>() * TAU;
                let r = rng.random::<f32>() * radius;
                Vec2::new(angle.cos() * r * 1.1, angle.sin() * r * 0.6)
            }
            PatchShape::Stripe => Vec2::new(
                (rng.random::<f32>() - 0.5) * radius * 2.2,
                (rng.random::<f32>() - 0.5) * radius * 0.4,
            ),
            PatchShape::Polygon => Vec2::new(
                (rng.random::<f32>() - 0.5) * radius * 2.5 * rng.random::<f32>(),
                (rng.random::<f32>() - 0.5) * radius * 2.5 * rng.random::<f32>(),
            ),
            PatchShape::Scatter => Vec2::new(
                (rng.random::<f32>() - 0.5) * radius * 2.0,
                (rng.random::<f32>() - 0.5) * radius * 2.0,
            ),
        }
    }

    /// Largest possible |dx|, |dz| for a given radius.
    pub fn max_extent(self, radius: f32) -> Vec2 {
        match self {
            PatchShape::Round => Vec2::splat(radius * 0.5),
            PatchShape::Patch => Vec2::new(radius * 1.5, radius * 0.8),
            PatchShape::Oval => Vec2::new(radius * 1.1, radius * 0.6),
            PatchShape::Stripe => Vec2::new(radius * 1.1, radius * 0.2),
            PatchShape::Polygon => Vec2::splat(radius * 1.25),
            PatchShape::Scatter => Vec2::splat(radius),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Species {
    pub name: String,
    /// Path of the sprite, relative to the assets root.
    pub texture: String,
    pub shape: PatchShape,
    pub cluster_count: u32,
    pub min_flowers: u32,
    pub max_flowers: u32,
    pub base_height: f32,
}

/// Index into the catalog the species was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpeciesId(pub u16);

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error("species catalog is empty")]
    Empty,
    #[error("species catalog holds {0} entries, more than an id can address")]
    TooLarge(usize),
    #[error("species `{name}`: {reason}")]
    InvalidSpecies { name: String, reason: &'static str },
}

impl Species {
    pub fn validate(&self) -> Result<(), CatalogError> {
        let fail = |reason| {
            Err(CatalogError::InvalidSpecies {
                name: self.name.clone(),
                reason,
            })
        };
        if self.name.trim().is_empty() {
            return fail("name is empty");
        }
        if self.texture.trim().is_empty() {
            return fail("texture is empty");
        }
        if self.cluster_count == 0 {
            return fail("cluster_count must be at least 1");
        }
        if self.min_flowers == 0 || self.min_flowers > self.max_flowers {
            return fail("flower range must satisfy 0 < min <= max");
        }
        if !(self.base_height.is_finite() && self.base_height > 0.0) {
            return fail("base_height must be positive");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeciesCatalog {
    species: Vec<Species>,
}

impl Default for SpeciesCatalog {
    fn default() -> Self {
        Self {
            species: meadow_mix(),
        }
    }
}

impl SpeciesCatalog {
    pub fn new(species: Vec<Species>) -> Result<Self, CatalogError> {
        let catalog = Self { species };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.species.is_empty() {
            return Err(CatalogError::Empty);
        }
        if self.species.len() > u16::MAX as usize {
            return Err(CatalogError::TooLarge(self.species.len()));
        }
        self.species.iter().try_for_each(Species::validate)
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    pub fn get(&self, id: SpeciesId) -> Option<&Species> {
        self.species.get(id.0 as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SpeciesId, &Species)> {
        self.species
            .iter()
            .enumerate()
            .map(|(i, s)| (SpeciesId(i as u16), s))
    }
}

fn meadow_mix() -> Vec<Species> {
    let entry = |name: &str, file: &str, shape, cluster_count, flowers: (u32, u32), base_height| {
        Species {
            name: name.to_string(),
            texture: format!("21/{file}.png"),
            shape,
            cluster_count,
            min_flowers: flowers.0,
            max_flowers: flowers.1,
            base_height,
        }
    };
    vec![
        entry("Centaurea nigra", "Centaurea_nigra", PatchShape::Round, 3, (4, 7), 0.8),
        entry("Armeria maritima", "Armeria_maritima", PatchShape::Patch, 3, (6, 15), 0.5),
        entry("Borago officinalis", "Borago_officinalis", PatchShape::Oval, 2, (5, 8), 1.0),
        entry("Calluna vulgaris", "Calluna_vulgaris", PatchShape::Stripe, 2, (8, 16), 0.6),
        entry("Centaurea scabiosa", "Centaurea_scabiosa", PatchShape::Patch, 2, (7, 14), 0.9),
        entry("Centaurea cyanus", "Centaurea_cyanus", PatchShape::Stripe, 2, (7, 14), 0.7),
        entry(
            "Heracleum sphondylium",
            "Heracleum_sphondylium",
            PatchShape::Polygon,
            1,
            (2, 3),
            1.2,
        ),
        entry("Origanum vulgare", "Origanum_vulgare", PatchShape::Round, 3, (4, 8), 0.7),
        entry("Trifolium repens", "Trifolium_repens", PatchShape::Patch, 3, (8, 14), 0.3),
        entry(
            "Phacelia tanacetifolia",
            "phacelia_tanacetifolia",
            PatchShape::Polygon,
            2,
            (5, 9),
            1.1,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::{CatalogError, PatchShape, Species, SpeciesCatalog, SpeciesId};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const SHAPES: [PatchShape; 6] = [
        PatchShape::Round,
        PatchShape::Patch,
        PatchShape::Oval,
        PatchShape::Stripe,
        PatchShape::Polygon,
        PatchShape::Scatter,
    ];

    #[test]
    fn default_catalog_is_valid() {
        let catalog = SpeciesCatalog::default();
        assert_eq!(catalog.len(), 10);
        catalog.validate().unwrap();
        let first = catalog.get(SpeciesId(0)).unwrap();
        assert_eq!(first.name, "Centaurea nigra");
        assert_eq!(first.texture, "21/Centaurea_nigra.png");
        assert!(catalog.get(SpeciesId(10)).is_none());
    }

    #[test]
    fn offsets_stay_within_shape_extent() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for shape in SHAPES {
            let extent = shape.max_extent(1.9);
            for _ in 0..500 {
                let offset = shape.sample_offset(1.9, &mut rng);
                assert!(offset.x.abs() <= extent.x + 1e-5, "{shape:?} {offset:?}");
                assert!(offset.y.abs() <= extent.y + 1e-5, "{shape:?} {offset:?}");
            }
        }
    }

    #[test]
    fn round_patches_are_tighter_than_scatter() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mean = |shape: PatchShape, rng: &mut ChaCha8Rng| {
            (0..2000)
                .map(|_| shape.sample_offset(1.5, rng).length())
                .sum::<f32>()
                / 2000.0
        };
        let round = mean(PatchShape::Round, &mut rng);
        let scatter = mean(PatchShape::Scatter, &mut rng);
        assert!(round < scatter, "round {round} scatter {scatter}");
    }

    #[test]
    fn unknown_shape_names_fall_back_to_scatter() {
        let shape: PatchShape = serde_json::from_str("\"hexagon\"").unwrap();
        assert_eq!(shape, PatchShape::Scatter);
        let shape: PatchShape = serde_json::from_str("\"stripe\"").unwrap();
        assert_eq!(shape, PatchShape::Stripe);
    }

    #[test]
    fn rejects_invalid_entries() {
        let good = SpeciesCatalog::default().get(SpeciesId(0)).unwrap().clone();
        let broken = Species {
            min_flowers: 9,
            max_flowers: 3,
            ..good.clone()
        };
        assert!(matches!(
            SpeciesCatalog::new(vec![good.clone(), broken]),
            Err(CatalogError::InvalidSpecies { .. })
        ));
        assert!(matches!(
            SpeciesCatalog::new(vec![Species {
                cluster_count: 0,
                ..good
            }]),
            Err(CatalogError::InvalidSpecies { .. })
        ));
        assert_eq!(SpeciesCatalog::new(Vec::new()), Err(CatalogError::Empty));
    }
}
