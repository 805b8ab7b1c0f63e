use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::garden_core::camera_rig::{CameraEndpoints, Lens};
use crate::garden_core::grid::{GridSpec, InvalidSpecError};
use crate::garden_core::selection::DEFAULT_CAPACITY;
use crate::garden_core::species::{CatalogError, SpeciesCatalog};

pub const CONFIG_FILE: &str = "garden.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GardenConfig {
    pub grid: GridSpec,
    pub selection: SelectionConfig,
    pub placement: PlacementConfig,
    pub wind: WindConfig,
    pub camera: CameraConfig,
    pub scroll: ScrollConfig,
    pub assets: AssetsConfig,
    pub species: SpeciesCatalog,
}

impl Default for GardenConfig {
    fn default() -> Self {
        Self {
            grid: GridSpec::default(),
            selection: SelectionConfig::default(),
            placement: PlacementConfig::default(),
            wind: WindConfig::default(),
            camera: CameraConfig::default(),
            scroll: ScrollConfig::default(),
            assets: AssetsConfig::default(),
            species: SpeciesCatalog::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("grid: {0}")]
    Grid(#[from] InvalidSpecError),
    #[error("species: {0}")]
    Catalog(#[from] CatalogError),
    #[error("selection capacity must be at least 1")]
    ZeroCapacity,
    #[error("placement: {0}")]
    Placement(&'static str),
    #[error("camera: {0}")]
    Camera(&'static str),
    #[error("wind: {0}")]
    Wind(&'static str),
    #[error("scroll: {0}")]
    Scroll(&'static str),
}

impl GardenConfig {
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        let path = std::path::Path::new(CONFIG_FILE);
        if !path.exists() {
            log::info!("no {CONFIG_FILE} found, using defaults");
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("loaded {CONFIG_FILE}");
                    config
                }
                Err(e) => {
                    log::warn!("failed to parse {CONFIG_FILE}: {e}, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("failed to read {CONFIG_FILE}: {e}, using defaults");
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grid.validate()?;
        self.species.validate()?;
        if self.selection.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        self.placement.validate()?;
        self.wind.validate()?;
        self.camera.validate()?;
        self.scroll.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub capacity: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Fixed seed for every generation; a fresh one is drawn when unset.
    pub seed: Option<u64>,
    pub patch_radius_min: f32,
    pub patch_radius_max: f32,
    pub ground_cover_count: u32,
    /// Sub-tile jitter as a fraction of the tile size.
    pub ground_cover_jitter: f32,
    pub ground_cover_scale_min: f32,
    pub ground_cover_scale_max: f32,
    pub scale_clusters_with_area: bool,
    pub area_per_cluster_step: u32,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            seed: None,
            patch_radius_min: 0.7,
            patch_radius_max: 1.9,
            ground_cover_count: 2000,
            ground_cover_jitter: 0.8,
            ground_cover_scale_min: 0.2,
            ground_cover_scale_max: 0.4,
            scale_clusters_with_area: false,
            area_per_cluster_step: 50,
        }
    }
}

impl PlacementConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.patch_radius_min >= 0.0 && self.patch_radius_min <= self.patch_radius_max) {
            return Err(ConfigError::Placement("patch radius range is empty or negative"));
        }
        if !(self.ground_cover_scale_min > 0.0
            && self.ground_cover_scale_min <= self.ground_cover_scale_max)
        {
            return Err(ConfigError::Placement("ground cover scale range is empty"));
        }
        if !(0.0..=1.0).contains(&self.ground_cover_jitter) {
            return Err(ConfigError::Placement("ground cover jitter must be within [0, 1]"));
        }
        if self.scale_clusters_with_area && self.area_per_cluster_step == 0 {
            return Err(ConfigError::Placement("area_per_cluster_step must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindConfig {
    pub max_sway_degrees: f32,
}

impl WindConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_sway_degrees.is_finite() && (0.0..=90.0).contains(&self.max_sway_degrees)) {
            return Err(ConfigError::Wind("max_sway_degrees must be within [0, 90]"));
        }
        Ok(())
    }
}

impl Default for WindConfig {
    fn default() -> Self {
        Self {
            max_sway_degrees: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CameraConfig {
    pub endpoints: CameraEndpoints,
    pub lens: Lens,
}

impl CameraConfig {
    /// A lens or pose that degenerates the projection would make every pick
    /// miss, so it is rejected up front.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let lens = &self.lens;
        if !(lens.fov_y_degrees.is_finite() && lens.fov_y_degrees > 0.0 && lens.fov_y_degrees < 180.0)
        {
            return Err(ConfigError::Camera("fov_y_degrees must be within (0, 180)"));
        }
        if !(lens.near.is_finite() && lens.near > 0.0) {
            return Err(ConfigError::Camera("near plane must be positive"));
        }
        if !(lens.far.is_finite() && lens.far > lens.near) {
            return Err(ConfigError::Camera("far plane must lie beyond the near plane"));
        }
        for pose in [&self.endpoints.start, &self.endpoints.end] {
            let (position, target) = (pose.position(), pose.look_target());
            if !(position.is_finite() && target.is_finite()) {
                return Err(ConfigError::Camera("camera endpoints must be finite"));
            }
            if position.distance_squared(target) <= f32::EPSILON {
                return Err(ConfigError::Camera("camera position coincides with its look target"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    /// Scroll distance in pixels that takes progress from 0 to 1.
    pub range_px: f32,
    pub line_height_px: f32,
}

impl ScrollConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.range_px.is_finite() && self.range_px > 0.0) {
            return Err(ConfigError::Scroll("range_px must be positive"));
        }
        if !(self.line_height_px.is_finite() && self.line_height_px > 0.0) {
            return Err(ConfigError::Scroll("line_height_px must be positive"));
        }
        Ok(())
    }
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            range_px: 2400.0,
            line_height_px: 40.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    pub root: String,
    pub ground_cover_texture: String,
    pub watch: bool,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            root: "assets".to_string(),
            ground_cover_texture: "20/Poa_pratensis.png".to_string(),
            watch: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, GardenConfig};

    #[test]
    fn defaults_are_valid() {
        let config = GardenConfig::default();
        config.validate().unwrap();
        assert_eq!(config.grid.garden_area(), 90);
        assert_eq!(config.selection.capacity, 80);
        assert_eq!(config.placement.ground_cover_count, 2000);
        assert_eq!(config.species.len(), 10);
    }

    #[test]
    fn partial_files_fill_in_defaults() {
        let json = r#"{ "grid": { "garden_width": 4 }, "placement": { "seed": 9 } }"#;
        let config: GardenConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.grid.garden_width, 4);
        assert_eq!(config.grid.garden_height, 10);
        assert_eq!(config.placement.seed, Some(9));
        assert_eq!(config.placement.patch_radius_max, 1.9);
        assert_eq!(config.species.len(), 10);
    }

    #[test]
    fn serializes_back_to_an_equal_config() {
        let config = GardenConfig::default();
        let text = serde_json::to_string_pretty(&config).unwrap();
        let parsed: GardenConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn validation_reports_the_failing_section() {
        let mut config = GardenConfig::default();
        config.grid.garden_width = 40;
        assert!(matches!(config.validate(), Err(ConfigError::Grid(_))));

        let mut config = GardenConfig::default();
        config.selection.capacity = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroCapacity)));

        let mut config = GardenConfig::default();
        config.placement.patch_radius_min = 3.0;
        assert!(matches!(config.validate(), Err(ConfigError::Placement(_))));
    }

    #[test]
    fn degenerate_camera_wind_and_scroll_are_rejected() {
        let mut config = GardenConfig::default();
        config.camera.lens.near = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Camera(_))));

        let mut config = GardenConfig::default();
        config.camera.lens.fov_y_degrees = f32::NAN;
        assert!(matches!(config.validate(), Err(ConfigError::Camera(_))));

        let mut config = GardenConfig::default();
        config.camera.lens.far = config.camera.lens.near;
        assert!(matches!(config.validate(), Err(ConfigError::Camera(_))));

        let mut config = GardenConfig::default();
        config.camera.endpoints.end.look_target = config.camera.endpoints.end.position;
        assert!(matches!(config.validate(), Err(ConfigError::Camera(_))));

        let mut config = GardenConfig::default();
        config.wind.max_sway_degrees = -1.0;
        assert!(matches!(config.validate(), Err(ConfigError::Wind(_))));

        let mut config = GardenConfig::default();
        config.scroll.range_px = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Scroll(_))));

        let json = r#"{ "camera": { "lens": { "near": -2.0 } } }"#;
        let config: GardenConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }
}
