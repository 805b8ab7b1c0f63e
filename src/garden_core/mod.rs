pub mod camera_rig;
pub mod config;
pub mod grid;
pub mod layer;
pub mod picking;
pub mod placement;
pub mod selection;
pub mod species;
pub mod wind;
