mod garden_panel;

pub use garden_panel::GardenPanel;
