use crate::garden_core::grid::{GridSpec, TileCoord};
use crate::garden_runtime::runtime::{GardenIntent, GardenStats};

/// F1 side panel: garden size, selection budget, regeneration and scroll
/// progress.
pub struct GardenPanel {
    visible: bool,
    width: u32,
    height: u32,
    applied: (u32, u32),
    max_side: u32,
    progress: f32,
    seed_text: String,
    queued: Vec<GardenIntent>,
}

impl GardenPanel {
    pub fn new(spec: &GridSpec) -> Self {
        Self {
            visible: false,
            width: spec.garden_width,
            height: spec.garden_height,
            applied: (spec.garden_width, spec.garden_height),
            max_side: spec.grid_extent,
            progress: 0.0,
            seed_text: String::new(),
            queued: Vec::new(),
        }
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Follows size changes made elsewhere unless a slider edit is pending.
    pub fn sync(&mut self, stats: &GardenStats) {
        let current = (stats.garden_width, stats.garden_height);
        if (self.width, self.height) == self.applied && current != self.applied {
            self.width = current.0;
            self.height = current.1;
            self.applied = current;
        }
        self.progress = stats.progress;
    }

    /// Intents produced since the last call. Size edits wait for the pointer
    /// to be released so the garden is not rebuilt on every slider step.
    pub fn take_intents(&mut self, ctx: &egui::Context) -> Vec<GardenIntent> {
        let released = ctx.input(|i| i.pointer.any_released());
        self.collect(released)
    }

    fn collect(&mut self, released: bool) -> Vec<GardenIntent> {
        let mut intents = std::mem::take(&mut self.queued);
        if released && (self.width, self.height) != self.applied {
            self.applied = (self.width, self.height);
            intents.push(GardenIntent::SetGardenSize {
                width: self.width,
                height: self.height,
            });
        }
        intents
    }

    pub fn ui(
        &mut self,
        ctx: &egui::Context,
        stats: &GardenStats,
        capacity_warning: Option<TileCoord>,
        pending_textures: usize,
    ) {
        if !self.visible {
            return;
        }

        egui::SidePanel::left("garden_panel")
            .default_width(260.0)
            .frame(
                egui::Frame::side_top_panel(ctx.style().as_ref())
                    .fill(egui::Color32::from_rgba_unmultiplied(250, 250, 246, 235)),
            )
            .show(ctx, |ui| {
                ui.heading("Garden");
                ui.separator();

                ui.add(egui::Slider::new(&mut self.width, 1..=self.max_side).text("width"));
                ui.add(egui::Slider::new(&mut self.height, 1..=self.max_side).text("height"));

                ui.separator();
                ui.label(format!("selected {} / {}", stats.selected, stats.capacity));
                if let Some(tile) = capacity_warning {
                    ui.colored_label(
                        egui::Color32::from_rgb(180, 70, 40),
                        format!("limit reached at tile {},{}", tile.x, tile.z),
                    );
                }
                ui.label(format!(
                    "{} plants, {} ground cover",
                    stats.plants, stats.ground_cover
                ));
                ui.label(format!("generation {} (seed {})", stats.generation, stats.seed));
                if pending_textures > 0 {
                    ui.label(format!("loading {pending_textures} textures"));
                }

                ui.separator();
                ui.horizontal(|ui| {
                    ui.label("seed");
                    ui.text_edit_singleline(&mut self.seed_text);
                });
                if ui.button("Regenerate").clicked() {
                    let seed = self.seed_text.trim().parse::<u64>().ok();
                    self.queued.push(GardenIntent::Regenerate { seed });
                }

                ui.separator();
                let slider = ui.add(egui::Slider::new(&mut self.progress, 0.0..=1.0).text("view"));
                if slider.changed() {
                    self.queued.push(GardenIntent::SetProgress(self.progress));
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::GardenPanel;
    use crate::garden_core::grid::GridSpec;
    use crate::garden_runtime::runtime::{GardenIntent, GardenStats};

    fn stats(width: u32, height: u32) -> GardenStats {
        GardenStats {
            garden_width: width,
            garden_height: height,
            selected: 0,
            capacity: 80,
            plants: 0,
            ground_cover: 0,
            generation: 1,
            seed: 0,
            progress: 0.25,
        }
    }

    #[test]
    fn size_edits_wait_for_release() {
        let mut panel = GardenPanel::new(&GridSpec::default());
        panel.width = 5;
        assert!(panel.collect(false).is_empty());
        assert_eq!(
            panel.collect(true),
            vec![GardenIntent::SetGardenSize {
                width: 5,
                height: 10
            }]
        );
        assert!(panel.collect(true).is_empty());
    }

    #[test]
    fn sync_follows_external_resizes_only_when_idle() {
        let mut panel = GardenPanel::new(&GridSpec::default());
        panel.sync(&stats(4, 4));
        assert_eq!((panel.width, panel.height), (4, 4));
        assert_eq!(panel.progress, 0.25);

        panel.width = 7;
        panel.sync(&stats(3, 3));
        assert_eq!((panel.width, panel.height), (7, 4));
    }
}
