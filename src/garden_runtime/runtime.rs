use std::collections::VecDeque;

use glam::Vec2;
use rand::Rng;

use crate::garden_core::camera_rig::{CameraRig, CameraView, ScrollTrack};
use crate::garden_core::config::GardenConfig;
use crate::garden_core::grid::{InvalidSpecError, TileCoord, TileGrid};
use crate::garden_core::layer::Layer;
use crate::garden_core::picking::{pick_pixel, Viewport};
use crate::garden_core::placement::{Placement, PlacementInput, PlacementLayer};
use crate::garden_core::selection::{SelectionController, SelectionEvent, ToggleOutcome};
use crate::garden_core::wind::InstanceAnimator;

/// Host input, queued and applied at the start of the next frame.
#[derive(Debug, Clone, PartialEq)]
pub enum GardenIntent {
    PointerDown { position: Vec2 },
    PointerMove { position: Vec2 },
    PointerUp,
    ToggleTile(TileCoord),
    Resize { width: u32, height: u32 },
    ScrollBy(f32),
    SetProgress(f32),
    SetGardenSize { width: u32, height: u32 },
    Regenerate { seed: Option<u64> },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GardenStats {
    pub garden_width: u32,
    pub garden_height: u32,
    pub selected: usize,
    pub capacity: usize,
    pub plants: usize,
    pub ground_cover: usize,
    pub generation: u64,
    pub seed: u64,
    pub progress: f32,
}

/// What changed while applying a frame's intents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameChanges {
    pub selection: bool,
    pub grid: bool,
    pub placement: bool,
}

pub type SelectionListener = Box<dyn FnMut(&SelectionEvent)>;

pub struct GardenRuntime {
    config: GardenConfig,
    controller: SelectionController,
    placement_layer: PlacementLayer,
    placement: Placement,
    placed_revision: Option<u64>,
    requested_seed: Option<Option<u64>>,
    generation: u64,
    rig: CameraRig,
    scroll: ScrollTrack,
    viewport: Viewport,
    animator: InstanceAnimator,
    /// Seconds since start. Kept in f64 so sway stays smooth on long runs.
    elapsed: f64,
    intents: VecDeque<GardenIntent>,
    events: Vec<SelectionEvent>,
    listeners: Vec<SelectionListener>,
    last_capacity_warning: Option<TileCoord>,
}

impl GardenRuntime {
    pub fn new(config: GardenConfig, width: u32, height: u32) -> Result<Self, InvalidSpecError> {
        let grid = TileGrid::build(config.grid)?;
        log::info!(
            "garden {}x{} in a {}x{} grid",
            config.grid.garden_width,
            config.grid.garden_height,
            config.grid.grid_extent,
            config.grid.grid_extent
        );
        Ok(Self {
            controller: SelectionController::new(grid, config.selection.capacity),
            placement_layer: PlacementLayer::new(config.placement.clone()),
            placement: Placement::default(),
            placed_revision: None,
            requested_seed: None,
            generation: 0,
            rig: CameraRig::new(config.camera.endpoints),
            scroll: ScrollTrack::new(config.scroll.range_px),
            viewport: Viewport::new(width as f32, height as f32),
            animator: InstanceAnimator::new(config.wind.max_sway_degrees),
            elapsed: 0.0,
            intents: VecDeque::new(),
            events: Vec::new(),
            listeners: Vec::new(),
            last_capacity_warning: None,
            config,
        })
    }

    pub fn push(&mut self, intent: GardenIntent) {
        self.intents.push_back(intent);
    }

    pub fn add_listener(&mut self, listener: SelectionListener) {
        self.listeners.push(listener);
    }

    /// Applies queued intents, regenerates the placement at most once if the
    /// selection or grid changed, then advances the wind clock.
    pub fn update(&mut self, dt_seconds: f32) -> FrameChanges {
        let mut changes = FrameChanges::default();
        while let Some(intent) = self.intents.pop_front() {
            self.apply(intent, &mut changes);
        }

        for event in self.controller.drain_events() {
            if let SelectionEvent::CapacityExceeded { tile, .. } = &event {
                self.last_capacity_warning = Some(*tile);
            }
            for listener in &mut self.listeners {
                listener(&event);
            }
            self.events.push(event);
        }

        let stale = self.placed_revision != Some(self.controller.revision());
        if stale || self.requested_seed.is_some() {
            let explicit = self.requested_seed.take().flatten();
            self.regenerate(explicit);
            changes.placement = true;
        }

        if dt_seconds.is_finite() && dt_seconds > 0.0 {
            self.elapsed += f64::from(dt_seconds);
        }
        changes
    }

    fn apply(&mut self, intent: GardenIntent, changes: &mut FrameChanges) {
        match intent {
            GardenIntent::PointerDown { position } => {
                let picked = self.pick(position);
                let outcome = self.controller.pointer_down(picked);
                changes.selection |= outcome.is_some_and(ToggleOutcome::changed);
            }
            GardenIntent::PointerMove { position } => {
                let picked = self.pick(position);
                let outcome = self.controller.pointer_move(picked);
                changes.selection |= outcome.is_some_and(ToggleOutcome::changed);
            }
            GardenIntent::PointerUp => self.controller.pointer_up(),
            GardenIntent::ToggleTile(coord) => {
                changes.selection |= self.controller.toggle(coord).changed();
            }
            GardenIntent::Resize { width, height } => {
                self.viewport = Viewport::new(width as f32, height as f32);
            }
            GardenIntent::ScrollBy(delta) => {
                let progress = self.scroll.scroll_by(delta);
                self.rig.set_progress(progress);
            }
            GardenIntent::SetProgress(progress) => {
                self.scroll.set_progress(progress);
                self.rig.set_progress(self.scroll.progress());
            }
            GardenIntent::SetGardenSize { width, height } => {
                if self.set_garden_size(width, height) {
                    changes.grid = true;
                    changes.selection = true;
                }
            }
            GardenIntent::Regenerate { seed } => {
                self.requested_seed = Some(seed);
            }
        }
    }

    fn pick(&self, position: Vec2) -> Option<TileCoord> {
        pick_pixel(position, self.viewport, &self.camera_view(), self.controller.grid())
            .map(|tile| tile.coord)
    }

    fn set_garden_size(&mut self, width: u32, height: u32) -> bool {
        let current = self.controller.grid().spec();
        if current.garden_width == width && current.garden_height == height {
            return false;
        }
        let spec = current.with_garden_size(width, height);
        match TileGrid::build(spec) {
            Ok(grid) => {
                log::info!("garden resized to {width}x{height}");
                self.config.grid = spec;
                self.controller.replace_grid(grid);
                true
            }
            Err(e) => {
                log::warn!("ignoring garden size {width}x{height}: {e}");
                false
            }
        }
    }

    fn regenerate(&mut self, explicit_seed: Option<u64>) {
        let seed = explicit_seed
            .or(self.config.placement.seed)
            .unwrap_or_else(|| rand::rng().random());
        self.placement = self.placement_layer.generate(PlacementInput {
            grid: self.controller.grid(),
            selection: self.controller.selection(),
            catalog: &self.config.species,
            seed,
        });
        self.placed_revision = Some(self.controller.revision());
        self.generation += 1;
        log::info!(
            "generation {}: {} plants, {} ground cover (seed {seed})",
            self.generation,
            self.placement.plant_count(),
            self.placement.ground_cover_count()
        );
    }

    pub fn drain_events(&mut self) -> Vec<SelectionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn config(&self) -> &GardenConfig {
        &self.config
    }

    pub fn controller(&self) -> &SelectionController {
        &self.controller
    }

    pub fn grid(&self) -> &TileGrid {
        self.controller.grid()
    }

    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn animator(&self) -> &InstanceAnimator {
        &self.animator
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn progress(&self) -> f32 {
        self.rig.progress()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn last_capacity_warning(&self) -> Option<TileCoord> {
        self.last_capacity_warning
    }

    pub fn camera_view(&self) -> CameraView {
        CameraView {
            pose: self.rig.pose(),
            lens: self.config.camera.lens,
            aspect: self.viewport.aspect(),
        }
    }

    /// Texture keys the current placement draws with.
    pub fn texture_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .placement
            .species
            .iter()
            .filter(|group| !group.instances.is_empty())
            .filter_map(|group| self.config.species.get(group.species))
            .map(|species| species.texture.clone())
            .collect();
        if !self.placement.ground_cover.is_empty() {
            keys.push(self.config.assets.ground_cover_texture.clone());
        }
        keys.sort();
        keys.dedup();
        keys
    }

    pub fn stats(&self) -> GardenStats {
        let spec = self.controller.grid().spec();
        GardenStats {
            garden_width: spec.garden_width,
            garden_height: spec.garden_height,
            selected: self.controller.selection().len(),
            capacity: self.controller.capacity(),
            plants: self.placement.plant_count(),
            ground_cover: self.placement.ground_cover_count(),
            generation: self.generation,
            seed: self.placement.seed,
            progress: self.rig.progress(),
        }
    }
}
