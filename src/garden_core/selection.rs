use serde::{Deserialize, Serialize};

use crate::garden_core::grid::{TileCoord, TileGrid};

pub const DEFAULT_CAPACITY: usize = 80;

/// Insertion-ordered set of selected tiles.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SelectionSet {
    tiles: Vec<TileCoord>,
}

impl SelectionSet {
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn contains(&self, coord: TileCoord) -> bool {
        self.tiles.contains(&coord)
    }

    pub fn as_slice(&self) -> &[TileCoord] {
        &self.tiles
    }

    pub fn iter(&self) -> impl Iterator<Item = &TileCoord> {
        self.tiles.iter()
    }

    fn insert(&mut self, coord: TileCoord) {
        if !self.contains(coord) {
            self.tiles.push(coord);
        }
    }

    fn remove(&mut self, coord: TileCoord) {
        self.tiles.retain(|c| *c != coord);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Selected,
    Deselected,
    /// The set is full; nothing changed.
    CapacityExceeded,
    /// Unknown or out-of-garden tile.
    Ignored,
}

impl ToggleOutcome {
    pub fn changed(self) -> bool {
        matches!(self, ToggleOutcome::Selected | ToggleOutcome::Deselected)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SelectionEvent {
    Changed { tiles: Vec<TileCoord> },
    CapacityExceeded { tile: TileCoord, capacity: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragState {
    Idle,
    Dragging { hovered: Option<TileCoord> },
}

/// Owns the tile grid and the selection, and turns pointer gestures into
/// toggles. Notifications queue up until `drain_events` is called.
#[derive(Debug)]
pub struct SelectionController {
    grid: TileGrid,
    selection: SelectionSet,
    capacity: usize,
    state: DragState,
    revision: u64,
    events: Vec<SelectionEvent>,
}

impl SelectionController {
    pub fn new(grid: TileGrid, capacity: usize) -> Self {
        let mut controller = Self {
            grid,
            selection: SelectionSet::default(),
            capacity,
            state: DragState::Idle,
            revision: 0,
            events: Vec::new(),
        };
        controller.sync_from_grid();
        controller
    }

    /// Swaps in a freshly built grid. The selection resets to the grid's
    /// pre-selected garden and any gesture in progress is abandoned.
    pub fn replace_grid(&mut self, grid: TileGrid) {
        self.grid = grid;
        self.state = DragState::Idle;
        self.sync_from_grid();
        self.revision += 1;
        self.events.push(SelectionEvent::Changed {
            tiles: self.selection.tiles.clone(),
        });
    }

    fn sync_from_grid(&mut self) {
        self.selection = SelectionSet::default();
        for tile in self.grid.selected_tiles() {
            self.selection.insert(tile.coord);
        }
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    /// Bumped on every change to the selection, including grid rebuilds.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn toggle(&mut self, coord: TileCoord) -> ToggleOutcome {
        let Some(&tile) = self.grid.tile(coord) else {
            return ToggleOutcome::Ignored;
        };
        if !tile.in_garden {
            return ToggleOutcome::Ignored;
        }

        let outcome = if tile.selected {
            self.grid.set_selected(coord, false);
            self.selection.remove(coord);
            ToggleOutcome::Deselected
        } else if self.selection.len() >= self.capacity {
            log::warn!(
                "selection full ({} tiles), rejected tile ({}, {})",
                self.capacity,
                coord.x,
                coord.z
            );
            self.events.push(SelectionEvent::CapacityExceeded {
                tile: coord,
                capacity: self.capacity,
            });
            return ToggleOutcome::CapacityExceeded;
        } else {
            self.grid.set_selected(coord, true);
            self.selection.insert(coord);
            ToggleOutcome::Selected
        };

        self.revision += 1;
        self.events.push(SelectionEvent::Changed {
            tiles: self.selection.tiles.clone(),
        });
        outcome
    }

    pub fn pointer_down(&mut self, picked: Option<TileCoord>) -> Option<ToggleOutcome> {
        self.state = DragState::Dragging { hovered: picked };
        picked.map(|coord| self.toggle(coord))
    }

    /// Toggles only while dragging, and only when the pointer enters a tile
    /// other than the one it was last over.
    pub fn pointer_move(&mut self, picked: Option<TileCoord>) -> Option<ToggleOutcome> {
        let DragState::Dragging { hovered } = self.state else {
            return None;
        };
        if picked == hovered {
            return None;
        }
        self.state = DragState::Dragging { hovered: picked };
        picked.map(|coord| self.toggle(coord))
    }

    pub fn pointer_up(&mut self) {
        self.state = DragState::Idle;
    }

    pub fn drain_events(&mut self) -> Vec<SelectionEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::{DragState, SelectionController, SelectionEvent, ToggleOutcome, DEFAULT_CAPACITY};
    use crate::garden_core::grid::{GridSpec, TileCoord, TileGrid};

    fn controller(width: u32, height: u32) -> SelectionController {
        let grid = TileGrid::build(GridSpec::default().with_garden_size(width, height)).unwrap();
        SelectionController::new(grid, DEFAULT_CAPACITY)
    }

    #[test]
    fn garden_starts_fully_selected() {
        let controller = controller(9, 10);
        assert_eq!(controller.selection().len(), 90);
        assert_eq!(controller.grid().selected_tiles().count(), 90);
    }

    #[test]
    fn double_toggle_restores_membership() {
        let mut controller = controller(6, 6);
        let coord = TileCoord::new(12, 14);
        assert_eq!(controller.toggle(coord), ToggleOutcome::Deselected);
        assert!(!controller.selection().contains(coord));
        assert_eq!(controller.toggle(coord), ToggleOutcome::Selected);
        assert!(controller.selection().contains(coord));
        assert!(controller.grid().tile(coord).unwrap().selected);
    }

    #[test]
    fn out_of_garden_toggle_is_ignored() {
        let mut controller = controller(9, 10);
        let before = controller.revision();
        assert_eq!(controller.toggle(TileCoord::new(0, 0)), ToggleOutcome::Ignored);
        assert_eq!(controller.toggle(TileCoord::new(99, 3)), ToggleOutcome::Ignored);
        assert_eq!(controller.revision(), before);
        assert!(controller.drain_events().is_empty());
    }

    #[test]
    fn oversized_initial_garden_only_allows_deselection() {
        let mut controller = controller(9, 10);
        let coord = TileCoord::new(12, 14);
        assert_eq!(controller.toggle(coord), ToggleOutcome::Deselected);
        assert_eq!(controller.toggle(coord), ToggleOutcome::CapacityExceeded);
        assert_eq!(controller.selection().len(), 89);
    }

    #[test]
    fn capacity_rejects_the_81st_tile() {
        let mut controller = controller(9, 9);
        let garden: Vec<_> = controller.grid().garden_tiles().map(|t| t.coord).collect();
        for coord in &garden {
            controller.toggle(*coord);
        }
        assert!(controller.selection().is_empty());

        for coord in &garden[..80] {
            assert_eq!(controller.toggle(*coord), ToggleOutcome::Selected);
        }
        controller.drain_events();

        let last = garden[80];
        assert_eq!(controller.toggle(last), ToggleOutcome::CapacityExceeded);
        assert_eq!(controller.selection().len(), 80);
        assert!(!controller.grid().tile(last).unwrap().selected);
        assert_eq!(
            controller.drain_events(),
            vec![SelectionEvent::CapacityExceeded {
                tile: last,
                capacity: 80
            }]
        );
    }

    #[test]
    fn every_change_emits_the_full_set() {
        let mut controller = controller(2, 2);
        let coord = controller.selection().as_slice()[0];
        controller.toggle(coord);
        let events = controller.drain_events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            SelectionEvent::Changed { tiles } => {
                assert_eq!(tiles.len(), 3);
                assert!(!tiles.contains(&coord));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn drag_toggles_once_per_tile_occupancy() {
        let mut controller = controller(6, 6);
        let a = TileCoord::new(12, 12);
        let b = TileCoord::new(13, 12);

        assert_eq!(controller.pointer_down(Some(a)), Some(ToggleOutcome::Deselected));
        assert_eq!(controller.pointer_move(Some(a)), None);
        assert_eq!(controller.pointer_move(Some(a)), None);
        assert_eq!(controller.pointer_move(Some(b)), Some(ToggleOutcome::Deselected));
        // leaving and re-entering toggles again
        assert_eq!(controller.pointer_move(Some(a)), Some(ToggleOutcome::Selected));
        assert_eq!(controller.pointer_move(None), None);
        assert_eq!(controller.pointer_move(Some(a)), Some(ToggleOutcome::Deselected));
        controller.pointer_up();
        assert_eq!(controller.state(), DragState::Idle);

        assert!(!controller.selection().contains(a));
        assert!(!controller.selection().contains(b));
    }

    #[test]
    fn moves_without_a_press_do_nothing() {
        let mut controller = controller(6, 6);
        assert_eq!(controller.pointer_move(Some(TileCoord::new(12, 12))), None);
        assert_eq!(controller.selection().len(), 36);
    }

    #[test]
    fn replacing_the_grid_resets_selection() {
        let mut controller = controller(9, 10);
        controller.toggle(TileCoord::new(12, 12));
        controller.pointer_down(None);
        let grid = TileGrid::build(GridSpec::default().with_garden_size(4, 5)).unwrap();
        controller.replace_grid(grid);
        assert_eq!(controller.selection().len(), 20);
        assert_eq!(controller.state(), DragState::Idle);
    }
}
