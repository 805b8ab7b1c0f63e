use std::time::{Duration, Instant};

use crate::debug_api::{
    CommandAppliedEvent, CommandKind, GardenSnapshot, TelemetrySnapshot, VegetationSnapshot,
};
use crate::garden_core::grid::TileCoord;
use crate::garden_runtime::runtime::GardenIntent;

use super::AppState;

/// Maps a remote command onto the intent it queues and a human-readable note.
fn command_intent(command: &CommandKind) -> (GardenIntent, String) {
    match *command {
        CommandKind::ToggleTile { x, z } => (
            GardenIntent::ToggleTile(TileCoord::new(x, z)),
            format!("toggle queued for tile {x},{z}"),
        ),
        CommandKind::SetProgress { value } => (
            GardenIntent::SetProgress(value),
            format!("progress set to {:.2}", value.clamp(0.0, 1.0)),
        ),
        CommandKind::SetGardenSize { width, height } => (
            GardenIntent::SetGardenSize { width, height },
            format!("garden size {width}x{height} queued"),
        ),
        CommandKind::Regenerate { seed } => (
            GardenIntent::Regenerate { seed },
            match seed {
                Some(seed) => format!("regenerating with seed {seed}"),
                None => "regenerating with a fresh seed".to_string(),
            },
        ),
    }
}

impl AppState {
    pub(super) fn apply_debug_commands(&mut self) {
        let commands = self
            .debug_api
            .as_mut()
            .map(|api| api.drain_commands())
            .unwrap_or_default();

        for request in commands {
            let (intent, message) = command_intent(&request.command);
            self.runtime.push(intent);

            if let Some(api) = &self.debug_api {
                api.publish_command_applied(CommandAppliedEvent {
                    id: request.id,
                    frame: self.frame_index,
                    ok: true,
                    message,
                });
            }
        }
    }

    pub(super) fn publish_telemetry_if_due(&mut self) {
        let Some(api) = &self.debug_api else {
            return;
        };
        if self.last_telemetry_emit.elapsed() < Duration::from_millis(100) {
            return;
        }

        let stats = self.runtime.stats();
        api.publish_telemetry(TelemetrySnapshot {
            frame: self.frame_index,
            frame_time_ms: self.frame_time_ms,
            fps: 1000.0 / self.frame_time_ms.max(0.01),
            progress: stats.progress,
            garden: GardenSnapshot {
                width: stats.garden_width,
                height: stats.garden_height,
                selected: stats.selected,
                capacity: stats.capacity,
            },
            vegetation: VegetationSnapshot {
                generation: stats.generation,
                seed: stats.seed,
                plants: stats.plants,
                ground_cover: stats.ground_cover,
                batches: self.renderer.batch_count(),
                drawable_batches: self.renderer.drawable_batch_count(),
                pending_textures: self.assets.pending_count(),
            },
            timestamp_ms: now_timestamp_ms(),
        });
        self.last_telemetry_emit = Instant::now();
    }
}

fn now_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::command_intent;
    use crate::debug_api::CommandKind;
    use crate::garden_core::grid::TileCoord;
    use crate::garden_runtime::runtime::GardenIntent;

    #[test]
    fn commands_become_intents() {
        let (intent, _) = command_intent(&CommandKind::ToggleTile { x: 4, z: 9 });
        assert_eq!(intent, GardenIntent::ToggleTile(TileCoord::new(4, 9)));

        let (intent, message) = command_intent(&CommandKind::Regenerate { seed: Some(11) });
        assert_eq!(intent, GardenIntent::Regenerate { seed: Some(11) });
        assert!(message.contains("11"));

        let (intent, _) = command_intent(&CommandKind::SetGardenSize {
            width: 3,
            height: 4,
        });
        assert_eq!(intent, GardenIntent::SetGardenSize { width: 3, height: 4 });
    }
}
