use serde::{Deserialize, Serialize};

use crate::garden_core::grid::TileCoord;

pub const API_VERSION: &str = "v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub api_version: String,
    pub debug_api_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiStateResponse {
    pub api_version: String,
    pub telemetry: Option<TelemetrySnapshot>,
}

/// The current `SelectionSet` as the server last heard it, plus the most
/// recent tile rejected at the cap.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionSnapshot {
    pub tiles: Vec<TileCoord>,
    pub capacity: usize,
    pub last_rejected: Option<TileCoord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSelectionResponse {
    pub api_version: String,
    pub selection: SelectionSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GardenSnapshot {
    pub width: u32,
    pub height: u32,
    pub selected: usize,
    pub capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VegetationSnapshot {
    pub generation: u64,
    pub seed: u64,
    pub plants: usize,
    pub ground_cover: usize,
    pub batches: usize,
    pub drawable_batches: usize,
    pub pending_textures: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub frame: u64,
    pub frame_time_ms: f32,
    pub fps: f32,
    pub progress: f32,
    pub garden: GardenSnapshot,
    pub vegetation: VegetationSnapshot,
    pub timestamp_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRequest {
    pub id: String,
    #[serde(flatten)]
    pub command: CommandKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandKind {
    ToggleTile { x: i32, z: i32 },
    SetProgress { value: f32 },
    SetGardenSize { width: u32, height: u32 },
    Regenerate {
        #[serde(default)]
        seed: Option<u64>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandAcceptedResponse {
    pub api_version: String,
    pub id: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub api_version: String,
    pub error: String,
    pub message: String,
}

/// Commands are queued as intents, so `ok` means accepted for the next frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandAppliedEvent {
    pub id: String,
    pub frame: u64,
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    Telemetry(TelemetrySnapshot),
    CommandApplied(CommandAppliedEvent),
    SelectionChanged { tiles: Vec<TileCoord> },
    CapacityExceeded { tile: TileCoord, capacity: usize },
}

#[cfg(test)]
mod tests {
    use super::{CommandKind, CommandRequest, ServerEvent};
    use crate::garden_core::grid::TileCoord;

    #[test]
    fn commands_parse_from_flat_json() {
        let request: CommandRequest =
            serde_json::from_str(r#"{"id":"a","type":"toggle_tile","x":12,"z":14}"#).unwrap();
        assert_eq!(request.id, "a");
        assert_eq!(request.command, CommandKind::ToggleTile { x: 12, z: 14 });

        let request: CommandRequest =
            serde_json::from_str(r#"{"id":"b","type":"regenerate"}"#).unwrap();
        assert_eq!(request.command, CommandKind::Regenerate { seed: None });
    }

    #[test]
    fn selection_events_carry_their_payload() {
        let event = ServerEvent::CapacityExceeded {
            tile: TileCoord::new(3, 4),
            capacity: 80,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "capacity_exceeded");
        assert_eq!(json["payload"]["capacity"], 80);
        assert_eq!(json["payload"]["tile"]["x"], 3);
    }
}
