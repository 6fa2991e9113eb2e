// ABOUTME: Per-room conversation state and model selection.
// ABOUTME: Each room's turns sit behind their own async mutex so rooms never contend.

use aibot_agent::Turn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

/// Which configured model a room talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelVersion {
    #[default]
    Fast,
    Advanced,
}

impl ModelVersion {
    /// Command name (without `!`) that selects this version
    pub fn command(&self) -> &'static str {
        match self {
            ModelVersion::Fast => "gpt3.5",
            ModelVersion::Advanced => "gpt4",
        }
    }

    pub fn from_command(name: &str) -> Option<Self> {
        match name {
            "gpt3.5" => Some(ModelVersion::Fast),
            "gpt4" => Some(ModelVersion::Advanced),
            _ => None,
        }
    }

    /// The version to offer as an undo
    pub fn other(&self) -> Self {
        match self {
            ModelVersion::Fast => ModelVersion::Advanced,
            ModelVersion::Advanced => ModelVersion::Fast,
        }
    }
}

/// A room's turn sequence. Hold the lock across a backend call to
/// serialize exchanges within the room.
pub type RoomTurns = Arc<tokio::sync::Mutex<Vec<Turn>>>;

/// Conversation state for every room the bot has talked in
#[derive(Debug, Default)]
pub struct ConversationStore {
    rooms: Mutex<HashMap<String, RoomTurns>>,
    versions: RwLock<HashMap<String, ModelVersion>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The room's turn sequence, created empty on first use
    pub fn room(&self, room_id: &str) -> RoomTurns {
        let mut rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(rooms.entry(room_id.to_string()).or_default())
    }

    /// Snapshot of a room's turns (empty if the room has none)
    pub async fn turns(&self, room_id: &str) -> Vec<Turn> {
        let room = {
            let rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
            rooms.get(room_id).cloned()
        };
        match room {
            Some(turns) => turns.lock().await.clone(),
            None => Vec::new(),
        }
    }

    /// Discard every turn of a room. Waits for any in-flight exchange.
    pub async fn clear(&self, room_id: &str) {
        let room = self.room(room_id);
        room.lock().await.clear();
    }

    /// The room's model version, `Fast` when never set
    pub fn model_version(&self, room_id: &str) -> ModelVersion {
        self.versions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(room_id)
            .copied()
            .unwrap_or_default()
    }

    /// Set the room's model version, returning the previous one
    pub fn set_model_version(&self, room_id: &str, version: ModelVersion) -> ModelVersion {
        self.versions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(room_id.to_string(), version)
            .unwrap_or_default()
    }
}
