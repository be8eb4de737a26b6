//! The entity record shared by the store, registry, and gateway.

use serde::{Deserialize, Serialize};

/// Semantic state flags carried on every row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i64)]
pub enum EntityState {
    /// Unpersisted genesis default.
    Genesis = 0,
    /// Promoted from genesis via mint.
    Minted = 1,
    /// Appended via iterate.
    Iterated = 2,
}

impl EntityState {
    pub fn as_i64(self) -> i64 {
        self as i64
    }

    pub fn from_i64(v: i64) -> Option<Self> {
        match v {
            0 => Some(Self::Genesis),
            1 => Some(Self::Minted),
            2 => Some(Self::Iterated),
            _ => None,
        }
    }
}

/// The atomic versioned record. `index` is `None` only for an
/// unpersisted genesis entity that has not yet been minted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entity {
    pub index: Option<i64>,
    pub iter: i64,
    pub uuid: String,
    pub state: i64,
    pub name: String,
    pub description: String,
    pub position_x: i64,
    pub position_y: i64,
    pub position_z: i64,
    pub aesthetics: serde_json::Value,
    pub ownership: Option<String>,
    pub minted: bool,
    pub timestamp: i64,
    /// Transient field, never persisted: `false` for a synthesized genesis
    /// entity that has no row in the store yet.
    #[serde(default = "default_exists")]
    pub exists: bool,
}

fn default_exists() -> bool {
    true
}

impl Entity {
    /// The row key used by the LRU cache and write-queue coalescing:
    /// `"index:iter"`, or `"genesis:x:y:z"` when unminted.
    pub fn cache_key(&self) -> String {
        match self.index {
            Some(index) => format!("{index}:{iter}", iter = self.iter),
            None => format!(
                "genesis:{x}:{y}:{z}",
                x = self.position_x,
                y = self.position_y,
                z = self.position_z
            ),
        }
    }
}
