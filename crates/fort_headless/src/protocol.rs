//! JSON-lines protocol for the headless build processor.
//!
//! # Protocol Overview
//!
//! **Input (stdin):** One command per line
//! **Output (stdout):** One response per line
//!
//! Every command is answered by exactly one response, in order. Placement
//! failures come back as `error` responses whose `code` is the stable
//! placement error code (`overlap`, `unsupported`, ...), so callers can
//! branch on it without parsing messages.
//!
//! # Example Session
//!
//! ```text
//! -> {"type":"ready","version":"1.0","structures":0}
//! <- {"cmd":"place","kind":"floor","x":0,"z":0,"level":0}
//! -> {"type":"placed","structure":{"id":1,...}}
//! <- {"cmd":"place","kind":"wall","x":0,"z":0,"level":0,"rotation":90,"material":"stone"}
//! -> {"type":"placed","structure":{"id":2,...}}
//! <- {"cmd":"remove","id":1}
//! -> {"type":"removed","destroyed":[1,2],"collapsed":1}
//! <- {"cmd":"quit"}
//! -> {"type":"bye"}
//! ```

use serde::{Deserialize, Serialize};

use fort_core::prelude::*;

/// Protocol version reported in the `ready` response.
pub const PROTOCOL_VERSION: &str = "1.0";

// ============================================================================
// Commands (stdin)
// ============================================================================

/// Commands accepted on stdin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Check a placement without committing it.
    Validate {
        /// The placement to check.
        #[serde(flatten)]
        request: PlacementRequest,
    },

    /// Commit a placement.
    Place {
        /// The placement to commit.
        #[serde(flatten)]
        request: PlacementRequest,
    },

    /// Snap a continuous cursor position and report what placing there would do.
    Preview {
        /// Structure kind name.
        kind: String,
        /// World X.
        x: f64,
        /// World Y.
        y: f64,
        /// World Z.
        z: f64,
        /// Cursor yaw in degrees.
        #[serde(default)]
        yaw: f64,
    },

    /// Remove a structure and cascade.
    Remove {
        /// Structure id.
        id: u64,
    },

    /// Exact slot lookup.
    Get {
        /// Structure kind name.
        kind: String,
        /// Tile X.
        x: i32,
        /// Tile Z.
        z: i32,
        /// Level.
        level: i32,
        /// Rotation in degrees; required for walls.
        #[serde(default)]
        rotation: Option<i32>,
    },

    /// List structures within a tile radius, on every level.
    QueryArea {
        /// Center tile X.
        x: i32,
        /// Center tile Z.
        z: i32,
        /// Radius in tiles.
        radius: u32,
    },

    /// Set hit points on a structure. Never destroys it.
    SetHealth {
        /// Structure id.
        id: u64,
        /// New hit points, clamped to max.
        hp: u32,
    },

    /// Set the logical clock stamped onto later placements.
    SetClock {
        /// New clock value.
        clock: u64,
    },

    /// Request the world state hash.
    Hash,

    /// Run the full invariant checker.
    Check,

    /// Write a snapshot to disk.
    Save {
        /// Destination file.
        path: String,
    },

    /// Replace the world with a snapshot from disk.
    Load {
        /// Source file.
        path: String,
    },

    /// End the session.
    Quit,
}

// ============================================================================
// Responses (stdout)
// ============================================================================

/// Responses written to stdout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Session started or world replaced.
    Ready {
        /// Protocol version.
        version: String,
        /// Live structure count.
        structures: usize,
    },

    /// Command completed with nothing else to report.
    Ack {
        /// Command name.
        cmd: String,
    },

    /// Command failed.
    Error {
        /// Stable machine-readable code.
        code: String,
        /// Human-readable message.
        message: String,
        /// Command that failed, if it could be parsed.
        #[serde(skip_serializing_if = "Option::is_none", default)]
        cmd: Option<String>,
    },

    /// Result of `validate`.
    Validation {
        /// Whether the placement would succeed.
        valid: bool,
        /// Error code when invalid.
        #[serde(skip_serializing_if = "Option::is_none", default)]
        code: Option<String>,
    },

    /// A structure was placed.
    Placed {
        /// The new record.
        structure: StructureRecord,
    },

    /// Result of `preview`.
    Preview {
        /// Snapped placement.
        placement: Placement,
        /// Snapped world position as `[x, y, z]`.
        position: [f64; 3],
        /// Whether placing there would succeed.
        valid: bool,
        /// Error code when invalid.
        #[serde(skip_serializing_if = "Option::is_none", default)]
        code: Option<String>,
    },

    /// Result of `remove`.
    Removed {
        /// Destroyed ids, the target first and then in collapse order.
        destroyed: Vec<StructureId>,
        /// How many of them collapsed rather than being removed directly.
        collapsed: usize,
    },

    /// Result of `get`.
    Structure {
        /// The occupant, if any.
        structure: Option<StructureRecord>,
    },

    /// Result of `query_area`.
    Structures {
        /// Matching records sorted by id.
        structures: Vec<StructureRecord>,
    },

    /// Result of `set_health`.
    Health {
        /// Structure id.
        id: StructureId,
        /// Hit points after clamping.
        hp: u32,
    },

    /// Result of `hash`.
    StateHash {
        /// Deterministic world hash.
        hash: u64,
        /// Logical clock.
        clock: u64,
        /// Live structure count.
        structures: usize,
    },

    /// Result of `check`.
    Check {
        /// Whether every invariant holds.
        ok: bool,
        /// First violation found.
        #[serde(skip_serializing_if = "Option::is_none", default)]
        violation: Option<String>,
    },

    /// Session ending.
    Bye,
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response.
    pub fn ready(structures: usize) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            structures,
        }
    }

    /// Create an acknowledgment.
    pub fn ack(cmd: &str) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
        }
    }

    /// Create an error response.
    pub fn error(code: &str, message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Error response for a rejected placement, keyed by its code.
    pub fn placement_error(err: &PlacementError, cmd: &str) -> Self {
        Self::error(err.code(), err.to_string(), Some(cmd))
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"type":"error","code":"internal","message":"Serialization failed: {}"}}"#,
                e
            )
        });
        json.push('\n');
        json
    }
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Get command name for acknowledgment.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Validate { .. } => "validate",
            Self::Place { .. } => "place",
            Self::Preview { .. } => "preview",
            Self::Remove { .. } => "remove",
            Self::Get { .. } => "get",
            Self::QueryArea { .. } => "query_area",
            Self::SetHealth { .. } => "set_health",
            Self::SetClock { .. } => "set_clock",
            Self::Hash => "hash",
            Self::Check => "check",
            Self::Save { .. } => "save",
            Self::Load { .. } => "load",
            Self::Quit => "quit",
        }
    }
}
