use crate::domain::calendar::Module;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Canonical availability state of a schedule slot, and by aggregation of
/// a whole room. The ordinal is the restriction priority used when folding
/// slots into a room-level status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotStatus {
    Available,
    Maintenance,
    Unavailable,
}

impl SlotStatus {
    pub fn priority(self) -> u8 {
        match self {
            SlotStatus::Available => 1,
            SlotStatus::Maintenance => 2,
            SlotStatus::Unavailable => 3,
        }
    }

    pub fn is_busy(self) -> bool {
        !matches!(self, SlotStatus::Available)
    }
}

/// Embedded room reference carried by some schedule records. Every field
/// except the id is optional because the backend denormalizes
/// inconsistently.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomRef {
    pub id: i64,
    pub name: Option<String>,
    pub location: Option<String>,
    pub capacity: Option<u32>,
    /// Raw equipment payload in whatever shape the backend stored it.
    pub equipment: Option<serde_json::Value>,
}

/// One decoded (room, day, module) schedule record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleSlot {
    /// Opaque backend handle required for mutation calls.
    pub schedule_id: Option<i64>,
    pub room_id: i64,
    pub day: NaiveDate,
    pub module: Module,
    pub status: SlotStatus,
    pub attendance_status: Option<String>,
    pub room: Option<RoomRef>,
}

/// Persisted maintenance window on a room: one date plus the modules
/// blocked on it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MaintenanceBlock {
    pub date: NaiveDate,
    pub modules: Vec<Module>,
}

impl MaintenanceBlock {
    pub fn validate(&self) -> Result<(), String> {
        if self.modules.is_empty() {
            return Err("maintenance block must list at least one module".to_string());
        }
        if self.modules.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err("maintenance block modules must be sorted and deduplicated".to_string());
        }
        Ok(())
    }
}

/// Static room description from the catalog. Read-only to this core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomCatalogEntry {
    pub id: i64,
    pub name: String,
    pub location: Option<String>,
    pub capacity: Option<u32>,
    pub features: Vec<String>,
    pub maintenance_blocks: Vec<MaintenanceBlock>,
}

/// Per-room accumulator over a batch of schedule slots. Rebuilt from
/// scratch on every fetch, never mutated across fetches.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomAggregate {
    pub room_id: i64,
    pub status: SlotStatus,
    pub busy_slots: u32,
    pub total_slots: u32,
    pub status_note: Option<String>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub capacity: Option<u32>,
    pub equipment: Option<serde_json::Value>,
}

impl RoomAggregate {
    pub fn new(room_id: i64) -> Self {
        Self {
            room_id,
            status: SlotStatus::Available,
            busy_slots: 0,
            total_slots: 0,
            status_note: None,
            name: None,
            location: None,
            capacity: None,
            equipment: None,
        }
    }

    /// Busy percentage over the batch, computed at read time.
    pub fn utilization(&self) -> u32 {
        if self.total_slots == 0 {
            return 0;
        }
        ((self.busy_slots as f64 / self.total_slots as f64) * 100.0).round() as u32
    }
}

/// The merged room record the UI renders.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RoomOverview {
    pub id: i64,
    pub name: String,
    pub location: Option<String>,
    pub capacity: Option<u32>,
    pub status: SlotStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_note: Option<String>,
    pub reservations_today: u32,
    pub utilization: u32,
    pub features: Vec<String>,
}

/// One rendered cell of the maintenance grid, derived per load from the
/// raw slot batch plus the module calendar.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SlotInfo {
    pub status: SlotStatus,
    pub schedule_id: Option<i64>,
    pub attendance_status: Option<String>,
    pub time_label: String,
    pub is_past: bool,
}

/// Bearer token resolved from the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn is_valid_at(&self, now: DateTime<Utc>, leeway_seconds: i64) -> bool {
        self.expires_at > now + chrono::Duration::seconds(leeway_seconds)
            && !self.token.trim().is_empty()
    }
}

/// Identity of the acting administrator, resolved from the profile
/// service before any mutation is issued.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminProfile {
    pub id: i64,
    pub display_name: String,
    pub is_admin: bool,
}
