use crate::domain::calendar::Module;
use crate::domain::models::{
    MaintenanceBlock, RoomCatalogEntry, RoomRef, ScheduleSlot, SlotStatus,
};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Module token as the backend sends it: `"M2"`-style text or a bare
/// number.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ModuleToken {
    Text(String),
    Number(i64),
}

impl ModuleToken {
    pub fn normalize(&self) -> Option<Module> {
        match self {
            ModuleToken::Text(raw) => Module::parse_token(raw),
            ModuleToken::Number(value) => Module::from_number(*value),
        }
    }
}

/// Equipment payload in the shapes upstream storage actually produces: a
/// list, a JSON-encoded string, or a keyed object. Nullish payloads are
/// handled before deserialization.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(untagged)]
pub enum EquipmentPayload {
    List(Vec<String>),
    Keyed(BTreeMap<String, String>),
    Text(String),
}

/// Normalizes any accepted equipment shape into a plain feature list.
/// JSON-encoded strings are parsed and re-dispatched; anything
/// unparseable yields an empty list rather than an error.
pub fn parse_equipment(raw: Option<&serde_json::Value>) -> Vec<String> {
    let Some(value) = raw else {
        return Vec::new();
    };
    if value.is_null() {
        return Vec::new();
    }
    match serde_json::from_value::<EquipmentPayload>(value.clone()) {
        Ok(EquipmentPayload::List(items)) => clean_features(items),
        Ok(EquipmentPayload::Keyed(map)) => clean_features(map.into_values().collect()),
        Ok(EquipmentPayload::Text(text)) => match serde_json::from_str::<serde_json::Value>(&text)
        {
            Ok(inner) => parse_equipment(Some(&inner)),
            Err(_) => Vec::new(),
        },
        Err(_) => Vec::new(),
    }
}

fn clean_features(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Maps the raw availability string to a canonical status. A present but
/// unrecognized value fails safe to UNAVAILABLE; an absent value fails
/// open to AVAILABLE.
pub fn map_status(raw: Option<&str>) -> SlotStatus {
    let Some(raw) = raw else {
        return SlotStatus::Available;
    };
    match raw.trim().to_ascii_uppercase().as_str() {
        "AVAILABLE" => SlotStatus::Available,
        "MAINTENANCE" => SlotStatus::Maintenance,
        "UNAVAILABLE" => SlotStatus::Unavailable,
        _ => SlotStatus::Unavailable,
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct RawStudyRoom {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub capacity: Option<u32>,
    #[serde(default)]
    pub equipments: Option<serde_json::Value>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct RawScheduleSlot {
    pub id: Option<i64>,
    #[serde(default)]
    pub available: Option<String>,
    #[serde(default)]
    pub module: Option<ModuleToken>,
    #[serde(rename = "studyRoom", default)]
    pub study_room: Option<RawStudyRoom>,
    #[serde(rename = "studyRoomId", default)]
    pub study_room_id: Option<i64>,
    #[serde(rename = "attendanceStatus", default)]
    pub attendance_status: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct RawSchedulePage {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub take: u32,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub items: Vec<RawScheduleSlot>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct RawMaintenanceBlock {
    pub date: Option<String>,
    #[serde(default)]
    pub modules: Vec<ModuleToken>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct RawCatalogRoom {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub capacity: Option<u32>,
    #[serde(default)]
    pub equipments: Option<serde_json::Value>,
    #[serde(rename = "maintenanceBlocks", default)]
    pub maintenance_blocks: Vec<RawMaintenanceBlock>,
}

/// Resolves the room a record belongs to. Upstream data is inconsistent,
/// so the chain is: nested room reference id, then the raw foreign key,
/// then the record's own id.
pub fn resolve_room_id(raw: &RawScheduleSlot) -> Option<i64> {
    raw.study_room
        .as_ref()
        .and_then(|room| room.id)
        .or(raw.study_room_id)
        .or(raw.id)
}

/// Decodes one raw record into a domain slot. Records that cannot yield a
/// room id or a recognized module are dropped, not fatal to the batch.
pub fn decode_slot(raw: &RawScheduleSlot, day: NaiveDate) -> Option<ScheduleSlot> {
    let room_id = resolve_room_id(raw)?;
    let module = raw.module.as_ref().and_then(ModuleToken::normalize)?;

    let room = raw.study_room.as_ref().and_then(|room| {
        room.id.map(|id| RoomRef {
            id,
            name: room.name.clone(),
            location: room.location.clone(),
            capacity: room.capacity,
            equipment: room.equipments.clone(),
        })
    });

    Some(ScheduleSlot {
        schedule_id: raw.id,
        room_id,
        day,
        module,
        status: map_status(raw.available.as_deref()),
        attendance_status: raw.attendance_status.clone(),
        room,
    })
}

/// Decodes one catalog room. Rooms without an id are dropped; malformed
/// maintenance blocks lose their unparseable parts rather than the room.
pub fn decode_catalog_room(raw: &RawCatalogRoom) -> Option<RoomCatalogEntry> {
    let id = raw.id?;
    let name = raw
        .name
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| format!("Room {id}"));

    let mut maintenance_blocks = Vec::new();
    for block in &raw.maintenance_blocks {
        let Some(date) = block
            .date
            .as_deref()
            .and_then(|value| NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok())
        else {
            continue;
        };
        let mut modules: Vec<Module> = block
            .modules
            .iter()
            .filter_map(ModuleToken::normalize)
            .collect();
        modules.sort();
        modules.dedup();
        if modules.is_empty() {
            continue;
        }
        maintenance_blocks.push(MaintenanceBlock { date, modules });
    }
    maintenance_blocks.sort_by_key(|block| block.date);

    Some(RoomCatalogEntry {
        id,
        name,
        location: raw.location.clone(),
        capacity: raw.capacity,
        features: parse_equipment(raw.equipments.as_ref()),
        maintenance_blocks,
    })
}
