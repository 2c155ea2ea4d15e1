use crate::domain::models::{RoomAggregate, RoomCatalogEntry, RoomOverview, SlotStatus};
use crate::infrastructure::slot_mapper::parse_equipment;
use std::collections::{BTreeMap, HashMap};

const NO_DATA_FEATURE: &str = "No data";

/// Combines the static room catalog with the aggregates derived from the
/// day's schedule into the list the UI renders. Rooms known only to one
/// side still appear: catalog-only rooms pass through as fully available,
/// aggregate-only rooms fall back to schedule-derived metadata.
pub fn merge_room_views(
    catalog: &[RoomCatalogEntry],
    aggregates: &HashMap<i64, RoomAggregate>,
) -> Vec<RoomOverview> {
    let catalog_by_id: HashMap<i64, &RoomCatalogEntry> =
        catalog.iter().map(|entry| (entry.id, entry)).collect();

    let mut merged: BTreeMap<i64, RoomOverview> = catalog
        .iter()
        .map(|entry| {
            (
                entry.id,
                RoomOverview {
                    id: entry.id,
                    name: entry.name.clone(),
                    location: entry.location.clone(),
                    capacity: entry.capacity,
                    status: SlotStatus::Available,
                    status_note: None,
                    reservations_today: 0,
                    utilization: 0,
                    features: placeholder_features(&entry.features),
                },
            )
        })
        .collect();

    for (room_id, aggregate) in aggregates {
        let catalog_entry = catalog_by_id.get(room_id);
        merged.insert(*room_id, merge_one(catalog_entry.copied(), aggregate));
    }

    merged.into_values().collect()
}

fn merge_one(catalog_entry: Option<&RoomCatalogEntry>, aggregate: &RoomAggregate) -> RoomOverview {
    let name = catalog_entry
        .map(|entry| entry.name.clone())
        .or_else(|| aggregate.name.clone())
        .unwrap_or_else(|| format!("Room {}", aggregate.room_id));
    let location = catalog_entry
        .and_then(|entry| entry.location.clone())
        .or_else(|| aggregate.location.clone());
    let capacity = catalog_entry
        .and_then(|entry| entry.capacity)
        .or(aggregate.capacity);

    let status_note = if aggregate.status == SlotStatus::Available {
        None
    } else {
        aggregate.status_note.clone()
    };

    RoomOverview {
        id: aggregate.room_id,
        name,
        location,
        capacity,
        status: aggregate.status,
        status_note,
        reservations_today: aggregate.busy_slots,
        utilization: aggregate.utilization(),
        features: resolve_features(catalog_entry, aggregate),
    }
}

/// Feature resolution order: catalog features, then equipment parsed from
/// the aggregate's raw payload, then the placeholder.
fn resolve_features(
    catalog_entry: Option<&RoomCatalogEntry>,
    aggregate: &RoomAggregate,
) -> Vec<String> {
    if let Some(entry) = catalog_entry {
        if !entry.features.is_empty() {
            return entry.features.clone();
        }
    }
    let parsed = parse_equipment(aggregate.equipment.as_ref());
    if !parsed.is_empty() {
        return parsed;
    }
    vec![NO_DATA_FEATURE.to_string()]
}

fn placeholder_features(features: &[String]) -> Vec<String> {
    if features.is_empty() {
        vec![NO_DATA_FEATURE.to_string()]
    } else {
        features.to_vec()
    }
}
