use crate::domain::calendar::Module;
use crate::domain::models::{RoomAggregate, ScheduleSlot, SlotStatus};
use std::collections::HashMap;

/// Folds a batch of schedule slots into per-room aggregates. The batch
/// may span one day or many; the fold keys strictly on room id. A fresh
/// map is built on every call, never patched incrementally.
pub fn aggregate_slots(slots: &[ScheduleSlot]) -> HashMap<i64, RoomAggregate> {
    let mut aggregates: HashMap<i64, RoomAggregate> = HashMap::new();

    for slot in slots {
        let aggregate = aggregates
            .entry(slot.room_id)
            .or_insert_with(|| RoomAggregate::new(slot.room_id));

        aggregate.total_slots += 1;
        if slot.status.is_busy() {
            aggregate.busy_slots += 1;
        }

        // The aggregate status is the worst status seen so far; only a
        // strict priority upgrade replaces it (and refreshes the note).
        if slot.status.priority() > aggregate.status.priority() {
            aggregate.status = slot.status;
            aggregate.status_note = Some(occupancy_note(slot.module, slot.status));
        }

        if let Some(room) = &slot.room {
            if aggregate.name.is_none() {
                aggregate.name = room
                    .name
                    .as_deref()
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .map(ToOwned::to_owned);
            }
            if aggregate.location.is_none() {
                aggregate.location = room
                    .location
                    .as_deref()
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .map(ToOwned::to_owned);
            }
            if aggregate.capacity.is_none() {
                aggregate.capacity = room.capacity;
            }
            if aggregate.equipment.is_none() {
                aggregate.equipment = room
                    .equipment
                    .clone()
                    .filter(|value| !value.is_null());
            }
        }
    }

    aggregates
}

fn occupancy_note(module: Module, status: SlotStatus) -> String {
    match status {
        SlotStatus::Maintenance => format!("Module {} under maintenance", module.token()),
        _ => format!("Module {} occupied", module.token()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::RoomRef;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn sample_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).expect("valid date")
    }

    fn slot(room_id: i64, module: Module, status: SlotStatus) -> ScheduleSlot {
        ScheduleSlot {
            schedule_id: Some(room_id * 100 + module as i64),
            room_id,
            day: sample_day(),
            module,
            status,
            attendance_status: None,
            room: None,
        }
    }

    fn slot_with_room(room_id: i64, module: Module, status: SlotStatus, room: RoomRef) -> ScheduleSlot {
        ScheduleSlot {
            room: Some(room),
            ..slot(room_id, module, status)
        }
    }

    #[test]
    fn worst_status_wins_with_counts_and_utilization() {
        let slots = vec![
            slot(5, Module::M1, SlotStatus::Available),
            slot(5, Module::M2, SlotStatus::Maintenance),
            slot(5, Module::M3, SlotStatus::Available),
        ];

        let aggregates = aggregate_slots(&slots);
        let room = aggregates.get(&5).expect("room aggregate");

        assert_eq!(room.status, SlotStatus::Maintenance);
        assert_eq!(room.busy_slots, 1);
        assert_eq!(room.total_slots, 3);
        assert_eq!(room.utilization(), 33);
        assert_eq!(
            room.status_note.as_deref(),
            Some("Module M2 under maintenance")
        );
    }

    #[test]
    fn available_slots_carry_no_note() {
        let slots = vec![
            slot(5, Module::M1, SlotStatus::Available),
            slot(5, Module::M2, SlotStatus::Available),
        ];
        let aggregates = aggregate_slots(&slots);
        let room = aggregates.get(&5).expect("room aggregate");
        assert_eq!(room.status, SlotStatus::Available);
        assert!(room.status_note.is_none());
        assert_eq!(room.utilization(), 0);
    }

    #[test]
    fn ties_keep_the_first_upgrading_note() {
        let slots = vec![
            slot(5, Module::M1, SlotStatus::Unavailable),
            slot(5, Module::M3, SlotStatus::Unavailable),
        ];
        let aggregates = aggregate_slots(&slots);
        let room = aggregates.get(&5).expect("room aggregate");
        assert_eq!(room.status_note.as_deref(), Some("Module M1 occupied"));
    }

    #[test]
    fn rooms_accumulate_independently() {
        let slots = vec![
            slot(1, Module::M1, SlotStatus::Unavailable),
            slot(2, Module::M1, SlotStatus::Available),
            slot(1, Module::M2, SlotStatus::Available),
        ];
        let aggregates = aggregate_slots(&slots);
        assert_eq!(aggregates.len(), 2);
        assert_eq!(
            aggregates.get(&1).expect("room 1").status,
            SlotStatus::Unavailable
        );
        assert_eq!(
            aggregates.get(&2).expect("room 2").status,
            SlotStatus::Available
        );
    }

    #[test]
    fn room_metadata_is_first_seen_wins_with_gap_filling() {
        let first = RoomRef {
            id: 9,
            name: Some("Lab A".to_string()),
            location: None,
            capacity: None,
            equipment: None,
        };
        let second = RoomRef {
            id: 9,
            name: Some("Renamed".to_string()),
            location: Some("Block C".to_string()),
            capacity: Some(12),
            equipment: Some(serde_json::json!(["WiFi"])),
        };
        let slots = vec![
            slot_with_room(9, Module::M1, SlotStatus::Available, first),
            slot_with_room(9, Module::M2, SlotStatus::Available, second),
        ];

        let aggregates = aggregate_slots(&slots);
        let room = aggregates.get(&9).expect("room aggregate");

        assert_eq!(room.name.as_deref(), Some("Lab A"));
        assert_eq!(room.location.as_deref(), Some("Block C"));
        assert_eq!(room.capacity, Some(12));
        assert_eq!(room.equipment, Some(serde_json::json!(["WiFi"])));
    }

    fn status_strategy() -> impl Strategy<Value = SlotStatus> {
        prop_oneof![
            Just(SlotStatus::Available),
            Just(SlotStatus::Maintenance),
            Just(SlotStatus::Unavailable),
        ]
    }

    // Feature: schedule aggregation, property: room status is the
    // max-priority status regardless of input order
    proptest! {
        #[test]
        fn aggregate_status_is_permutation_invariant(
            statuses in proptest::collection::vec(status_strategy(), 1..16),
            seed in 0usize..16
        ) {
            let slots: Vec<ScheduleSlot> = statuses
                .iter()
                .enumerate()
                .map(|(index, status)| slot(3, Module::ALL[index % 4], *status))
                .collect();

            let mut rotated = slots.clone();
            rotated.rotate_left(seed % slots.len().max(1));

            let expected_priority = statuses
                .iter()
                .map(|status| status.priority())
                .max()
                .expect("at least one status");
            let expected_busy = statuses.iter().filter(|status| status.is_busy()).count() as u32;

            for batch in [&slots, &rotated] {
                let aggregates = aggregate_slots(batch);
                let room = aggregates.get(&3).expect("room aggregate");
                prop_assert_eq!(room.status.priority(), expected_priority);
                prop_assert_eq!(room.busy_slots, expected_busy);
                prop_assert_eq!(room.total_slots, statuses.len() as u32);
            }
        }
    }
}
