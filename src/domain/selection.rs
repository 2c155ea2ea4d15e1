use crate::domain::calendar::Module;
use crate::domain::models::{MaintenanceBlock, SlotStatus};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// What the admin is doing to the room: scheduling new maintenance over
/// open slots, or releasing blocked/booked slots back to available.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActionMode {
    Block,
    Free,
}

impl ActionMode {
    /// The mode is a pure function of the target status the admin picked
    /// for the room. Any other target has no maintenance workflow.
    pub fn for_target(target: SlotStatus) -> Option<ActionMode> {
        match target {
            SlotStatus::Maintenance => Some(ActionMode::Block),
            SlotStatus::Available => Some(ActionMode::Free),
            SlotStatus::Unavailable => None,
        }
    }
}

/// Whether a slot may be toggled in the given mode. Past slots are
/// immutable regardless of mode.
pub fn is_action_allowed(mode: ActionMode, status: SlotStatus, is_past: bool) -> bool {
    if is_past {
        return false;
    }
    match mode {
        ActionMode::Block => status == SlotStatus::Available,
        ActionMode::Free => matches!(status, SlotStatus::Maintenance | SlotStatus::Unavailable),
    }
}

/// Lifecycle of one room-management session.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Editing,
    Saving,
    Error,
}

/// The set of (day, module) cells an admin has marked for one action
/// mode. Day entries with an empty module set are removed, never kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionMap {
    days: BTreeMap<NaiveDate, BTreeSet<Module>>,
}

impl SelectionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a selection from persisted maintenance blocks.
    pub fn from_blocks(blocks: &[MaintenanceBlock]) -> Self {
        let mut map = Self::new();
        for block in blocks {
            for module in &block.modules {
                map.insert(block.date, *module);
            }
        }
        map
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Number of selected (day, module) cells.
    pub fn len(&self) -> usize {
        self.days.values().map(BTreeSet::len).sum()
    }

    pub fn contains(&self, date: NaiveDate, module: Module) -> bool {
        self.days
            .get(&date)
            .map(|modules| modules.contains(&module))
            .unwrap_or(false)
    }

    pub fn insert(&mut self, date: NaiveDate, module: Module) {
        self.days.entry(date).or_default().insert(module);
    }

    /// Flips membership of the cell and reports whether it is selected
    /// afterwards. Emptied day entries are dropped.
    pub fn toggle(&mut self, date: NaiveDate, module: Module) -> bool {
        let modules = self.days.entry(date).or_default();
        let selected = if modules.insert(module) {
            true
        } else {
            modules.remove(&module);
            false
        };
        if self.days.get(&date).is_some_and(BTreeSet::is_empty) {
            self.days.remove(&date);
        }
        selected
    }

    /// Drops selections for days no longer in the visible week window.
    pub fn retain_days(&mut self, visible: &[NaiveDate]) {
        self.days.retain(|date, _| visible.contains(date));
    }

    pub fn clear(&mut self) {
        self.days.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, Module)> + '_ {
        self.days
            .iter()
            .flat_map(|(date, modules)| modules.iter().map(move |module| (*date, *module)))
    }

    /// Collapses the selection into the persisted form: dates ascending,
    /// modules in calendar order, deduplicated, no empty entries.
    pub fn to_blocks(&self) -> Vec<MaintenanceBlock> {
        self.days
            .iter()
            .filter(|(_, modules)| !modules.is_empty())
            .map(|(date, modules)| MaintenanceBlock {
                date: *date,
                modules: modules.iter().copied().collect(),
            })
            .collect()
    }
}
