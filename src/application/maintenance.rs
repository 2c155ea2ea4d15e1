use crate::domain::calendar::{Module, ModuleCalendar, WeekDay};
use crate::domain::models::{MaintenanceBlock, RoomCatalogEntry, SlotInfo, SlotStatus};
use crate::domain::selection::{is_action_allowed, ActionMode, SelectionMap, SessionPhase};
use crate::infrastructure::error::CoreError;
use crate::infrastructure::profile_client::UserProfileClient;
use crate::infrastructure::schedule_client::ScheduleClient;
use crate::infrastructure::slot_mapper::decode_slot;
use crate::infrastructure::token_store::AccessTokenStore;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;

pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

const TOKEN_LEEWAY_SECONDS: i64 = 30;
const MUTATION_CONCURRENCY: usize = 4;

/// One week of slot cells for a single room, plus the days whose fetch
/// failed and degraded to all-available defaults.
#[derive(Debug, Clone)]
pub struct MaintenanceGrid {
    pub week: Vec<WeekDay>,
    pub cells: HashMap<(NaiveDate, Module), SlotInfo>,
    pub failed_days: Vec<NaiveDate>,
}

impl MaintenanceGrid {
    pub fn visible_days(&self) -> Vec<NaiveDate> {
        self.week.iter().map(|day| day.date).collect()
    }
}

/// In-memory state of one room-management session. Discarded wholesale
/// when the admin closes the view; nothing here outlives a session.
#[derive(Debug, Clone)]
pub struct MaintenanceSession {
    pub room_id: i64,
    pub mode: ActionMode,
    pub phase: SessionPhase,
    pub grid: MaintenanceGrid,
    pub block_selection: SelectionMap,
    pub free_selection: SelectionMap,
}

impl MaintenanceSession {
    /// Opens a room for management. The block selection is seeded from
    /// the room's persisted maintenance blocks (restricted to the visible
    /// week); the free selection always starts empty.
    pub fn open(
        room: &RoomCatalogEntry,
        target: SlotStatus,
        grid: MaintenanceGrid,
    ) -> Result<Self, CoreError> {
        let mode = ActionMode::for_target(target).ok_or_else(|| {
            CoreError::InvalidConfig(
                "room target status must be AVAILABLE or MAINTENANCE".to_string(),
            )
        })?;

        let mut block_selection = SelectionMap::from_blocks(&room.maintenance_blocks);
        block_selection.retain_days(&grid.visible_days());

        Ok(Self {
            room_id: room.id,
            mode,
            phase: SessionPhase::Editing,
            grid,
            block_selection,
            free_selection: SelectionMap::new(),
        })
    }

    pub fn switch_target(&mut self, target: SlotStatus) -> Result<(), CoreError> {
        self.mode = ActionMode::for_target(target).ok_or_else(|| {
            CoreError::InvalidConfig(
                "room target status must be AVAILABLE or MAINTENANCE".to_string(),
            )
        })?;
        Ok(())
    }

    /// Toggles a cell in the active mode's selection. Illegal toggles
    /// (wrong status for the mode, or a past slot) are no-ops. Returns
    /// whether the cell is selected afterwards.
    pub fn toggle_slot(&mut self, date: NaiveDate, module: Module) -> bool {
        let Some(cell) = self.grid.cells.get(&(date, module)) else {
            return false;
        };
        if !is_action_allowed(self.mode, cell.status, cell.is_past) {
            return self.active_selection().contains(date, module);
        }
        match self.mode {
            ActionMode::Block => self.block_selection.toggle(date, module),
            ActionMode::Free => self.free_selection.toggle(date, module),
        }
    }

    /// Replaces the grid (fresh fetch or week change) and prunes both
    /// selections down to the days still visible.
    pub fn replace_grid(&mut self, grid: MaintenanceGrid) {
        let visible = grid.visible_days();
        self.block_selection.retain_days(&visible);
        self.free_selection.retain_days(&visible);
        self.grid = grid;
    }

    pub fn active_selection(&self) -> &SelectionMap {
        match self.mode {
            ActionMode::Block => &self.block_selection,
            ActionMode::Free => &self.free_selection,
        }
    }

    /// Persisted form of the block selection.
    pub fn normalized_blocks(&self) -> Vec<MaintenanceBlock> {
        self.block_selection.to_blocks()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MutationKind {
    Disable,
    Enable,
    Cancel,
}

/// Fetches the maintenance grid and applies confirmed selections against
/// the remote schedule service.
pub struct MaintenanceService<C, P, T>
where
    C: ScheduleClient + 'static,
    P: UserProfileClient,
    T: AccessTokenStore,
{
    schedule_client: Arc<C>,
    profile_client: Arc<P>,
    token_store: Arc<T>,
    calendar: ModuleCalendar,
    now_provider: NowProvider,
}

impl<C, P, T> MaintenanceService<C, P, T>
where
    C: ScheduleClient + 'static,
    P: UserProfileClient,
    T: AccessTokenStore,
{
    pub fn new(
        schedule_client: Arc<C>,
        profile_client: Arc<P>,
        token_store: Arc<T>,
        calendar: ModuleCalendar,
    ) -> Self {
        Self {
            schedule_client,
            profile_client,
            token_store,
            calendar,
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    /// A usable bearer token is a hard precondition for every remote
    /// operation.
    pub fn required_access_token(&self) -> Result<String, CoreError> {
        let now = (self.now_provider)();
        match self.token_store.load_token()? {
            Some(token) if token.is_valid_at(now, TOKEN_LEEWAY_SECONDS) => Ok(token.token),
            _ => Err(CoreError::Precondition(
                "no valid access token; sign in again".to_string(),
            )),
        }
    }

    async fn resolve_admin_id(&self, access_token: &str) -> Result<i64, CoreError> {
        let profile = self
            .profile_client
            .fetch_profile(access_token)
            .await
            .map_err(|error| {
                CoreError::Precondition(format!("admin identity could not be resolved: {error}"))
            })?;
        if !profile.is_admin {
            return Err(CoreError::Precondition(
                "current user is not an administrator".to_string(),
            ));
        }
        Ok(profile.id)
    }

    /// Loads the Monday–Friday grid for one room. The five day fetches
    /// run concurrently; a failed day degrades to all-available cells and
    /// is reported in `failed_days` while the siblings render normally.
    pub async fn load_week_grid(&self, room_id: i64) -> Result<MaintenanceGrid, CoreError> {
        let access_token = self.required_access_token()?;
        let now = (self.now_provider)();
        let week = self.calendar.current_week_days(now);

        let mut fetches: JoinSet<(usize, Result<Vec<crate::infrastructure::slot_mapper::RawScheduleSlot>, CoreError>)> =
            JoinSet::new();
        for (index, day) in week.iter().enumerate() {
            let client = Arc::clone(&self.schedule_client);
            let token = access_token.clone();
            let date = day.date;
            fetches.spawn(async move { (index, client.list_day_schedule(&token, date).await) });
        }

        let mut day_results: Vec<Option<Result<Vec<_>, CoreError>>> =
            (0..week.len()).map(|_| None).collect();
        while let Some(joined) = fetches.join_next().await {
            let (index, result) = joined.map_err(|error| {
                CoreError::Api(format!("failed to join schedule fetch task: {error}"))
            })?;
            if let Some(slot) = day_results.get_mut(index) {
                *slot = Some(result);
            }
        }

        let mut cells = HashMap::new();
        let mut failed_days = Vec::new();
        for (day, result) in week.iter().zip(day_results) {
            let day_slots = match result {
                Some(Ok(raw_slots)) => raw_slots
                    .iter()
                    .filter_map(|raw| decode_slot(raw, day.date))
                    .filter(|slot| slot.room_id == room_id)
                    .collect::<Vec<_>>(),
                Some(Err(_)) | None => {
                    failed_days.push(day.date);
                    Vec::new()
                }
            };

            for module in Module::ALL {
                let is_past = self.calendar.is_past(day.date, module, now);
                let info = match day_slots.iter().find(|slot| slot.module == module) {
                    Some(slot) => SlotInfo {
                        status: slot.status,
                        schedule_id: slot.schedule_id,
                        attendance_status: slot.attendance_status.clone(),
                        time_label: module.time_label().to_string(),
                        is_past,
                    },
                    None => SlotInfo {
                        status: SlotStatus::Available,
                        schedule_id: None,
                        attendance_status: None,
                        time_label: module.time_label().to_string(),
                        is_past,
                    },
                };
                cells.insert((day.date, module), info);
            }
        }

        Ok(MaintenanceGrid {
            week,
            cells,
            failed_days,
        })
    }

    /// Applies a confirmed selection. Every selected cell must resolve a
    /// schedule id before any request is issued; the batch then runs
    /// concurrently and succeeds only if every request succeeds. There is
    /// no rollback for partially applied batches; the caller retries.
    pub async fn apply_selection(
        &self,
        mode: ActionMode,
        selection: &SelectionMap,
        cells: &HashMap<(NaiveDate, Module), SlotInfo>,
    ) -> Result<usize, CoreError> {
        if selection.is_empty() {
            return Ok(0);
        }

        let access_token = self.required_access_token()?;
        let admin_id = self.resolve_admin_id(&access_token).await?;

        let mut operations = Vec::new();
        for (date, module) in selection.iter() {
            let Some(cell) = cells.get(&(date, module)) else {
                return Err(CoreError::Precondition(format!(
                    "no schedule data for {date} {}",
                    module.token()
                )));
            };
            let Some(schedule_id) = cell.schedule_id else {
                return Err(CoreError::Precondition(format!(
                    "selected slot {date} {} has no schedule id",
                    module.token()
                )));
            };
            // Free mode branches on the status captured at grid load; a
            // booked slot is cancelled, a maintenance slot re-enabled.
            let kind = match mode {
                ActionMode::Block => MutationKind::Disable,
                ActionMode::Free => match cell.status {
                    SlotStatus::Unavailable => MutationKind::Cancel,
                    _ => MutationKind::Enable,
                },
            };
            operations.push((schedule_id, kind));
        }

        let total = operations.len();
        let mut tasks: JoinSet<Result<(), CoreError>> = JoinSet::new();
        let mut failures = 0usize;

        for (schedule_id, kind) in operations {
            let client = Arc::clone(&self.schedule_client);
            let token = access_token.clone();
            tasks.spawn(async move {
                match kind {
                    MutationKind::Disable => client.disable_slot(&token, schedule_id, admin_id).await,
                    MutationKind::Enable => client.enable_slot(&token, schedule_id, admin_id).await,
                    MutationKind::Cancel => client.cancel_slot(&token, schedule_id, admin_id).await,
                }
            });
            if tasks.len() >= MUTATION_CONCURRENCY {
                failures += Self::collect_mutation_result(&mut tasks).await;
            }
        }
        while !tasks.is_empty() {
            failures += Self::collect_mutation_result(&mut tasks).await;
        }

        if failures > 0 {
            return Err(CoreError::Api(
                "not all operations succeeded, try again".to_string(),
            ));
        }
        Ok(total)
    }

    async fn collect_mutation_result(tasks: &mut JoinSet<Result<(), CoreError>>) -> usize {
        match tasks.join_next().await {
            Some(Ok(Ok(()))) => 0,
            Some(Ok(Err(_))) | Some(Err(_)) => 1,
            None => 0,
        }
    }
}
