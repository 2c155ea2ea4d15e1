use crate::application::aggregation::aggregate_slots;
use crate::application::bootstrap::bootstrap_workspace;
use crate::application::maintenance::{MaintenanceService, MaintenanceSession};
use crate::application::room_view::merge_room_views;
use crate::domain::calendar::{Module, ModuleCalendar};
use crate::domain::models::{AccessToken, MaintenanceBlock, RoomOverview, SlotStatus};
use crate::domain::selection::{is_action_allowed, ActionMode, SessionPhase};
use crate::infrastructure::config::{
    read_api_base_url, read_schedule_page_size, read_timezone,
};
use crate::infrastructure::error::CoreError;
use crate::infrastructure::profile_client::ReqwestUserProfileClient;
use crate::infrastructure::schedule_client::{ReqwestScheduleClient, ScheduleClient};
use crate::infrastructure::slot_mapper::decode_slot;
use crate::infrastructure::token_store::{AccessTokenStore, KeyringAccessTokenStore};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Application state behind the UI boundary. Holds no derived schedule
/// data across loads; every view open is a fresh read of the remote
/// service.
pub struct AppState {
    config_dir: PathBuf,
    logs_dir: PathBuf,
    runtime: Mutex<RuntimeState>,
    log_guard: Mutex<()>,
}

#[derive(Debug, Default)]
struct RuntimeState {
    catalog: Vec<crate::domain::models::RoomCatalogEntry>,
    session: Option<MaintenanceSession>,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, CoreError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;

        Ok(Self {
            config_dir: bootstrap.config_dir,
            logs_dir: bootstrap.logs_dir,
            runtime: Mutex::new(RuntimeState::default()),
            log_guard: Mutex::new(()),
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn command_error(&self, command: &str, error: &CoreError) -> String {
        self.log_error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        self.append_log("info", command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
        self.append_log("error", command, message);
    }

    fn append_log(&self, level: &str, command: &str, message: &str) {
        let Ok(_guard) = self.log_guard.lock() else {
            return;
        };
        let path = self.logs_dir.join("commands.log");
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", payload);
        }
    }
}

fn lock_runtime(state: &AppState) -> Result<MutexGuard<'_, RuntimeState>, CoreError> {
    state
        .runtime
        .lock()
        .map_err(|error| CoreError::InvalidConfig(format!("runtime lock poisoned: {error}")))
}

fn schedule_client(state: &AppState) -> Result<ReqwestScheduleClient, CoreError> {
    let base_url = read_api_base_url(state.config_dir())?;
    let page_size = read_schedule_page_size(state.config_dir())?;
    Ok(ReqwestScheduleClient::new(base_url).with_page_size(page_size))
}

fn module_calendar(state: &AppState) -> Result<ModuleCalendar, CoreError> {
    Ok(ModuleCalendar::new(read_timezone(state.config_dir())?))
}

fn maintenance_service(
    state: &AppState,
) -> Result<
    MaintenanceService<ReqwestScheduleClient, ReqwestUserProfileClient, KeyringAccessTokenStore>,
    CoreError,
> {
    let base_url = read_api_base_url(state.config_dir())?;
    Ok(MaintenanceService::new(
        Arc::new(schedule_client(state)?),
        Arc::new(ReqwestUserProfileClient::new(base_url)),
        Arc::new(KeyringAccessTokenStore::default()),
        module_calendar(state)?,
    ))
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomOverviewResponse {
    pub day: String,
    pub rooms: Vec<RoomOverview>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GridCellResponse {
    pub module: String,
    pub time_label: String,
    pub status: SlotStatus,
    pub is_past: bool,
    pub selected: bool,
    pub selectable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendance_status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GridDayResponse {
    pub date: String,
    pub label: String,
    pub fetch_failed: bool,
    pub cells: Vec<GridCellResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MaintenanceGridResponse {
    pub room_id: i64,
    pub mode: ActionMode,
    pub phase: SessionPhase,
    pub days: Vec<GridDayResponse>,
    pub maintenance_blocks: Vec<MaintenanceBlock>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToggleSlotResponse {
    pub selected: bool,
    pub selection_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveMaintenanceResponse {
    pub applied: usize,
    pub maintenance_blocks: Vec<MaintenanceBlock>,
}

/// Stores the bearer token handed over by the identity provider. Token
/// issuance itself is outside this core.
pub fn store_access_token_impl(token: String, expires_at: String) -> Result<(), CoreError> {
    let token = token.trim().to_string();
    if token.is_empty() {
        return Err(CoreError::InvalidConfig(
            "access token must not be empty".to_string(),
        ));
    }
    let expires_at: DateTime<Utc> = DateTime::parse_from_rfc3339(expires_at.trim())
        .map_err(|error| {
            CoreError::InvalidConfig(format!("expires_at must be RFC 3339: {error}"))
        })?
        .with_timezone(&Utc);

    let store = KeyringAccessTokenStore::default();
    store.save_token(&AccessToken { token, expires_at })
}

pub fn clear_access_token_impl() -> Result<(), CoreError> {
    KeyringAccessTokenStore::default().delete_token()
}

/// Loads the admin room overview for today: catalog plus the day's
/// schedule, aggregated and merged. Either fetch failing degrades its
/// side to empty data with an inline error instead of failing the view.
pub async fn load_room_overview_impl(state: &AppState) -> Result<RoomOverviewResponse, CoreError> {
    let service = maintenance_service(state)?;
    let access_token = service.required_access_token()?;
    let client = schedule_client(state)?;
    let calendar = module_calendar(state)?;
    let today = Utc::now().with_timezone(&calendar.timezone()).date_naive();

    let (catalog, catalog_error) = match client.list_rooms(&access_token).await {
        Ok(rooms) => (rooms, None),
        Err(error) => {
            state.log_error("load_room_overview", &error.to_string());
            (Vec::new(), Some(error.to_string()))
        }
    };

    let (slots, schedule_error) = match client.list_day_schedule(&access_token, today).await {
        Ok(raw_slots) => (
            raw_slots
                .iter()
                .filter_map(|raw| decode_slot(raw, today))
                .collect::<Vec<_>>(),
            None,
        ),
        Err(error) => {
            state.log_error("load_room_overview", &error.to_string());
            (Vec::new(), Some(error.to_string()))
        }
    };

    let aggregates = aggregate_slots(&slots);
    let rooms = merge_room_views(&catalog, &aggregates);

    {
        let mut runtime = lock_runtime(state)?;
        runtime.catalog = catalog;
    }

    state.log_info(
        "load_room_overview",
        &format!("day={today} rooms={}", rooms.len()),
    );

    Ok(RoomOverviewResponse {
        day: today.to_string(),
        rooms,
        catalog_error,
        schedule_error,
    })
}

/// Opens a room for maintenance management: fetches a fresh week grid,
/// seeds the block selection from the room's persisted maintenance
/// blocks, and replaces any previously open session.
pub async fn open_maintenance_impl(
    state: &AppState,
    room_id: i64,
    target_status: SlotStatus,
) -> Result<MaintenanceGridResponse, CoreError> {
    let service = maintenance_service(state)?;

    let cached_room = {
        let runtime = lock_runtime(state)?;
        runtime
            .catalog
            .iter()
            .find(|entry| entry.id == room_id)
            .cloned()
    };
    let room = match cached_room {
        Some(room) => room,
        None => {
            let access_token = service.required_access_token()?;
            let client = schedule_client(state)?;
            let catalog = client.list_rooms(&access_token).await?;
            let room = catalog
                .iter()
                .find(|entry| entry.id == room_id)
                .cloned()
                .ok_or_else(|| {
                    CoreError::InvalidConfig(format!("unknown room id {room_id}"))
                })?;
            let mut runtime = lock_runtime(state)?;
            runtime.catalog = catalog;
            room
        }
    };

    let grid = service.load_week_grid(room_id).await?;
    let session = MaintenanceSession::open(&room, target_status, grid)?;
    let response = grid_response(&session);

    {
        let mut runtime = lock_runtime(state)?;
        runtime.session = Some(session);
    }

    state.log_info(
        "open_maintenance",
        &format!("room_id={room_id} mode={:?}", response.mode),
    );
    Ok(response)
}

/// Switches the target status (and with it the action mode) of the open
/// session. The block and free selections stay separate across switches.
pub fn switch_target_impl(
    state: &AppState,
    target_status: SlotStatus,
) -> Result<MaintenanceGridResponse, CoreError> {
    let mut runtime = lock_runtime(state)?;
    let session = runtime
        .session
        .as_mut()
        .ok_or_else(|| CoreError::Precondition("no maintenance session is open".to_string()))?;
    session.switch_target(target_status)?;
    Ok(grid_response(session))
}

pub fn toggle_slot_impl(
    state: &AppState,
    date: String,
    module: String,
) -> Result<ToggleSlotResponse, CoreError> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|error| CoreError::InvalidConfig(format!("date must be YYYY-MM-DD: {error}")))?;
    let module = Module::parse_token(&module)
        .ok_or_else(|| CoreError::InvalidConfig(format!("unrecognized module token '{module}'")))?;

    let mut runtime = lock_runtime(state)?;
    let session = runtime
        .session
        .as_mut()
        .ok_or_else(|| CoreError::Precondition("no maintenance session is open".to_string()))?;

    let selected = session.toggle_slot(date, module);
    session.phase = SessionPhase::Editing;

    Ok(ToggleSlotResponse {
        selected,
        selection_count: session.active_selection().len(),
    })
}

/// Saves the open session's active selection: preconditions, batch
/// mutation, then a fresh grid fetch so the session reflects the
/// service's authoritative state.
pub async fn save_maintenance_impl(
    state: &AppState,
) -> Result<SaveMaintenanceResponse, CoreError> {
    let service = maintenance_service(state)?;

    let (room_id, mode, selection, cells) = {
        let mut runtime = lock_runtime(state)?;
        let session = runtime
            .session
            .as_mut()
            .ok_or_else(|| CoreError::Precondition("no maintenance session is open".to_string()))?;
        session.phase = SessionPhase::Saving;
        (
            session.room_id,
            session.mode,
            session.active_selection().clone(),
            session.grid.cells.clone(),
        )
    };

    let outcome = service.apply_selection(mode, &selection, &cells).await;
    let applied = match outcome {
        Ok(applied) => applied,
        Err(error) => {
            let mut runtime = lock_runtime(state)?;
            if let Some(session) = runtime.session.as_mut() {
                session.phase = SessionPhase::Error;
            }
            return Err(error);
        }
    };

    let refreshed = service.load_week_grid(room_id).await;
    let mut runtime = lock_runtime(state)?;
    let session = runtime
        .session
        .as_mut()
        .ok_or_else(|| CoreError::Precondition("session closed during save".to_string()))?;

    if mode == ActionMode::Free {
        // The free selection was transient intent, now satisfied. The
        // block selection mirrors persisted maintenance blocks and stays.
        session.free_selection.clear();
    }
    match refreshed {
        Ok(grid) => {
            session.replace_grid(grid);
            session.phase = SessionPhase::Idle;
        }
        Err(error) => {
            session.phase = SessionPhase::Error;
            state.log_error("save_maintenance", &error.to_string());
        }
    }
    let maintenance_blocks = session.normalized_blocks();

    state.log_info(
        "save_maintenance",
        &format!("room_id={room_id} mode={mode:?} applied={applied}"),
    );
    Ok(SaveMaintenanceResponse {
        applied,
        maintenance_blocks,
    })
}

/// Discards the open session and all in-memory selection state.
pub fn close_maintenance_impl(state: &AppState) -> Result<bool, CoreError> {
    let mut runtime = lock_runtime(state)?;
    Ok(runtime.session.take().is_some())
}

fn grid_response(session: &MaintenanceSession) -> MaintenanceGridResponse {
    let days = session
        .grid
        .week
        .iter()
        .map(|day| GridDayResponse {
            date: day.date.to_string(),
            label: day.label.clone(),
            fetch_failed: session.grid.failed_days.contains(&day.date),
            cells: Module::ALL
                .iter()
                .filter_map(|module| {
                    let cell = session.grid.cells.get(&(day.date, *module))?;
                    Some(GridCellResponse {
                        module: module.token().to_string(),
                        time_label: cell.time_label.clone(),
                        status: cell.status,
                        is_past: cell.is_past,
                        selected: session.active_selection().contains(day.date, *module),
                        selectable: is_action_allowed(session.mode, cell.status, cell.is_past),
                        attendance_status: cell.attendance_status.clone(),
                    })
                })
                .collect(),
        })
        .collect();

    MaintenanceGridResponse {
        room_id: session.room_id,
        mode: session.mode,
        phase: session.phase,
        days,
        maintenance_blocks: session.normalized_blocks(),
    }
}
