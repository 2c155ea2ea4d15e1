pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::aggregation::aggregate_slots;
pub use application::commands::{
    clear_access_token_impl, close_maintenance_impl, load_room_overview_impl,
    open_maintenance_impl, save_maintenance_impl, store_access_token_impl, switch_target_impl,
    toggle_slot_impl, AppState, MaintenanceGridResponse, RoomOverviewResponse,
    SaveMaintenanceResponse, ToggleSlotResponse,
};
pub use application::maintenance::{MaintenanceGrid, MaintenanceService, MaintenanceSession};
pub use application::room_view::merge_room_views;
pub use domain::calendar::{Module, ModuleCalendar, WeekDay};
pub use domain::models::{
    AccessToken, AdminProfile, MaintenanceBlock, RoomAggregate, RoomCatalogEntry, RoomOverview,
    ScheduleSlot, SlotInfo, SlotStatus,
};
pub use domain::selection::{is_action_allowed, ActionMode, SelectionMap, SessionPhase};
pub use infrastructure::error::CoreError;
pub use infrastructure::schedule_client::{ReqwestScheduleClient, ScheduleClient};
pub use infrastructure::token_store::{
    AccessTokenStore, InMemoryAccessTokenStore, KeyringAccessTokenStore,
};
