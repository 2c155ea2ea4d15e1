use crate::infrastructure::error::CoreError;
use chrono_tz::Tz;
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";
const DEFAULT_API_BASE_URL: &str = "http://localhost:3333";
const DEFAULT_PAGE_SIZE: u32 = 100;

fn default_app_config() -> serde_json::Value {
    serde_json::json!({
        "schema": 1,
        "appName": "RoomSched",
        "apiBaseUrl": DEFAULT_API_BASE_URL,
        "timezone": "UTC",
        "schedulePageSize": DEFAULT_PAGE_SIZE
    })
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), CoreError> {
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&default_app_config())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, CoreError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| CoreError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(CoreError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn read_api_base_url(config_dir: &Path) -> Result<String, CoreError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    Ok(app
        .get("apiBaseUrl")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_API_BASE_URL)
        .to_string())
}

/// Campus timezone for module wall-clock math. An unknown zone name is a
/// configuration error, not a silent fallback.
pub fn read_timezone(config_dir: &Path) -> Result<Tz, CoreError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    let Some(raw) = app
        .get("timezone")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
    else {
        return Ok(Tz::UTC);
    };
    raw.parse::<Tz>()
        .map_err(|_| CoreError::InvalidConfig(format!("unknown timezone '{raw}' in {APP_JSON}")))
}

pub fn read_schedule_page_size(config_dir: &Path) -> Result<u32, CoreError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    Ok(app
        .get("schedulePageSize")
        .and_then(serde_json::Value::as_u64)
        .map(|value| value.clamp(1, 500) as u32)
        .unwrap_or(DEFAULT_PAGE_SIZE))
}
