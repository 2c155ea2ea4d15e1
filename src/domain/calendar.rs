use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Bookable time modules of a campus day, in chronological order.
///
/// The derived `Ord` follows declaration order and is the canonical sort
/// order used everywhere modules are sorted or deduplicated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Module {
    M1,
    M2,
    M3,
    M4,
}

impl Module {
    pub const ALL: [Module; 4] = [Module::M1, Module::M2, Module::M3, Module::M4];

    pub fn token(self) -> &'static str {
        match self {
            Module::M1 => "M1",
            Module::M2 => "M2",
            Module::M3 => "M3",
            Module::M4 => "M4",
        }
    }

    pub fn time_label(self) -> &'static str {
        match self {
            Module::M1 => "07:00 - 08:40",
            Module::M2 => "08:50 - 10:30",
            Module::M3 => "10:40 - 12:20",
            Module::M4 => "13:30 - 15:10",
        }
    }

    pub fn start_time(self) -> NaiveTime {
        let (hour, minute) = match self {
            Module::M1 => (7, 0),
            Module::M2 => (8, 50),
            Module::M3 => (10, 40),
            Module::M4 => (13, 30),
        };
        NaiveTime::from_hms_opt(hour, minute, 0).expect("valid fixed module time")
    }

    /// Parses a raw module token. Accepts the canonical `"M2"` form (any
    /// case) and bare numeric `"2"` tokens; anything else is rejected.
    pub fn parse_token(raw: &str) -> Option<Module> {
        let normalized = raw.trim();
        let digits = normalized
            .strip_prefix('M')
            .or_else(|| normalized.strip_prefix('m'))
            .unwrap_or(normalized);
        match digits.trim() {
            "1" => Some(Module::M1),
            "2" => Some(Module::M2),
            "3" => Some(Module::M3),
            "4" => Some(Module::M4),
            _ => None,
        }
    }

    pub fn from_number(value: i64) -> Option<Module> {
        match value {
            1 => Some(Module::M1),
            2 => Some(Module::M2),
            3 => Some(Module::M3),
            4 => Some(Module::M4),
            _ => None,
        }
    }
}

/// One visible weekday of the maintenance grid.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WeekDay {
    pub date: NaiveDate,
    pub label: String,
}

/// Wall-clock math for modules in the campus timezone.
#[derive(Debug, Clone)]
pub struct ModuleCalendar {
    timezone: Tz,
}

impl Default for ModuleCalendar {
    fn default() -> Self {
        Self { timezone: Tz::UTC }
    }
}

impl ModuleCalendar {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Combines a day with the module's start wall-clock time.
    pub fn start_instant(&self, day: NaiveDate, module: Module) -> DateTime<Utc> {
        let local = day.and_time(module.start_time());
        match self.timezone.from_local_datetime(&local).earliest() {
            Some(instant) => instant.with_timezone(&Utc),
            None => Utc.from_utc_datetime(&local),
        }
    }

    pub fn is_past(&self, day: NaiveDate, module: Module, now: DateTime<Utc>) -> bool {
        self.start_instant(day, module) < now
    }

    /// Monday through Friday of the week containing `now`, always 5
    /// entries. Recomputed on every call.
    pub fn current_week_days(&self, now: DateTime<Utc>) -> Vec<WeekDay> {
        let today = now.with_timezone(&self.timezone).date_naive();
        let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
        (0..5)
            .map(|offset| {
                let date = monday + Duration::days(offset);
                WeekDay {
                    date,
                    label: format!("{} {}", weekday_label(date.weekday()), date.format("%d/%m")),
                }
            })
            .collect()
    }
}

fn weekday_label(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_now(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    #[test]
    fn module_tokens_parse_in_both_forms() {
        assert_eq!(Module::parse_token("M2"), Some(Module::M2));
        assert_eq!(Module::parse_token("m4"), Some(Module::M4));
        assert_eq!(Module::parse_token("3"), Some(Module::M3));
        assert_eq!(Module::parse_token(" M1 "), Some(Module::M1));
        assert_eq!(Module::parse_token("M5"), None);
        assert_eq!(Module::parse_token("morning"), None);
        assert_eq!(Module::parse_token(""), None);
    }

    #[test]
    fn module_order_follows_the_day() {
        let mut shuffled = vec![Module::M3, Module::M1, Module::M4, Module::M2];
        shuffled.sort();
        assert_eq!(shuffled, Module::ALL.to_vec());
    }

    #[test]
    fn start_instant_uses_the_campus_timezone() {
        let calendar = ModuleCalendar::new(chrono_tz::America::Fortaleza);
        let day = NaiveDate::from_ymd_opt(2026, 3, 2).expect("valid date");
        // 07:00 in UTC-3 is 10:00 UTC.
        let instant = calendar.start_instant(day, Module::M1);
        assert_eq!(instant, fixed_now("2026-03-02T10:00:00Z"));
    }

    #[test]
    fn is_past_compares_module_start_against_now() {
        let calendar = ModuleCalendar::default();
        let day = NaiveDate::from_ymd_opt(2026, 3, 2).expect("valid date");
        assert!(calendar.is_past(day, Module::M1, fixed_now("2026-03-02T09:00:00Z")));
        assert!(!calendar.is_past(day, Module::M4, fixed_now("2026-03-02T09:00:00Z")));
        assert!(!calendar.is_past(day, Module::M1, fixed_now("2026-03-02T07:00:00Z")));
    }

    #[test]
    fn current_week_days_runs_monday_through_friday() {
        let calendar = ModuleCalendar::default();
        // 2026-03-04 is a Wednesday.
        let week = calendar.current_week_days(fixed_now("2026-03-04T12:00:00Z"));
        assert_eq!(week.len(), 5);
        assert_eq!(week[0].date, NaiveDate::from_ymd_opt(2026, 3, 2).expect("valid date"));
        assert_eq!(week[4].date, NaiveDate::from_ymd_opt(2026, 3, 6).expect("valid date"));
        assert_eq!(week[0].label, "Mon 02/03");
    }

    #[test]
    fn current_week_days_on_a_weekend_still_yields_that_week() {
        let calendar = ModuleCalendar::default();
        // 2026-03-08 is a Sunday; its week began Monday 2026-03-02.
        let week = calendar.current_week_days(fixed_now("2026-03-08T12:00:00Z"));
        assert_eq!(week[0].date, NaiveDate::from_ymd_opt(2026, 3, 2).expect("valid date"));
    }
}
