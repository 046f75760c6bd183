//! 时间工具函数
//!
//! 所有日期 → 时间戳转换统一在 API 层完成，引擎和存储层只接收 `i64` Unix millis。
//! 业务时区固定为 UTC。

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};

use super::{AppError, AppResult};

/// 当前时间 (Unix millis)
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// 解析日期字符串 (YYYY-MM-DD)
pub fn parse_date(date: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| AppError::validation(format!("Invalid date format: {}", date)))
}

/// 日期开始 (00:00:00 UTC) → Unix millis
pub fn day_start_millis(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc().timestamp_millis())
        .unwrap_or_default()
}

/// 日期结束 → 次日 00:00:00 的 Unix millis
///
/// 调用方使用 `< end` (不含) 语义。
pub fn day_end_millis(date: NaiveDate) -> i64 {
    let next_day = date.succ_opt().unwrap_or(date);
    day_start_millis(next_day)
}

/// 查询下界: `YYYY-MM-DD` 取当天零点，RFC 3339 取精确时刻
pub fn parse_lower_bound(raw: &str) -> AppResult<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.timestamp_millis());
    }
    parse_date(raw).map(day_start_millis)
}

/// 查询上界 (不含): `YYYY-MM-DD` 取次日零点，RFC 3339 取精确时刻
pub fn parse_upper_bound(raw: &str) -> AppResult<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.timestamp_millis());
    }
    parse_date(raw).map(day_end_millis)
}

/// Half-open time window `[start, end)` in Unix millis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

impl TimeWindow {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Calendar month containing `now`, from its first day up to the next month
    pub fn month_of(now: DateTime<Utc>) -> Self {
        let start = month_start(now.year(), now.month());
        let (y, m) = next_month(now.year(), now.month());
        Self::new(start, month_start(y, m))
    }

    /// Calendar month before the one containing `now`
    pub fn previous_month_of(now: DateTime<Utc>) -> Self {
        let (y, m) = previous_month(now.year(), now.month());
        let end = month_start(now.year(), now.month());
        Self::new(month_start(y, m), end)
    }

    pub fn contains(&self, ts: i64) -> bool {
        ts >= self.start && ts < self.end
    }
}

fn month_start(year: i32, month: u32) -> i64 {
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_default()
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 { (year + 1, 1) } else { (year, month + 1) }
}

fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 { (year - 1, 12) } else { (year, month - 1) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_bounds() {
        let from = parse_lower_bound("2024-03-01").unwrap();
        let to = parse_upper_bound("2024-03-01").unwrap();
        assert_eq!(to - from, 86_400_000);
        assert!(parse_lower_bound("01/03/2024").is_err());
    }

    #[test]
    fn test_rfc3339_bound_is_exact() {
        let ts = parse_upper_bound("2024-03-01T12:00:00Z").unwrap();
        assert_eq!(ts, day_start_millis(parse_date("2024-03-01").unwrap()) + 12 * 3_600_000);
    }

    #[test]
    fn test_month_windows_across_year_boundary() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        let current = TimeWindow::month_of(now);
        let previous = TimeWindow::previous_month_of(now);

        assert_eq!(previous.end, current.start);
        assert_eq!(
            previous.start,
            day_start_millis(parse_date("2023-12-01").unwrap())
        );
        assert_eq!(
            current.end,
            day_start_millis(parse_date("2024-02-01").unwrap())
        );
        assert!(current.contains(now.timestamp_millis()));
        assert!(!previous.contains(now.timestamp_millis()));
    }
}
