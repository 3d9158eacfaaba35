use chrono::{DateTime, NaiveDateTime, TimeZone, Timelike, Utc};

use super::run::{RunKind, RunStatus};

/// Page size used when none is known.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Page sizes offered by the page-size selector.
pub const PAGE_SIZE_OPTIONS: [u32; 8] = [10, 15, 20, 30, 40, 50, 75, 100];

/// Wire format for time bounds: UTC, second precision, literal `Z`.
const WIRE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

// ---------------------------------------------------------------------------
// Time range
// ---------------------------------------------------------------------------

/// A closed creation-time interval, stored in UTC with second precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    /// Build a range, truncating both bounds to whole seconds and ordering
    /// them so that `start <= end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let start = truncate_seconds(start);
        let end = truncate_seconds(end);
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// Build a range from wall-clock values picked in `tz`.
    ///
    /// Returns `None` when either value does not exist in that zone (for
    /// example inside a DST gap).
    pub fn from_wall_clock<Tz: TimeZone>(
        tz: &Tz,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Option<Self> {
        let start = tz.from_local_datetime(&start).earliest()?;
        let end = tz.from_local_datetime(&end).earliest()?;
        Some(Self::new(
            start.with_timezone(&Utc),
            end.with_timezone(&Utc),
        ))
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// `(startTime, endTime)` as sent to the backend and kept in the location.
    pub fn wire_bounds(&self) -> (String, String) {
        (format_wire_time(&self.start), format_wire_time(&self.end))
    }

    /// Rebuild a range from its wire form. Both bounds must parse.
    pub fn parse_wire(start: &str, end: &str) -> Option<Self> {
        let start = DateTime::parse_from_rfc3339(start.trim()).ok()?;
        let end = DateTime::parse_from_rfc3339(end.trim()).ok()?;
        Some(Self::new(
            start.with_timezone(&Utc),
            end.with_timezone(&Utc),
        ))
    }
}

fn truncate_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

pub fn format_wire_time(dt: &DateTime<Utc>) -> String {
    dt.format(WIRE_TIME_FORMAT).to_string()
}

// ---------------------------------------------------------------------------
// Filter state
// ---------------------------------------------------------------------------

/// Identifies one clearable filter field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKey {
    Kind,
    Status,
    TimeRange,
}

impl FilterKey {
    pub fn label(self) -> &'static str {
        match self {
            Self::Kind => "type",
            Self::Status => "status",
            Self::TimeRange => "createTime",
        }
    }
}

/// Run list filter. Used both for the applied filter and for draft edits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterState {
    pub kind: Option<RunKind>,
    pub status: Option<RunStatus>,
    pub time_range: Option<TimeRange>,
}

impl FilterState {
    pub fn is_empty(&self) -> bool {
        self.kind.is_none() && self.status.is_none() && self.time_range.is_none()
    }

    /// Clear a single field. The time range is cleared as a pair.
    pub fn clear(&mut self, key: FilterKey) {
        match key {
            FilterKey::Kind => self.kind = None,
            FilterKey::Status => self.status = None,
            FilterKey::TimeRange => self.time_range = None,
        }
    }

    /// `(key, label)` pairs for every set field, in display order.
    pub fn active(&self) -> Vec<(FilterKey, String)> {
        let mut out = Vec::new();
        if let Some(kind) = self.kind {
            out.push((FilterKey::Kind, kind.to_string()));
        }
        if let Some(status) = self.status {
            out.push((FilterKey::Status, status.to_string()));
        }
        if let Some(range) = self.time_range {
            let (start, end) = range.wire_bounds();
            out.push((FilterKey::TimeRange, format!("{start} ~ {end}")));
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// 1-based page index.
    pub page: u32,
    pub page_size: u32,
    /// Server-reported total; overwritten by every applied fetch.
    pub total: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            total: 0,
        }
    }
}

impl Pagination {
    /// Same page size, back to the first page.
    pub fn first_page(self) -> Self {
        Self { page: 1, ..self }
    }

    pub fn page_count(&self) -> u64 {
        if self.total == 0 {
            1
        } else {
            self.total.div_ceil(u64::from(self.page_size.max(1)))
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, NaiveDate};

    use super::*;

    fn naive(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn wall_clock_range_is_normalized_to_utc() {
        let tz = FixedOffset::east_opt(8 * 3600).unwrap();
        let range =
            TimeRange::from_wall_clock(&tz, naive(2024, 1, 1, 0), naive(2024, 1, 2, 0)).unwrap();
        assert_eq!(
            range.wire_bounds(),
            (
                "2023-12-31T16:00:00Z".to_owned(),
                "2024-01-01T16:00:00Z".to_owned()
            )
        );
    }

    #[test]
    fn utc_wall_clock_keeps_values() {
        let range =
            TimeRange::from_wall_clock(&Utc, naive(2024, 1, 1, 0), naive(2024, 1, 2, 0)).unwrap();
        assert_eq!(range.wire_bounds().0, "2024-01-01T00:00:00Z");
        assert_eq!(range.wire_bounds().1, "2024-01-02T00:00:00Z");
    }

    #[test]
    fn reversed_bounds_are_ordered() {
        let a = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
        let range = TimeRange::new(a, b);
        assert_eq!(range.start(), b);
        assert_eq!(range.end(), a);
    }

    #[test]
    fn parse_wire_requires_both_bounds() {
        assert!(TimeRange::parse_wire("2024-01-01T00:00:00Z", "garbage").is_none());
        let range = TimeRange::parse_wire("2024-01-01T00:00:00Z", "2024-01-01T01:00:00+01:00")
            .unwrap();
        assert_eq!(range.start(), range.end());
    }

    #[test]
    fn clearing_time_range_clears_both_bounds() {
        let mut filter = FilterState {
            kind: Some(RunKind::Apply),
            status: None,
            time_range: Some(TimeRange::new(Utc::now(), Utc::now())),
        };
        filter.clear(FilterKey::TimeRange);
        assert_eq!(filter.time_range, None);
        assert_eq!(filter.kind, Some(RunKind::Apply));
        assert_eq!(filter.active().len(), 1);
    }

    #[test]
    fn page_count_rounds_up() {
        let p = Pagination {
            page: 1,
            page_size: 10,
            total: 21,
        };
        assert_eq!(p.page_count(), 3);
        assert_eq!(Pagination::default().page_count(), 1);
    }
}
