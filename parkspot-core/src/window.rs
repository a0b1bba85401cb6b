use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

/// Half-open interval `[start, end)` during which a slot is claimed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "RawWindow")]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<RawWindow> for TimeWindow {
    type Error = CoreError;

    fn try_from(raw: RawWindow) -> Result<Self, Self::Error> {
        TimeWindow::new(raw.start, raw.end)
    }
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> CoreResult<Self> {
        if end <= start {
            return Err(CoreError::ValidationError(format!(
                "window end {} must be after start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// `[start, start + hours)`.
    pub fn starting_at(start: DateTime<Utc>, hours: u32) -> CoreResult<Self> {
        if hours == 0 {
            return Err(CoreError::ValidationError("duration must be at least one hour".into()));
        }
        let end = start
            .checked_add_signed(Duration::hours(i64::from(hours)))
            .ok_or_else(|| CoreError::ValidationError("window end out of range".into()))?;
        Self::new(start, end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Standard half-open intersection test; touching windows do not overlap.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    pub fn has_elapsed(&self, now: DateTime<Utc>) -> bool {
        now >= self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_rejects_empty_and_inverted_windows() {
        assert!(TimeWindow::new(at(10), at(10)).is_err());
        assert!(TimeWindow::new(at(11), at(10)).is_err());
        assert!(TimeWindow::starting_at(at(10), 0).is_err());
    }

    #[test]
    fn test_overlap_is_half_open() {
        let morning = TimeWindow::starting_at(at(10), 2).unwrap();
        let inside = TimeWindow::starting_at(at(11), 1).unwrap();
        let touching = TimeWindow::starting_at(at(12), 1).unwrap();

        assert!(morning.overlaps(&inside));
        assert!(inside.overlaps(&morning));
        assert!(!morning.overlaps(&touching));
        assert!(!touching.overlaps(&morning));
        assert!(morning.contains(at(10)));
        assert!(!morning.contains(at(12)));
        assert_eq!(morning.duration(), Duration::hours(2));
    }

    #[test]
    fn test_deserialize_validates() {
        let ok = r#"{"start":"2024-01-01T10:00:00Z","end":"2024-01-01T12:00:00Z"}"#;
        let window: TimeWindow = serde_json::from_str(ok).unwrap();
        assert_eq!(window.start(), at(10));

        let bad = r#"{"start":"2024-01-01T12:00:00Z","end":"2024-01-01T10:00:00Z"}"#;
        assert!(serde_json::from_str::<TimeWindow>(bad).is_err());
    }
}
