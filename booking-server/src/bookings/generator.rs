//! Slot grid expansion
//!
//! Deterministic: same parameters always emit the same grid. The inner
//! loop walks minute offsets inside each hour and stops the last hour
//! early when the next slot would cross the closing boundary. Intervals
//! that do not divide 60 can emit slots that straddle hours; the grid is
//! what the parameters say, not a de-overlapped schedule.

use crate::db::models::SlotCreate;
use chrono::{Duration, NaiveDate, SecondsFormat};

/// One expansion request, dates inclusive on both ends
#[derive(Debug, Clone)]
pub struct SlotGrid {
    pub resource_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_hour: u32,
    pub end_hour: u32,
    pub interval_minutes: u32,
    pub price: f64,
}

/// Expand the grid into insertable slots, all available
pub fn expand(grid: &SlotGrid) -> Vec<SlotCreate> {
    let mut slots = Vec::new();

    let mut date = grid.start_date;
    while date <= grid.end_date {
        for hour in grid.start_hour..grid.end_hour {
            for minutes in (0..60).step_by(grid.interval_minutes as usize) {
                // 最后一个小时里越过关门时刻就收手
                if hour == grid.end_hour - 1 && minutes + grid.interval_minutes > 60 {
                    break;
                }

                let Some(start) = date.and_hms_opt(hour, minutes, 0) else {
                    continue;
                };
                let end = start + Duration::minutes(grid.interval_minutes as i64);

                slots.push(SlotCreate {
                    resource_id: grid.resource_id.clone(),
                    start_time: start.and_utc().to_rfc3339_opts(SecondsFormat::Millis, true),
                    end_time: end.and_utc().to_rfc3339_opts(SecondsFormat::Millis, true),
                    date: date.format("%Y-%m-%d").to_string(),
                    is_available: Some(true),
                    price: Some(grid.price),
                });
            }
        }

        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }

    slots
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn grid(
        start_date: &str,
        end_date: &str,
        start_hour: u32,
        end_hour: u32,
        interval_minutes: u32,
    ) -> SlotGrid {
        SlotGrid {
            resource_id: "resources:court1".to_string(),
            start_date: date(start_date),
            end_date: date(end_date),
            start_hour,
            end_hour,
            interval_minutes,
            price: 50.0,
        }
    }

    #[test]
    fn test_two_days_hourly() {
        let slots = expand(&grid("2024-01-01", "2024-01-02", 9, 11, 60));

        assert_eq!(slots.len(), 4);
        assert_eq!(slots[0].start_time, "2024-01-01T09:00:00.000Z");
        assert_eq!(slots[0].end_time, "2024-01-01T10:00:00.000Z");
        assert_eq!(slots[1].start_time, "2024-01-01T10:00:00.000Z");
        assert_eq!(slots[1].end_time, "2024-01-01T11:00:00.000Z");
        assert_eq!(slots[2].start_time, "2024-01-02T09:00:00.000Z");
        assert_eq!(slots[3].start_time, "2024-01-02T10:00:00.000Z");
        assert!(slots.iter().all(|s| s.is_available == Some(true)));
        assert!(slots.iter().all(|s| s.price == Some(50.0)));
    }

    #[test]
    fn test_interval_longer_than_hour() {
        // 90 minutes in a 9-11 window: one slot per day, ending 10:30
        let slots = expand(&grid("2024-01-01", "2024-01-01", 9, 11, 90));

        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].start_time, "2024-01-01T09:00:00.000Z");
        assert_eq!(slots[0].end_time, "2024-01-01T10:30:00.000Z");
    }

    #[test]
    fn test_last_hour_boundary_break() {
        // 30 minutes until 11: the 10:30 slot still fits, 10:45 would not exist
        let slots = expand(&grid("2024-01-01", "2024-01-01", 9, 11, 30));

        assert_eq!(slots.len(), 4);
        assert_eq!(slots[3].start_time, "2024-01-01T10:30:00.000Z");
        assert_eq!(slots[3].end_time, "2024-01-01T11:00:00.000Z");
    }

    #[test]
    fn test_interval_not_dividing_hour() {
        // 45 minutes: the second slot straddles 10:00 and the 10:00 slot
        // overlaps it. Faithful to the minute-offset walk.
        let slots = expand(&grid("2024-01-01", "2024-01-01", 9, 11, 45));

        let times: Vec<&str> = slots.iter().map(|s| s.start_time.as_str()).collect();
        assert_eq!(
            times,
            vec![
                "2024-01-01T09:00:00.000Z",
                "2024-01-01T09:45:00.000Z",
                "2024-01-01T10:00:00.000Z",
            ]
        );
        assert_eq!(slots[1].end_time, "2024-01-01T10:30:00.000Z");
    }

    #[test]
    fn test_date_field_matches_start_day() {
        let slots = expand(&grid("2024-02-28", "2024-03-01", 9, 10, 60));

        assert_eq!(slots.len(), 3); // leap year, 29th included
        assert_eq!(slots[0].date, "2024-02-28");
        assert_eq!(slots[1].date, "2024-02-29");
        assert_eq!(slots[2].date, "2024-03-01");
    }

    #[test]
    fn test_empty_window() {
        let slots = expand(&grid("2024-01-01", "2024-01-01", 11, 11, 60));
        assert!(slots.is_empty());
    }
}
