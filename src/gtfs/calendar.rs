//! Service Calendar Engine (C5): evaluates which days a GTFS `service_id`
//! operates on, from the `calendar` weekday window and `calendar_dates`
//! exceptions.

use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::structure::{Exception, GtfsCalendar, GtfsCalendarDate};

/// All calendar information for a single `service_id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceCalendar {
    pub regular: Option<GtfsCalendar>,
    pub exceptions: Vec<GtfsCalendarDate>,
}

impl ServiceCalendar {
    /// `operates_on` per spec §4.5: exception first, then the weekday
    /// bitmap within the calendar window, else false.
    pub fn operates_on(&self, date: NaiveDate) -> bool {
        if let Some(exc) = self.exceptions.iter().find(|e| e.date == date) {
            return matches!(exc.exception_type, Exception::Added);
        }
        if let Some(cal) = &self.regular {
            if cal.start_date <= date && date <= cal.end_date {
                return cal.valid_weekday(date);
            }
        }
        false
    }

    /// Enumerates every date on which this service operates: the regular
    /// weekday window minus type-2 removals, plus type-1 additions. When
    /// there is no `calendar` record, the set is exactly the additions.
    pub fn valid_calendar_days(&self) -> Vec<NaiveDate> {
        let mut days = Vec::new();

        if let Some(cal) = &self.regular {
            let mut d = cal.start_date;
            while d <= cal.end_date {
                if cal.valid_weekday(d) {
                    days.push(d);
                }
                d += Duration::days(1);
            }
        }

        let removed: std::collections::HashSet<NaiveDate> = self
            .exceptions
            .iter()
            .filter(|e| matches!(e.exception_type, Exception::Deleted))
            .map(|e| e.date)
            .collect();
        days.retain(|d| !removed.contains(d));

        for exc in &self.exceptions {
            if matches!(exc.exception_type, Exception::Added) && !days.contains(&exc.date) {
                days.push(exc.date);
            }
        }

        days.sort();
        days
    }
}

/// Index of every service's calendar, built by the loader.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalendarIndex {
    pub by_service_id: HashMap<String, ServiceCalendar>,
}

impl CalendarIndex {
    pub fn build(calendars: Vec<GtfsCalendar>, dates: Vec<GtfsCalendarDate>) -> Self {
        let mut by_service_id: HashMap<String, ServiceCalendar> = HashMap::new();

        for cal in calendars {
            by_service_id
                .entry(cal.service_id.clone())
                .or_default()
                .regular = Some(cal);
        }

        for date in dates {
            by_service_id
                .entry(date.service_id.clone())
                .or_default()
                .exceptions
                .push(date);
        }

        Self { by_service_id }
    }

    pub fn operates_on(&self, service_id: &str, date: NaiveDate) -> bool {
        self.by_service_id
            .get(service_id)
            .map(|cal| cal.operates_on(date))
            .unwrap_or(false)
    }

    pub fn valid_calendar_days(&self, service_ids: &[&str]) -> Vec<NaiveDate> {
        let mut days: std::collections::BTreeSet<NaiveDate> = Default::default();
        for service_id in service_ids {
            if let Some(cal) = self.by_service_id.get(*service_id) {
                days.extend(cal.valid_calendar_days());
            }
        }
        days.into_iter().collect()
    }
}

/// Groups a sorted list of dates into contiguous ranges (a 1-day gap still
/// merges) and renders `YYYY-MM-DD[ to YYYY-MM-DD]; …`.
pub fn service_days_string(days: &[NaiveDate]) -> String {
    if days.is_empty() {
        return String::new();
    }

    let mut ranges: Vec<(NaiveDate, NaiveDate)> = Vec::new();
    let mut start = days[0];
    let mut end = days[0];

    for &d in &days[1..] {
        if (d - end).num_days() <= 1 {
            end = d;
        } else {
            ranges.push((start, end));
            start = d;
            end = d;
        }
    }
    ranges.push((start, end));

    ranges
        .into_iter()
        .map(|(s, e)| {
            if s == e {
                s.format("%Y-%m-%d").to_string()
            } else {
                format!("{} to {}", s.format("%Y-%m-%d"), e.format("%Y-%m-%d"))
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod test {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn weekday_calendar(service_id: &str) -> GtfsCalendar {
        GtfsCalendar {
            service_id: service_id.to_string(),
            monday: true,
            tuesday: true,
            wednesday: true,
            thursday: true,
            friday: true,
            saturday: false,
            sunday: false,
            start_date: date(2026, 1, 5),
            end_date: date(2026, 1, 18),
        }
    }

    #[test]
    fn exception_overrides_regular_calendar() {
        let index = CalendarIndex::build(
            vec![weekday_calendar("svc1")],
            vec![GtfsCalendarDate {
                service_id: "svc1".to_string(),
                date: date(2026, 1, 10), // a Saturday would be false regularly; force Jan 10 (Sat) added
                exception_type: Exception::Added,
            }],
        );

        // Jan 10 2026 is a Saturday, not covered by the weekday bitmap.
        assert!(index.operates_on("svc1", date(2026, 1, 10)));
        assert!(index.operates_on("svc1", date(2026, 1, 5)));
        assert!(!index.operates_on("svc1", date(2026, 1, 11)));
    }

    #[test]
    fn operates_on_is_deterministic() {
        let index = CalendarIndex::build(vec![weekday_calendar("svc1")], vec![]);
        let d = date(2026, 1, 6);
        let first = index.operates_on("svc1", d);
        let second = index.operates_on("svc1", d);
        assert_eq!(first, second);
    }

    #[test]
    fn service_days_string_merges_contiguous_ranges() {
        let days = vec![date(2026, 1, 5), date(2026, 1, 6), date(2026, 1, 7), date(2026, 1, 12)];
        assert_eq!(
            service_days_string(&days),
            "2026-01-05 to 2026-01-07; 2026-01-12"
        );
    }

    #[test]
    fn calendar_dates_only_service_is_just_the_additions() {
        let cal = ServiceCalendar {
            regular: None,
            exceptions: vec![GtfsCalendarDate {
                service_id: "svc2".to_string(),
                date: date(2026, 2, 1),
                exception_type: Exception::Added,
            }],
        };
        assert_eq!(cal.valid_calendar_days(), vec![date(2026, 2, 1)]);
    }
}
