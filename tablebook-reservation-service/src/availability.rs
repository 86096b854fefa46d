//! Table assignment for a requested slot.
//!
//! A booking occupies its table for a fixed window starting at the
//! reservation time. Assignment is best-fit: the smallest table that seats
//! the party and has no overlapping active booking wins. The resolver is a
//! pure query over data the caller already loaded (and locked); persisting
//! the winning assignment is the caller's job.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;
use uuid::Uuid;

/// Every booking holds its table for two hours.
pub const OCCUPANCY_MINUTES: i64 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccupancyWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl OccupancyWindow {
    /// Half-open `[start, start + 2h)`. An end that would cross midnight is
    /// clamped to the last instant of the day.
    pub fn starting_at(start: NaiveTime) -> Self {
        let (end, wrapped) = start.overflowing_add_signed(Duration::minutes(OCCUPANCY_MINUTES));
        let end = if wrapped > 0 {
            NaiveTime::from_hms_opt(23, 59, 59).unwrap()
        } else {
            end
        };
        OccupancyWindow { start, end }
    }

    pub fn overlaps(&self, other: &OccupancyWindow) -> bool {
        !(self.end <= other.start || other.end <= self.start)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpeningHours {
    pub open_time: NaiveTime,
    pub close_time: NaiveTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateTable {
    pub id: Uuid,
    pub capacity: i32,
}

/// An active (pending or confirmed) booking on the requested date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookedSlot {
    pub reservation_id: Uuid,
    pub table_id: Uuid,
    pub time: NaiveTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRequest {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub party_size: i32,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingError {
    #[error("the reservation date has already passed")]
    DateInPast,
    #[error("the reservation time has already passed")]
    TimeInPast,
    #[error("the restaurant opens at {open}")]
    BeforeOpening { open: NaiveTime },
    #[error("the restaurant closes at {close}")]
    AfterClosing { close: NaiveTime },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveError {
    #[error(transparent)]
    InvalidTiming(#[from] TimingError),
    #[error("no table seating the party is free for this window")]
    NoAvailability,
}

/// Picks the table for `request`, or reports why none can be assigned.
///
/// `active` carries the active bookings of the restaurant on the requested
/// date; `exclude` names a reservation being revised so it never conflicts
/// with itself. Both opening and closing times are valid start times.
pub fn resolve_table(
    hours: &OpeningHours,
    tables: &[CandidateTable],
    active: &[BookedSlot],
    now: NaiveDateTime,
    request: &SlotRequest,
    exclude: Option<Uuid>,
) -> Result<Uuid, ResolveError> {
    if request.date < now.date() {
        return Err(TimingError::DateInPast.into());
    }
    if request.date == now.date() && request.time <= now.time() {
        return Err(TimingError::TimeInPast.into());
    }
    if request.time < hours.open_time {
        return Err(TimingError::BeforeOpening {
            open: hours.open_time,
        }
        .into());
    }
    if request.time > hours.close_time {
        return Err(TimingError::AfterClosing {
            close: hours.close_time,
        }
        .into());
    }

    let window = OccupancyWindow::starting_at(request.time);

    let mut candidates: Vec<&CandidateTable> = tables
        .iter()
        .filter(|t| t.capacity >= request.party_size)
        .collect();
    candidates.sort_by_key(|t| (t.capacity, t.id));

    candidates
        .into_iter()
        .find(|table| {
            !active
                .iter()
                .filter(|slot| slot.table_id == table.id)
                .filter(|slot| exclude != Some(slot.reservation_id))
                .any(|slot| OccupancyWindow::starting_at(slot.time).overlaps(&window))
        })
        .map(|table| table.id)
        .ok_or(ResolveError::NoAvailability)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn hours() -> OpeningHours {
        OpeningHours {
            open_time: time(11, 0),
            close_time: time(22, 0),
        }
    }

    fn now() -> NaiveDateTime {
        date(2024, 5, 20).and_time(time(9, 0))
    }

    fn request(d: NaiveDate, t: NaiveTime, party_size: i32) -> SlotRequest {
        SlotRequest {
            date: d,
            time: t,
            party_size,
        }
    }

    // Fixed ids so the (capacity, id) tie-break is reproducible.
    fn table(n: u128, capacity: i32) -> CandidateTable {
        CandidateTable {
            id: Uuid::from_u128(n),
            capacity,
        }
    }

    #[test]
    fn window_spans_two_hours() {
        let window = OccupancyWindow::starting_at(time(18, 0));
        assert_eq!(window.start, time(18, 0));
        assert_eq!(window.end, time(20, 0));
    }

    #[test]
    fn window_is_clamped_at_midnight() {
        let window = OccupancyWindow::starting_at(time(23, 0));
        assert_eq!(window.end, NaiveTime::from_hms_opt(23, 59, 59).unwrap());

        // Landing exactly on midnight also counts as crossing the day.
        let window = OccupancyWindow::starting_at(time(22, 0));
        assert_eq!(window.end, NaiveTime::from_hms_opt(23, 59, 59).unwrap());
    }

    #[test]
    fn adjacent_windows_do_not_overlap() {
        let first = OccupancyWindow::starting_at(time(18, 0));
        let second = OccupancyWindow::starting_at(time(20, 0));
        assert!(!first.overlaps(&second));
        assert!(!second.overlaps(&first));
    }

    #[test]
    fn contained_windows_overlap() {
        let first = OccupancyWindow::starting_at(time(18, 0));
        let second = OccupancyWindow::starting_at(time(19, 0));
        assert!(first.overlaps(&second));
        assert!(second.overlaps(&first));
    }

    #[test]
    fn past_date_is_rejected() {
        let result = resolve_table(
            &hours(),
            &[table(1, 4)],
            &[],
            now(),
            &request(date(2024, 5, 19), time(18, 0), 2),
            None,
        );
        assert_eq!(
            result,
            Err(ResolveError::InvalidTiming(TimingError::DateInPast))
        );
    }

    #[test]
    fn earlier_time_today_is_rejected() {
        let result = resolve_table(
            &hours(),
            &[table(1, 4)],
            &[],
            now(),
            &request(date(2024, 5, 20), time(8, 0), 2),
            None,
        );
        assert_eq!(
            result,
            Err(ResolveError::InvalidTiming(TimingError::TimeInPast))
        );

        // Later the same day is fine.
        let result = resolve_table(
            &hours(),
            &[table(1, 4)],
            &[],
            now(),
            &request(date(2024, 5, 20), time(12, 0), 2),
            None,
        );
        assert_eq!(result, Ok(Uuid::from_u128(1)));
    }

    #[test]
    fn outside_opening_hours_is_rejected() {
        let result = resolve_table(
            &hours(),
            &[table(1, 4)],
            &[],
            now(),
            &request(date(2024, 5, 21), time(10, 30), 2),
            None,
        );
        assert_eq!(
            result,
            Err(ResolveError::InvalidTiming(TimingError::BeforeOpening {
                open: time(11, 0)
            }))
        );

        let result = resolve_table(
            &hours(),
            &[table(1, 4)],
            &[],
            now(),
            &request(date(2024, 5, 21), time(22, 30), 2),
            None,
        );
        assert_eq!(
            result,
            Err(ResolveError::InvalidTiming(TimingError::AfterClosing {
                close: time(22, 0)
            }))
        );
    }

    #[test]
    fn opening_and_closing_times_are_valid_starts() {
        let tables = [table(1, 4)];
        let result = resolve_table(
            &hours(),
            &tables,
            &[],
            now(),
            &request(date(2024, 5, 21), time(11, 0), 2),
            None,
        );
        assert_eq!(result, Ok(Uuid::from_u128(1)));

        let result = resolve_table(
            &hours(),
            &tables,
            &[],
            now(),
            &request(date(2024, 5, 21), time(22, 0), 2),
            None,
        );
        assert_eq!(result, Ok(Uuid::from_u128(1)));
    }

    #[test]
    fn best_fit_prefers_the_smallest_sufficient_table() {
        let tables = [table(1, 2), table(2, 4), table(3, 8)];
        let result = resolve_table(
            &hours(),
            &tables,
            &[],
            now(),
            &request(date(2024, 6, 1), time(18, 0), 3),
            None,
        );
        assert_eq!(result, Ok(Uuid::from_u128(2)));
    }

    #[test]
    fn exact_capacity_is_a_valid_fit() {
        let tables = [table(1, 2), table(2, 4)];
        let result = resolve_table(
            &hours(),
            &tables,
            &[],
            now(),
            &request(date(2024, 6, 1), time(18, 0), 2),
            None,
        );
        assert_eq!(result, Ok(Uuid::from_u128(1)));
    }

    #[test]
    fn equal_capacities_break_ties_by_id() {
        let tables = [table(7, 4), table(3, 4), table(5, 4)];
        let result = resolve_table(
            &hours(),
            &tables,
            &[],
            now(),
            &request(date(2024, 6, 1), time(18, 0), 4),
            None,
        );
        assert_eq!(result, Ok(Uuid::from_u128(3)));
    }

    #[test]
    fn oversized_party_exhausts_availability() {
        let tables = [table(1, 2), table(2, 4), table(3, 8)];
        let result = resolve_table(
            &hours(),
            &tables,
            &[],
            now(),
            &request(date(2024, 6, 1), time(18, 0), 9),
            None,
        );
        assert_eq!(result, Err(ResolveError::NoAvailability));
    }

    #[test]
    fn occupied_best_fit_falls_back_to_the_next_candidate() {
        let tables = [table(1, 4), table(2, 8)];
        let active = [BookedSlot {
            reservation_id: Uuid::from_u128(100),
            table_id: Uuid::from_u128(1),
            time: time(18, 0),
        }];
        let result = resolve_table(
            &hours(),
            &tables,
            &active,
            now(),
            &request(date(2024, 6, 1), time(19, 0), 3),
            None,
        );
        assert_eq!(result, Ok(Uuid::from_u128(2)));
    }

    #[test]
    fn overlapping_window_on_the_only_fit_is_no_availability() {
        // Open 11:00-22:00, tables of 2 and 4, table(4) booked 18:00-20:00.
        let tables = [table(1, 2), table(2, 4)];
        let active = [BookedSlot {
            reservation_id: Uuid::from_u128(100),
            table_id: Uuid::from_u128(2),
            time: time(18, 0),
        }];

        // 19:00 overlaps the existing window and the two-seater cannot fit
        // a party of three.
        let result = resolve_table(
            &hours(),
            &tables,
            &active,
            now(),
            &request(date(2024, 6, 1), time(19, 0), 3),
            None,
        );
        assert_eq!(result, Err(ResolveError::NoAvailability));

        // 20:30 starts after the existing booking ends.
        let result = resolve_table(
            &hours(),
            &tables,
            &active,
            now(),
            &request(date(2024, 6, 1), time(20, 30), 3),
            None,
        );
        assert_eq!(result, Ok(Uuid::from_u128(2)));
    }

    #[test]
    fn back_to_back_bookings_share_a_table() {
        let tables = [table(1, 4)];
        let active = [BookedSlot {
            reservation_id: Uuid::from_u128(100),
            table_id: Uuid::from_u128(1),
            time: time(18, 0),
        }];
        let result = resolve_table(
            &hours(),
            &tables,
            &active,
            now(),
            &request(date(2024, 6, 1), time(20, 0), 4),
            None,
        );
        assert_eq!(result, Ok(Uuid::from_u128(1)));
    }

    #[test]
    fn revision_never_conflicts_with_itself() {
        let tables = [table(1, 4)];
        let own = Uuid::from_u128(100);
        let active = [BookedSlot {
            reservation_id: own,
            table_id: Uuid::from_u128(1),
            time: time(18, 0),
        }];

        // Without the exclusion the slot is taken by the reservation itself.
        let result = resolve_table(
            &hours(),
            &tables,
            &active,
            now(),
            &request(date(2024, 6, 1), time(18, 0), 4),
            None,
        );
        assert_eq!(result, Err(ResolveError::NoAvailability));

        let result = resolve_table(
            &hours(),
            &tables,
            &active,
            now(),
            &request(date(2024, 6, 1), time(18, 0), 4),
            Some(own),
        );
        assert_eq!(result, Ok(Uuid::from_u128(1)));
    }

    #[test]
    fn cancelled_slots_are_not_passed_and_free_the_table() {
        // The ledger query feeds only active bookings; resolving the same
        // slot after a cancellation assigns the same table again.
        let tables = [table(1, 2), table(2, 4)];
        let slot = request(date(2024, 6, 1), time(18, 0), 4);

        let first = resolve_table(&hours(), &tables, &[], now(), &slot, None);
        assert_eq!(first, Ok(Uuid::from_u128(2)));

        let again = resolve_table(&hours(), &tables, &[], now(), &slot, None);
        assert_eq!(again, first);
    }

    #[test]
    fn late_windows_clamped_to_midnight_still_collide() {
        let late = OpeningHours {
            open_time: time(17, 0),
            close_time: time(23, 30),
        };
        let tables = [table(1, 4)];
        let active = [BookedSlot {
            reservation_id: Uuid::from_u128(100),
            table_id: Uuid::from_u128(1),
            time: time(23, 0),
        }];
        let result = resolve_table(
            &late,
            &tables,
            &active,
            now(),
            &request(date(2024, 6, 1), time(23, 15), 2),
            None,
        );
        assert_eq!(result, Err(ResolveError::NoAvailability));
    }
}
