use std::io::Write;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use diesel::{
    deserialize::{self, FromSql, FromSqlRow},
    expression::AsExpression,
    pg::{Pg, PgValue},
    prelude::*,
    serialize::{self, IsNull, Output, ToSql},
};
use uuid::Uuid;

use crate::schema::{diners, dining_tables, outbox, reservations, restaurants};

#[derive(FromSqlRow, AsExpression, PartialEq, Eq, Copy, Clone, Debug)]
#[diesel(sql_type = crate::schema::sql_types::ReservationState)]
pub enum ReservationState {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

/// States that keep a table occupied for overlap checks.
pub const ACTIVE_STATES: [ReservationState; 2] =
    [ReservationState::Pending, ReservationState::Confirmed];

impl ReservationState {
    pub fn is_active(&self) -> bool {
        matches!(self, ReservationState::Pending | ReservationState::Confirmed)
    }
}

impl ToSql<crate::schema::sql_types::ReservationState, Pg> for ReservationState {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        match *self {
            ReservationState::Pending => out.write_all(b"PENDING")?,
            ReservationState::Confirmed => out.write_all(b"CONFIRMED")?,
            ReservationState::Cancelled => out.write_all(b"CANCELLED")?,
            ReservationState::Completed => out.write_all(b"COMPLETED")?,
        }
        Ok(IsNull::No)
    }
}

impl FromSql<crate::schema::sql_types::ReservationState, Pg> for ReservationState {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"PENDING" => Ok(ReservationState::Pending),
            b"CONFIRMED" => Ok(ReservationState::Confirmed),
            b"CANCELLED" => Ok(ReservationState::Cancelled),
            b"COMPLETED" => Ok(ReservationState::Completed),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

impl From<tablebook_proto::reservation_service::ReservationState> for ReservationState {
    fn from(s: tablebook_proto::reservation_service::ReservationState) -> Self {
        match s {
            tablebook_proto::reservation_service::ReservationState::Pending => {
                ReservationState::Pending
            }
            tablebook_proto::reservation_service::ReservationState::Confirmed => {
                ReservationState::Confirmed
            }
            tablebook_proto::reservation_service::ReservationState::Cancelled => {
                ReservationState::Cancelled
            }
            tablebook_proto::reservation_service::ReservationState::Completed => {
                ReservationState::Completed
            }
        }
    }
}

impl From<ReservationState> for tablebook_proto::reservation_service::ReservationState {
    fn from(s: ReservationState) -> Self {
        match s {
            ReservationState::Pending => {
                tablebook_proto::reservation_service::ReservationState::Pending
            }
            ReservationState::Confirmed => {
                tablebook_proto::reservation_service::ReservationState::Confirmed
            }
            ReservationState::Cancelled => {
                tablebook_proto::reservation_service::ReservationState::Cancelled
            }
            ReservationState::Completed => {
                tablebook_proto::reservation_service::ReservationState::Completed
            }
        }
    }
}

#[derive(Queryable, Selectable, Identifiable, Insertable, Debug, PartialEq)]
#[diesel(table_name = restaurants)]
pub struct Restaurant {
    pub id: Uuid,
    pub name: String,
    pub open_time: NaiveTime,
    pub close_time: NaiveTime,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Insertable, Debug, PartialEq)]
#[diesel(belongs_to(Restaurant))]
#[diesel(table_name = dining_tables)]
pub struct DiningTable {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub capacity: i32,
}

#[derive(Queryable, Selectable, Identifiable, Insertable, Debug, PartialEq)]
#[diesel(table_name = diners)]
pub struct Diner {
    pub id: Uuid,
    pub name: String,
    pub paid_member: bool,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, PartialEq)]
#[diesel(belongs_to(Restaurant))]
#[diesel(belongs_to(DiningTable, foreign_key = table_id))]
#[diesel(table_name = reservations)]
pub struct Reservation {
    pub id: Uuid,
    pub sequence: i64,
    pub diner_id: Uuid,
    pub restaurant_id: Uuid,
    pub table_id: Uuid,
    pub reservation_date: NaiveDate,
    pub reservation_time: NaiveTime,
    pub party_size: i32,
    pub state: ReservationState,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// `sequence` is assigned by the database.
#[derive(Insertable, Debug, PartialEq)]
#[diesel(table_name = reservations)]
pub struct NewReservation {
    pub id: Uuid,
    pub diner_id: Uuid,
    pub restaurant_id: Uuid,
    pub table_id: Uuid,
    pub reservation_date: NaiveDate,
    pub reservation_time: NaiveTime,
    pub party_size: i32,
    pub state: ReservationState,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Debug, PartialEq)]
#[diesel(table_name = outbox)]
pub struct Outbox {
    pub id: i32,
    pub topic: String,
    pub key: String,
    pub value: Vec<u8>,
}

#[derive(Insertable, Debug, PartialEq)]
#[diesel(table_name = outbox)]
pub struct NewOutbox {
    pub topic: String,
    pub key: String,
    pub value: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pending_and_confirmed_occupy_a_table() {
        assert!(ReservationState::Pending.is_active());
        assert!(ReservationState::Confirmed.is_active());
        assert!(!ReservationState::Cancelled.is_active());
        assert!(!ReservationState::Completed.is_active());
        assert!(ACTIVE_STATES.iter().all(|s| s.is_active()));
    }
}
