use chrono::{NaiveDate, NaiveTime, Utc};
use diesel::dsl::{insert_into, update};
use diesel::prelude::*;
use diesel::result::Error::NotFound;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use prost_types::Timestamp;
use tonic::transport::Server;
use tonic::{Request, Response, Status};
use uuid::Uuid;

use tablebook_proto::reservation_service::reservation_service_server::{
    ReservationService, ReservationServiceServer,
};
use tablebook_proto::reservation_service::{
    CancelReservationPayload, CompleteReservationPayload, ConfirmReservationPayload,
    CreateReservationPayload, GetReservationPayload, ListDinerReservationsPayload,
    ListDinerReservationsResponse, ListRestaurantReservationsPayload,
    ListRestaurantReservationsResponse, Reservation, ReservationEdge, ReservationState,
    ReviseReservationPayload,
};

use crate::availability::{
    resolve_table, BookedSlot, CandidateTable, OpeningHours, ResolveError, SlotRequest,
};
use crate::events::ReservationEventPublisher;
use crate::{establish_connection, models, schema};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

const DATE_FORMAT: &str = "%Y-%m-%d";

/// The apologetic, retryable message for an exhausted service window.
const NO_AVAILABILITY_MESSAGE: &str =
    "We are sorry: every table for this party size is booked around that time. \
     Please try another date or time.";

#[derive(Default)]
pub struct ReservationServiceImpl {}

#[tonic::async_trait]
impl ReservationService for ReservationServiceImpl {
    async fn create_reservation(
        &self,
        request: Request<CreateReservationPayload>,
    ) -> Result<Response<Reservation>, Status> {
        let payload = request.into_inner();
        let did = payload
            .diner_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid diner id"))?;
        let rid = payload
            .restaurant_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid restaurant id"))?;
        let slot = parse_slot(
            &payload.reservation_date,
            &payload.reservation_time,
            payload.party_size,
        )?;
        let now = Utc::now();

        enum Error {
            RestaurantNotFound,
            DinerNotFound,
            Resolve(ResolveError),
            Unexpected,
        }

        impl From<diesel::result::Error> for Error {
            fn from(_: diesel::result::Error) -> Self {
                Error::Unexpected
            }
        }

        let conn = &mut establish_connection();
        let reservation = conn
            .transaction(|conn| {
                let restaurant = match schema::restaurants::table
                    .find(&rid)
                    .select(models::Restaurant::as_select())
                    .first::<models::Restaurant>(conn)
                {
                    Ok(restaurant) => restaurant,
                    Err(NotFound) => return Err(Error::RestaurantNotFound),
                    Err(_) => return Err(Error::Unexpected),
                };
                match schema::diners::table
                    .find(&did)
                    .select(models::Diner::as_select())
                    .first::<models::Diner>(conn)
                {
                    Ok(_) => {}
                    Err(NotFound) => return Err(Error::DinerNotFound),
                    Err(_) => return Err(Error::Unexpected),
                };

                let assigned = resolve_locked(conn, &restaurant, &slot, None, now.naive_utc())
                    .map_err(|err| match err {
                        ResolveLockError::Database(_) => Error::Unexpected,
                        ResolveLockError::Resolve(err) => Error::Resolve(err),
                    })?;

                let reservation = insert_into(schema::reservations::table)
                    .values(models::NewReservation {
                        id: Uuid::new_v4(),
                        diner_id: did,
                        restaurant_id: rid,
                        table_id: assigned,
                        reservation_date: slot.date,
                        reservation_time: slot.time,
                        party_size: slot.party_size,
                        state: models::ReservationState::Pending,
                        notes: payload.notes.clone(),
                        created_at: now,
                        updated_at: now,
                    })
                    .returning(models::Reservation::as_returning())
                    .get_result::<models::Reservation>(conn)?;

                let mut publisher = ReservationEventPublisher::new(conn);
                publisher.reservation_created(&reservation);

                Ok(reservation)
            })
            .map_err(|err| match err {
                Error::RestaurantNotFound => Status::not_found("Restaurant not found"),
                Error::DinerNotFound => Status::not_found("Diner not found"),
                Error::Resolve(err) => serialize_resolve_error(err),
                Error::Unexpected => Status::internal("Failed to create reservation"),
            })?;

        Ok(Response::new(serialize_reservation(&reservation)))
    }

    async fn revise_reservation(
        &self,
        request: Request<ReviseReservationPayload>,
    ) -> Result<Response<Reservation>, Status> {
        let payload = request.into_inner();
        let resid = payload
            .reservation_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid reservation id"))?;
        let did = payload
            .diner_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid diner id"))?;
        let slot = parse_slot(
            &payload.reservation_date,
            &payload.reservation_time,
            payload.party_size,
        )?;
        let now = Utc::now();

        enum Error {
            NotFound,
            Forbidden,
            UnsupportedStateTransition,
            Resolve(ResolveError),
            Unexpected,
        }

        impl From<diesel::result::Error> for Error {
            fn from(_: diesel::result::Error) -> Self {
                Error::Unexpected
            }
        }

        let conn = &mut establish_connection();
        let reservation = conn
            .transaction(|conn| {
                let reservation = match schema::reservations::table
                    .find(&resid)
                    .select(models::Reservation::as_select())
                    .for_update()
                    .first::<models::Reservation>(conn)
                {
                    Ok(reservation) => reservation,
                    Err(NotFound) => return Err(Error::NotFound),
                    Err(_) => return Err(Error::Unexpected),
                };
                if reservation.diner_id != did {
                    return Err(Error::Forbidden);
                }
                if !reservation.state.is_active() {
                    return Err(Error::UnsupportedStateTransition);
                }

                let restaurant = schema::restaurants::table
                    .find(&reservation.restaurant_id)
                    .select(models::Restaurant::as_select())
                    .first::<models::Restaurant>(conn)?;

                let assigned = resolve_locked(
                    conn,
                    &restaurant,
                    &slot,
                    Some(reservation.id),
                    now.naive_utc(),
                )
                .map_err(|err| match err {
                    ResolveLockError::Database(_) => Error::Unexpected,
                    ResolveLockError::Resolve(err) => Error::Resolve(err),
                })?;

                let reservation = update(schema::reservations::table)
                    .set((
                        schema::reservations::table_id.eq(assigned),
                        schema::reservations::reservation_date.eq(slot.date),
                        schema::reservations::reservation_time.eq(slot.time),
                        schema::reservations::party_size.eq(slot.party_size),
                        schema::reservations::notes.eq(&payload.notes),
                        schema::reservations::updated_at.eq(now),
                    ))
                    .filter(schema::reservations::id.eq(&resid))
                    .returning(models::Reservation::as_returning())
                    .get_result::<models::Reservation>(conn)?;

                let mut publisher = ReservationEventPublisher::new(conn);
                publisher.reservation_revised(&reservation);

                Ok(reservation)
            })
            .map_err(|err| match err {
                Error::NotFound => Status::not_found("Reservation not found"),
                Error::Forbidden => Status::permission_denied("Not the reservation owner"),
                Error::UnsupportedStateTransition => {
                    Status::failed_precondition("Reservation is no longer active")
                }
                Error::Resolve(err) => serialize_resolve_error(err),
                Error::Unexpected => Status::internal("Failed to revise reservation"),
            })?;

        Ok(Response::new(serialize_reservation(&reservation)))
    }

    async fn confirm_reservation(
        &self,
        request: Request<ConfirmReservationPayload>,
    ) -> Result<Response<Reservation>, Status> {
        let payload = request.into_inner();
        let resid = payload
            .reservation_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid reservation id"))?;
        let rid = payload
            .restaurant_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid restaurant id"))?;

        let reservation = transition(resid, |reservation, conn| {
            if reservation.restaurant_id != rid {
                return Err(TransitionError::NotFound);
            }
            if reservation.state != models::ReservationState::Pending {
                return Err(TransitionError::UnsupportedStateTransition);
            }

            let reservation = set_state(conn, reservation, models::ReservationState::Confirmed)?;

            let mut publisher = ReservationEventPublisher::new(conn);
            publisher.reservation_confirmed(&reservation);

            Ok(reservation)
        })?;

        Ok(Response::new(serialize_reservation(&reservation)))
    }

    async fn cancel_reservation(
        &self,
        request: Request<CancelReservationPayload>,
    ) -> Result<Response<Reservation>, Status> {
        let payload = request.into_inner();
        let resid = payload
            .reservation_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid reservation id"))?;
        let did = payload
            .diner_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid diner id"))?;

        let reservation = transition(resid, |reservation, conn| {
            if reservation.diner_id != did {
                return Err(TransitionError::Forbidden);
            }
            match reservation.state {
                // Cancelling twice is a no-op.
                models::ReservationState::Cancelled => Ok(reservation),
                models::ReservationState::Completed => {
                    Err(TransitionError::UnsupportedStateTransition)
                }
                models::ReservationState::Pending | models::ReservationState::Confirmed => {
                    let reservation =
                        set_state(conn, reservation, models::ReservationState::Cancelled)?;

                    let mut publisher = ReservationEventPublisher::new(conn);
                    publisher.reservation_cancelled(&reservation);

                    Ok(reservation)
                }
            }
        })?;

        Ok(Response::new(serialize_reservation(&reservation)))
    }

    async fn complete_reservation(
        &self,
        request: Request<CompleteReservationPayload>,
    ) -> Result<Response<Reservation>, Status> {
        let payload = request.into_inner();
        let resid = payload
            .reservation_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid reservation id"))?;
        let rid = payload
            .restaurant_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid restaurant id"))?;

        let reservation = transition(resid, |reservation, conn| {
            if reservation.restaurant_id != rid {
                return Err(TransitionError::NotFound);
            }
            if reservation.state != models::ReservationState::Confirmed {
                return Err(TransitionError::UnsupportedStateTransition);
            }

            let reservation = set_state(conn, reservation, models::ReservationState::Completed)?;

            let mut publisher = ReservationEventPublisher::new(conn);
            publisher.reservation_completed(&reservation);

            Ok(reservation)
        })?;

        Ok(Response::new(serialize_reservation(&reservation)))
    }

    async fn get_reservation(
        &self,
        request: Request<GetReservationPayload>,
    ) -> Result<Response<Reservation>, Status> {
        let payload = request.into_inner();
        let resid = payload
            .reservation_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid reservation id"))?;
        let did = payload
            .diner_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid diner id"))?;

        let conn = &mut establish_connection();
        let reservation = match schema::reservations::table
            .find(&resid)
            .select(models::Reservation::as_select())
            .first::<models::Reservation>(conn)
        {
            Ok(reservation) => reservation,
            Err(NotFound) => return Err(Status::not_found("Reservation not found")),
            Err(_) => return Err(Status::internal("Cannot fetch reservation")),
        };
        if reservation.diner_id != did {
            return Err(Status::permission_denied("Not the reservation owner"));
        }

        Ok(Response::new(serialize_reservation(&reservation)))
    }

    async fn list_diner_reservations(
        &self,
        request: Request<ListDinerReservationsPayload>,
    ) -> Result<Response<ListDinerReservationsResponse>, Status> {
        use schema::reservations::dsl::*;

        let payload = request.into_inner();
        let did = payload
            .diner_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid diner id"))?;
        let after = payload
            .after
            .map(|s| s.parse::<i64>())
            .transpose()
            .map_err(|_| Status::invalid_argument("Invalid after"))?;
        let before = payload
            .before
            .map(|s| s.parse::<i64>())
            .transpose()
            .map_err(|_| Status::invalid_argument("Invalid before"))?;
        let first = payload.first;
        let last = payload.last;

        let base_query = reservations
            .select(models::Reservation::as_select())
            .filter(diner_id.eq(did));
        let query = match (after, before, first, last) {
            (None, None, Some(first), None) => base_query
                .order_by(sequence.desc())
                .limit(first.into())
                .into_boxed(),
            (None, None, None, Some(last)) => base_query
                .order_by(sequence.asc())
                .limit(last.into())
                .into_boxed(),
            (Some(after), None, Some(first), None) => base_query
                .filter(sequence.lt(after))
                .order_by(sequence.desc())
                .limit(first.into())
                .into_boxed(),
            (None, Some(before), None, Some(last)) => base_query
                .filter(sequence.gt(before))
                .order_by(sequence.asc())
                .limit(last.into())
                .into_boxed(),
            (Some(_), Some(_), _, _) => {
                return Err(Status::invalid_argument(
                    "Only one of `after` or `before` can be given.",
                ))
            }
            (_, _, Some(_), Some(_)) => {
                return Err(Status::invalid_argument(
                    "Only one of `first` or `last` can be given.",
                ))
            }
            (_, _, None, None) => {
                return Err(Status::invalid_argument(
                    "One of `first` or `last` must be given.",
                ))
            }
            (Some(_), _, None, _) => {
                return Err(Status::invalid_argument(
                    "`first` required if `after` is given.",
                ))
            }
            (_, Some(_), _, None) => {
                return Err(Status::invalid_argument(
                    "`last` required if `before` is given.",
                ))
            }
        };

        let conn = &mut establish_connection();
        let results: Vec<models::Reservation> = query
            .load(conn)
            .map_err(|_| Status::internal("Cannot fetch reservations"))?;

        Ok(Response::new(ListDinerReservationsResponse {
            edges: results
                .into_iter()
                .map(|r| ReservationEdge {
                    cursor: r.sequence.to_string(),
                    node: Some(serialize_reservation(&r)),
                })
                .collect(),
        }))
    }

    async fn list_restaurant_reservations(
        &self,
        request: Request<ListRestaurantReservationsPayload>,
    ) -> Result<Response<ListRestaurantReservationsResponse>, Status> {
        let payload = request.into_inner();
        let rid = payload
            .restaurant_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid restaurant id"))?;
        let day = parse_date(&payload.reservation_date)
            .ok_or(Status::invalid_argument("Invalid reservation date"))?;

        let conn = &mut establish_connection();
        match schema::restaurants::table
            .find(&rid)
            .select(models::Restaurant::as_select())
            .first::<models::Restaurant>(conn)
        {
            Ok(_) => {}
            Err(NotFound) => return Err(Status::not_found("Restaurant not found")),
            Err(_) => return Err(Status::internal("Cannot fetch restaurant")),
        }

        let results = schema::reservations::table
            .select(models::Reservation::as_select())
            .filter(schema::reservations::restaurant_id.eq(&rid))
            .filter(schema::reservations::reservation_date.eq(&day))
            .order((
                schema::reservations::reservation_time.asc(),
                schema::reservations::sequence.asc(),
            ))
            .load::<models::Reservation>(conn)
            .map_err(|_| Status::internal("Cannot fetch reservations"))?;

        Ok(Response::new(ListRestaurantReservationsResponse {
            reservations: results.iter().map(serialize_reservation).collect(),
        }))
    }
}

enum ResolveLockError {
    Database(diesel::result::Error),
    Resolve(ResolveError),
}

impl From<diesel::result::Error> for ResolveLockError {
    fn from(err: diesel::result::Error) -> Self {
        ResolveLockError::Database(err)
    }
}

/// Loads and locks the candidate tables, then runs the availability
/// resolver against the restaurant's active bookings of the day. Holding
/// the row locks until the surrounding transaction commits serializes
/// concurrent attempts on the same tables, so both cannot observe the same
/// slot as free.
fn resolve_locked(
    conn: &mut PgConnection,
    restaurant: &models::Restaurant,
    slot: &SlotRequest,
    exclude: Option<Uuid>,
    now: chrono::NaiveDateTime,
) -> Result<Uuid, ResolveLockError> {
    let tables = schema::dining_tables::table
        .select(models::DiningTable::as_select())
        .filter(schema::dining_tables::restaurant_id.eq(&restaurant.id))
        .filter(schema::dining_tables::capacity.ge(slot.party_size))
        .order((
            schema::dining_tables::capacity.asc(),
            schema::dining_tables::id.asc(),
        ))
        .for_update()
        .load::<models::DiningTable>(conn)?;

    let booked = schema::reservations::table
        .select(models::Reservation::as_select())
        .filter(schema::reservations::restaurant_id.eq(&restaurant.id))
        .filter(schema::reservations::reservation_date.eq(&slot.date))
        .filter(schema::reservations::state.eq_any(models::ACTIVE_STATES))
        .load::<models::Reservation>(conn)?;

    let candidates = tables
        .iter()
        .map(|t| CandidateTable {
            id: t.id,
            capacity: t.capacity,
        })
        .collect::<Vec<_>>();
    let active = booked
        .iter()
        .map(|r| BookedSlot {
            reservation_id: r.id,
            table_id: r.table_id,
            time: r.reservation_time,
        })
        .collect::<Vec<_>>();

    resolve_table(
        &OpeningHours {
            open_time: restaurant.open_time,
            close_time: restaurant.close_time,
        },
        &candidates,
        &active,
        now,
        slot,
        exclude,
    )
    .map_err(ResolveLockError::Resolve)
}

enum TransitionError {
    NotFound,
    Forbidden,
    UnsupportedStateTransition,
    Unexpected,
}

impl From<diesel::result::Error> for TransitionError {
    fn from(_: diesel::result::Error) -> Self {
        TransitionError::Unexpected
    }
}

/// Runs a state transition under a row lock on the reservation.
fn transition<F>(resid: Uuid, apply: F) -> Result<models::Reservation, Status>
where
    F: FnOnce(
        models::Reservation,
        &mut PgConnection,
    ) -> Result<models::Reservation, TransitionError>,
{
    let conn = &mut establish_connection();
    conn.transaction(|conn| {
        let reservation = match schema::reservations::table
            .find(&resid)
            .select(models::Reservation::as_select())
            .for_update()
            .first::<models::Reservation>(conn)
        {
            Ok(reservation) => reservation,
            Err(NotFound) => return Err(TransitionError::NotFound),
            Err(_) => return Err(TransitionError::Unexpected),
        };

        apply(reservation, conn)
    })
    .map_err(|err| match err {
        TransitionError::NotFound => Status::not_found("Reservation not found"),
        TransitionError::Forbidden => Status::permission_denied("Not the reservation owner"),
        TransitionError::UnsupportedStateTransition => {
            Status::failed_precondition("Unsupported state transition")
        }
        TransitionError::Unexpected => Status::internal("Failed to update reservation"),
    })
}

fn set_state(
    conn: &mut PgConnection,
    reservation: models::Reservation,
    next: models::ReservationState,
) -> Result<models::Reservation, diesel::result::Error> {
    update(schema::reservations::table)
        .set((
            schema::reservations::state.eq(next),
            schema::reservations::updated_at.eq(Utc::now()),
        ))
        .filter(schema::reservations::id.eq(&reservation.id))
        .returning(models::Reservation::as_returning())
        .get_result::<models::Reservation>(conn)
}

fn parse_slot(date: &str, time: &str, party_size: i32) -> Result<SlotRequest, Status> {
    let date =
        parse_date(date).ok_or(Status::invalid_argument("Invalid reservation date"))?;
    let time =
        parse_time_of_day(time).ok_or(Status::invalid_argument("Invalid reservation time"))?;
    if party_size < 1 {
        return Err(Status::invalid_argument("Party size must be at least 1"));
    }

    Ok(SlotRequest {
        date,
        time,
        party_size,
    })
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

fn serialize_resolve_error(err: ResolveError) -> Status {
    match err {
        ResolveError::InvalidTiming(err) => Status::invalid_argument(err.to_string()),
        ResolveError::NoAvailability => Status::resource_exhausted(NO_AVAILABILITY_MESSAGE),
    }
}

fn serialize_reservation(reservation: &models::Reservation) -> Reservation {
    Reservation {
        id: reservation.id.to_string(),
        diner_id: reservation.diner_id.to_string(),
        restaurant_id: reservation.restaurant_id.to_string(),
        table_id: reservation.table_id.to_string(),
        reservation_date: reservation.reservation_date.format(DATE_FORMAT).to_string(),
        reservation_time: reservation.reservation_time.format("%H:%M").to_string(),
        party_size: reservation.party_size,
        state: ReservationState::from(reservation.state).into(),
        notes: reservation.notes.clone(),
        created_at: Some(Timestamp {
            seconds: reservation.created_at.timestamp(),
            nanos: reservation.created_at.timestamp_subsec_nanos() as i32,
        }),
    }
}

pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut conn = establish_connection();
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run migrations");

    let addr = "0.0.0.0:8203".parse().unwrap();
    let reservation_service = ReservationServiceImpl::default();

    let (mut health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<ReservationServiceServer<ReservationServiceImpl>>()
        .await;

    println!("listening on {}", addr);

    Server::builder()
        .add_service(health_service)
        .add_service(ReservationServiceServer::new(reservation_service))
        .serve(addr)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability::TimingError;

    #[test]
    fn parse_slot_accepts_iso_date_and_short_time() {
        let slot = parse_slot("2024-06-01", "18:30", 2).unwrap();
        assert_eq!(slot.date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(slot.time, NaiveTime::from_hms_opt(18, 30, 0).unwrap());
        assert_eq!(slot.party_size, 2);
    }

    #[test]
    fn parse_slot_rejects_bad_input() {
        assert!(parse_slot("06/01/2024", "18:30", 2).is_err());
        assert!(parse_slot("2024-06-01", "half past six", 2).is_err());
        assert!(parse_slot("2024-06-01", "18:30", 0).is_err());
    }

    #[test]
    fn resolve_errors_map_to_distinct_statuses() {
        let status = serialize_resolve_error(ResolveError::InvalidTiming(TimingError::DateInPast));
        assert_eq!(status.code(), tonic::Code::InvalidArgument);

        let status = serialize_resolve_error(ResolveError::NoAvailability);
        assert_eq!(status.code(), tonic::Code::ResourceExhausted);
        assert!(status.message().contains("another date or time"));
    }

    #[test]
    fn serialize_reservation_maps_fields() {
        let reservation = models::Reservation {
            id: Uuid::from_u128(1),
            sequence: 42,
            diner_id: Uuid::from_u128(2),
            restaurant_id: Uuid::from_u128(3),
            table_id: Uuid::from_u128(4),
            reservation_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            reservation_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            party_size: 3,
            state: models::ReservationState::Confirmed,
            notes: "window seat".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let serialized = serialize_reservation(&reservation);
        assert_eq!(serialized.reservation_date, "2024-06-01");
        assert_eq!(serialized.reservation_time, "18:00");
        assert_eq!(serialized.state, ReservationState::Confirmed as i32);
        assert_eq!(serialized.party_size, 3);
    }
}
