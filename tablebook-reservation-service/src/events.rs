use crate::schema;
use crate::{models, models::NewOutbox, EVENT_CHANNEL};
use diesel::{prelude::*, PgConnection};
use prost::Message;
use tablebook_proto::reservation_service::{
    reservation_event, ReservationCancelledEvent, ReservationCompletedEvent,
    ReservationConfirmedEvent, ReservationCreatedEvent, ReservationEvent,
    ReservationRevisedEvent,
};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

pub struct ReservationEventPublisher<'a> {
    conn: &'a mut PgConnection,
}

impl<'a> ReservationEventPublisher<'a> {
    pub fn new(conn: &'a mut PgConnection) -> Self {
        Self { conn }
    }

    pub fn reservation_created(&mut self, reservation: &models::Reservation) {
        let event = ReservationEvent {
            event: Some(reservation_event::Event::ReservationCreated(
                ReservationCreatedEvent {
                    id: reservation.id.to_string(),
                    diner_id: reservation.diner_id.to_string(),
                    restaurant_id: reservation.restaurant_id.to_string(),
                    table_id: reservation.table_id.to_string(),
                    reservation_date: reservation
                        .reservation_date
                        .format(DATE_FORMAT)
                        .to_string(),
                    reservation_time: reservation
                        .reservation_time
                        .format(TIME_FORMAT)
                        .to_string(),
                    party_size: reservation.party_size,
                },
            )),
        };
        self.push(reservation, &event);
    }

    pub fn reservation_revised(&mut self, reservation: &models::Reservation) {
        let event = ReservationEvent {
            event: Some(reservation_event::Event::ReservationRevised(
                ReservationRevisedEvent {
                    id: reservation.id.to_string(),
                    table_id: reservation.table_id.to_string(),
                    reservation_date: reservation
                        .reservation_date
                        .format(DATE_FORMAT)
                        .to_string(),
                    reservation_time: reservation
                        .reservation_time
                        .format(TIME_FORMAT)
                        .to_string(),
                    party_size: reservation.party_size,
                },
            )),
        };
        self.push(reservation, &event);
    }

    pub fn reservation_confirmed(&mut self, reservation: &models::Reservation) {
        let event = ReservationEvent {
            event: Some(reservation_event::Event::ReservationConfirmed(
                ReservationConfirmedEvent {
                    id: reservation.id.to_string(),
                },
            )),
        };
        self.push(reservation, &event);
    }

    pub fn reservation_cancelled(&mut self, reservation: &models::Reservation) {
        let event = ReservationEvent {
            event: Some(reservation_event::Event::ReservationCancelled(
                ReservationCancelledEvent {
                    id: reservation.id.to_string(),
                },
            )),
        };
        self.push(reservation, &event);
    }

    pub fn reservation_completed(&mut self, reservation: &models::Reservation) {
        let event = ReservationEvent {
            event: Some(reservation_event::Event::ReservationCompleted(
                ReservationCompletedEvent {
                    id: reservation.id.to_string(),
                },
            )),
        };
        self.push(reservation, &event);
    }

    fn push(&mut self, reservation: &models::Reservation, event: &ReservationEvent) {
        let mut buf = Vec::new();
        event.encode(&mut buf).unwrap();

        let _ = diesel::insert_into(schema::outbox::table)
            .values(NewOutbox {
                topic: EVENT_CHANNEL.to_string(),
                key: reservation.restaurant_id.to_string(),
                value: buf,
            })
            .execute(self.conn);
    }
}
