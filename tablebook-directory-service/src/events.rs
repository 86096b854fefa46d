use crate::schema;
use crate::{models, models::NewOutbox, EVENT_CHANNEL};
use diesel::{prelude::*, PgConnection};
use prost::Message;
use tablebook_proto::directory_service::{
    restaurant_event, RestaurantCreatedEvent, RestaurantEvent, RestaurantUpdatedEvent,
    TableCreatedEvent, TableUpdatedEvent,
};

const TIME_FORMAT: &str = "%H:%M";

pub struct RestaurantEventPublisher<'a> {
    conn: &'a mut PgConnection,
}

impl<'a> RestaurantEventPublisher<'a> {
    pub fn new(conn: &'a mut PgConnection) -> Self {
        Self { conn }
    }

    pub fn restaurant_created(&mut self, restaurant: &models::Restaurant) {
        let event = RestaurantEvent {
            event: Some(restaurant_event::Event::RestaurantCreated(
                RestaurantCreatedEvent {
                    id: restaurant.id.to_string(),
                    name: restaurant.name.clone(),
                    open_time: restaurant.open_time.format(TIME_FORMAT).to_string(),
                    close_time: restaurant.close_time.format(TIME_FORMAT).to_string(),
                },
            )),
        };
        self.push(restaurant.id.to_string(), &event);
    }

    pub fn restaurant_updated(&mut self, restaurant: &models::Restaurant) {
        let event = RestaurantEvent {
            event: Some(restaurant_event::Event::RestaurantUpdated(
                RestaurantUpdatedEvent {
                    id: restaurant.id.to_string(),
                    name: restaurant.name.clone(),
                    open_time: restaurant.open_time.format(TIME_FORMAT).to_string(),
                    close_time: restaurant.close_time.format(TIME_FORMAT).to_string(),
                },
            )),
        };
        self.push(restaurant.id.to_string(), &event);
    }

    pub fn table_created(&mut self, table: &models::DiningTable) {
        let event = RestaurantEvent {
            event: Some(restaurant_event::Event::TableCreated(TableCreatedEvent {
                id: table.id.to_string(),
                restaurant_id: table.restaurant_id.to_string(),
                capacity: table.capacity,
            })),
        };
        self.push(table.restaurant_id.to_string(), &event);
    }

    pub fn table_updated(&mut self, table: &models::DiningTable) {
        let event = RestaurantEvent {
            event: Some(restaurant_event::Event::TableUpdated(TableUpdatedEvent {
                id: table.id.to_string(),
                capacity: table.capacity,
            })),
        };
        self.push(table.restaurant_id.to_string(), &event);
    }

    fn push(&mut self, key: String, event: &RestaurantEvent) {
        let mut buf = Vec::new();
        event.encode(&mut buf).unwrap();

        let _ = diesel::insert_into(schema::outbox::table)
            .values(NewOutbox {
                topic: EVENT_CHANNEL.to_string(),
                key,
                value: buf,
            })
            .execute(self.conn);
    }
}
