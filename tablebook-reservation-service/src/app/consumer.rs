use std::{env, thread::sleep, time::Duration};

use chrono::NaiveTime;
use diesel::{dsl::insert_into, prelude::*, PgConnection};
use dotenvy::dotenv;
use kafka::{
    client::{FetchOffset, GroupOffsetStorage},
    consumer::Consumer,
};
use prost::Message;
use tablebook_proto::account_service::{account_event, AccountEvent};
use tablebook_proto::directory_service::{restaurant_event, RestaurantEvent};
use uuid::Uuid;

use crate::{establish_connection, models, schema};

const GROUP: &str = "reservation-service";

const RESTAURANT_EVENT_TOPIC: &str = "restaurant.event";
const ACCOUNT_EVENT_TOPIC: &str = "account.event";

enum Topic {
    RestaurantEvent(RestaurantEvent),
    AccountEvent(AccountEvent),
}

impl Topic {
    fn from(topic: &str, value: &[u8]) -> Option<Self> {
        match topic {
            RESTAURANT_EVENT_TOPIC => Some(Topic::RestaurantEvent(
                RestaurantEvent::decode(value).expect("Cannot decode restaurant event"),
            )),
            ACCOUNT_EVENT_TOPIC => Some(Topic::AccountEvent(
                AccountEvent::decode(value).expect("Cannot decode account event"),
            )),
            _ => None,
        }
    }

    fn process(self, conn: &mut PgConnection) {
        match self {
            Topic::RestaurantEvent(restaurant_event) => match restaurant_event.event.unwrap() {
                restaurant_event::Event::RestaurantCreated(event) => {
                    upsert_restaurant(
                        conn,
                        &event.id,
                        &event.name,
                        &event.open_time,
                        &event.close_time,
                    );
                }
                restaurant_event::Event::RestaurantUpdated(event) => {
                    upsert_restaurant(
                        conn,
                        &event.id,
                        &event.name,
                        &event.open_time,
                        &event.close_time,
                    );
                }
                restaurant_event::Event::TableCreated(event) => {
                    use schema::dining_tables::dsl::*;

                    let table = models::DiningTable {
                        id: event.id.parse::<Uuid>().unwrap(),
                        restaurant_id: event.restaurant_id.parse::<Uuid>().unwrap(),
                        capacity: event.capacity,
                    };

                    insert_into(dining_tables)
                        .values(&table)
                        .on_conflict(id)
                        .do_update()
                        .set(capacity.eq(table.capacity))
                        .execute(conn)
                        .expect("Error while create dining table");
                }
                restaurant_event::Event::TableUpdated(event) => {
                    use schema::dining_tables::dsl::*;

                    let tid = event.id.parse::<Uuid>().unwrap();
                    diesel::update(dining_tables)
                        .set(capacity.eq(event.capacity))
                        .filter(id.eq(tid))
                        .execute(conn)
                        .expect("Error while update dining table");
                }
            },
            Topic::AccountEvent(account_event) => match account_event.event.unwrap() {
                account_event::Event::AccountCreated(event) => {
                    use schema::diners::dsl::*;

                    let diner = models::Diner {
                        id: event.id.parse::<Uuid>().unwrap(),
                        name: event.name,
                        paid_member: event.paid_member,
                    };

                    insert_into(diners)
                        .values(&diner)
                        .on_conflict(id)
                        .do_update()
                        .set((
                            name.eq(&diner.name),
                            paid_member.eq(diner.paid_member),
                        ))
                        .execute(conn)
                        .expect("Error while create diner");
                }
                account_event::Event::MembershipChanged(event) => {
                    use schema::diners::dsl::*;

                    let did = event.id.parse::<Uuid>().unwrap();
                    diesel::update(diners)
                        .set(paid_member.eq(event.paid_member))
                        .filter(id.eq(did))
                        .execute(conn)
                        .expect("Error while update diner membership");
                }
            },
        }
    }
}

fn upsert_restaurant(
    conn: &mut PgConnection,
    event_id: &str,
    event_name: &str,
    event_open: &str,
    event_close: &str,
) {
    use schema::restaurants::dsl::*;

    let restaurant = models::Restaurant {
        id: event_id.parse::<Uuid>().unwrap(),
        name: event_name.to_string(),
        open_time: parse_event_time(event_open),
        close_time: parse_event_time(event_close),
    };

    insert_into(restaurants)
        .values(&restaurant)
        .on_conflict(id)
        .do_update()
        .set((
            name.eq(&restaurant.name),
            open_time.eq(restaurant.open_time),
            close_time.eq(restaurant.close_time),
        ))
        .execute(conn)
        .expect("Error while upsert restaurant");
}

fn parse_event_time(value: &str) -> NaiveTime {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .expect("Cannot parse time of day")
}

pub fn main() {
    dotenv().ok();
    let kafka_url = env::var("KAFKA_URL").expect("KAFKA_URL must be set");

    let mut conn = establish_connection();
    let mut consumer = Consumer::from_hosts(vec![kafka_url])
        .with_topic(RESTAURANT_EVENT_TOPIC.to_string())
        .with_topic(ACCOUNT_EVENT_TOPIC.to_string())
        .with_group(GROUP.to_string())
        .with_fallback_offset(FetchOffset::Earliest)
        .with_offset_storage(Some(GroupOffsetStorage::Kafka))
        .create()
        .unwrap();

    loop {
        let mss = consumer.poll().expect("Cannot poll messages");
        if mss.is_empty() {
            sleep(Duration::from_secs(1));
            continue;
        }

        for ms in mss.iter() {
            for m in ms.messages() {
                if let Some(topic) = Topic::from(ms.topic(), m.value) {
                    topic.process(&mut conn);
                }
            }
            let _ = consumer.consume_messageset(ms);
        }
        consumer
            .commit_consumed()
            .expect("Error while commit consumed");
    }
}
