use std::{env, thread::sleep, time::Duration};

use diesel::{dsl::insert_into, prelude::*, PgConnection};
use dotenvy::dotenv;
use kafka::{
    client::{FetchOffset, GroupOffsetStorage},
    consumer::Consumer,
};
use prost::Message;
use tablebook_proto::account_service::{account_event, AccountEvent};
use uuid::Uuid;

use crate::{establish_connection, models, schema};

const GROUP: &str = "directory-service";

const ACCOUNT_EVENT_TOPIC: &str = "account.event";

enum Topic {
    AccountEvent(AccountEvent),
}

impl Topic {
    fn from(topic: &str, value: &[u8]) -> Option<Self> {
        match topic {
            ACCOUNT_EVENT_TOPIC => Some(Topic::AccountEvent(
                AccountEvent::decode(value).expect("Cannot decode account event"),
            )),
            _ => None,
        }
    }

    fn process(self, conn: &mut PgConnection) {
        match self {
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

pub fn main() {
    dotenv().ok();
    let kafka_url = env::var("KAFKA_URL").expect("KAFKA_URL must be set");

    let mut conn = establish_connection();
    let mut consumer = Consumer::from_hosts(vec![kafka_url])
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
