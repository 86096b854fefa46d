use std::env;
use std::{thread::sleep, time::Duration};

use diesel::result::Error as DieselError;
use diesel::{
    Connection, ExpressionMethods, PgConnection, QueryDsl, RunQueryDsl, SelectableHelper,
};
use dotenvy::dotenv;
use kafka::client::RequiredAcks;
use kafka::producer::{Producer, Record};

use crate::models::Outbox;
use crate::{establish_connection, schema};

/// Drains the outbox one row per transaction; the row lock keeps multiple
/// relay processes from publishing the same event.
struct OutboxRelay {
    kafka: Producer,
}

impl OutboxRelay {
    fn relay_next_row(&mut self, conn: &mut PgConnection) -> Result<bool, RelayError> {
        use schema::outbox::dsl::*;

        conn.transaction::<_, RelayError, _>(|conn| {
            let row = match outbox
                .select(Outbox::as_select())
                .order(schema::outbox::id.asc())
                .for_update()
                .skip_locked()
                .first::<Outbox>(conn)
            {
                Ok(row) => row,
                Err(DieselError::NotFound) => return Ok(false),
                Err(err) => return Err(RelayError::Database(err)),
            };

            self.publish(&row).map_err(RelayError::Kafka)?;

            diesel::delete(outbox.filter(schema::outbox::id.eq(row.id)))
                .execute(conn)
                .map_err(RelayError::Database)?;

            Ok(true)
        })
    }

    fn publish(&mut self, row: &Outbox) -> Result<(), kafka::Error> {
        self.kafka.send(&Record::from_key_value(
            &row.topic,
            row.key.clone(),
            row.value.clone(),
        ))
    }
}

pub fn main() {
    dotenv().ok();
    let kafka_url = env::var("KAFKA_URL").expect("KAFKA_URL must be set");

    let conn = &mut establish_connection();
    let kafka = Producer::from_hosts(vec![kafka_url])
        .with_ack_timeout(Duration::from_secs(1))
        .with_required_acks(RequiredAcks::One)
        .create()
        .unwrap();

    let mut relay = OutboxRelay { kafka };

    loop {
        match relay.relay_next_row(conn) {
            Ok(true) => {}
            Ok(false) => {
                sleep(Duration::from_secs(1));
            }
            Err(err) => {
                eprintln!("Error relaying outbox row: {:?}", err);
                sleep(Duration::from_secs(1));
            }
        }
    }
}

#[derive(Debug)]
pub enum RelayError {
    Database(DieselError),
    Kafka(kafka::Error),
}

impl From<DieselError> for RelayError {
    fn from(err: DieselError) -> Self {
        RelayError::Database(err)
    }
}
