use crate::schema;
use crate::{models, models::NewOutbox, EVENT_CHANNEL};
use diesel::{prelude::*, PgConnection};
use prost::Message;
use tablebook_proto::account_service::{
    account_event, AccountCreatedEvent, AccountEvent, MembershipChangedEvent,
};

pub struct AccountEventPublisher<'a> {
    conn: &'a mut PgConnection,
}

impl<'a> AccountEventPublisher<'a> {
    pub fn new(conn: &'a mut PgConnection) -> Self {
        Self { conn }
    }

    pub fn account_created(&mut self, account: &models::Account) {
        let event = AccountEvent {
            event: Some(account_event::Event::AccountCreated(AccountCreatedEvent {
                id: account.id.to_string(),
                name: account.name.clone(),
                paid_member: account.paid_member,
            })),
        };
        let mut buf = Vec::new();
        event.encode(&mut buf).unwrap();

        let _ = diesel::insert_into(schema::outbox::table)
            .values(NewOutbox {
                topic: EVENT_CHANNEL.to_string(),
                key: account.id.to_string(),
                value: buf,
            })
            .execute(self.conn);
    }

    pub fn membership_changed(&mut self, account_id: uuid::Uuid, paid_member: bool) {
        let event = AccountEvent {
            event: Some(account_event::Event::MembershipChanged(
                MembershipChangedEvent {
                    id: account_id.to_string(),
                    paid_member,
                },
            )),
        };
        let mut buf = Vec::new();
        event.encode(&mut buf).unwrap();

        let _ = diesel::insert_into(schema::outbox::table)
            .values(NewOutbox {
                topic: EVENT_CHANNEL.to_string(),
                key: account_id.to_string(),
                value: buf,
            })
            .execute(self.conn);
    }
}
