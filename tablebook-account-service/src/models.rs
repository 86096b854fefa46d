use std::io::Write;

use chrono::{DateTime, Utc};
use diesel::{
    deserialize::{self, FromSql, FromSqlRow},
    expression::AsExpression,
    pg::{Pg, PgValue},
    prelude::*,
    serialize::{self, IsNull, Output, ToSql},
};
use uuid::Uuid;

use crate::schema::{accounts, outbox, subscriptions};

#[derive(FromSqlRow, AsExpression, PartialEq, Eq, Copy, Clone, Debug)]
#[diesel(sql_type = crate::schema::sql_types::SubscriptionStatus)]
pub enum SubscriptionStatus {
    Active,
    Canceled,
    PastDue,
    Incomplete,
    Trialing,
}

impl SubscriptionStatus {
    /// The paid tier is open while the processor reports the subscription
    /// as active or in trial.
    pub fn grants_paid_membership(&self) -> bool {
        matches!(self, SubscriptionStatus::Active | SubscriptionStatus::Trialing)
    }
}

impl ToSql<crate::schema::sql_types::SubscriptionStatus, Pg> for SubscriptionStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        match *self {
            SubscriptionStatus::Active => out.write_all(b"ACTIVE")?,
            SubscriptionStatus::Canceled => out.write_all(b"CANCELED")?,
            SubscriptionStatus::PastDue => out.write_all(b"PAST_DUE")?,
            SubscriptionStatus::Incomplete => out.write_all(b"INCOMPLETE")?,
            SubscriptionStatus::Trialing => out.write_all(b"TRIALING")?,
        }
        Ok(IsNull::No)
    }
}

impl FromSql<crate::schema::sql_types::SubscriptionStatus, Pg> for SubscriptionStatus {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"ACTIVE" => Ok(SubscriptionStatus::Active),
            b"CANCELED" => Ok(SubscriptionStatus::Canceled),
            b"PAST_DUE" => Ok(SubscriptionStatus::PastDue),
            b"INCOMPLETE" => Ok(SubscriptionStatus::Incomplete),
            b"TRIALING" => Ok(SubscriptionStatus::Trialing),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

impl From<tablebook_proto::account_service::SubscriptionStatus> for SubscriptionStatus {
    fn from(s: tablebook_proto::account_service::SubscriptionStatus) -> Self {
        match s {
            tablebook_proto::account_service::SubscriptionStatus::Active => {
                SubscriptionStatus::Active
            }
            tablebook_proto::account_service::SubscriptionStatus::Canceled => {
                SubscriptionStatus::Canceled
            }
            tablebook_proto::account_service::SubscriptionStatus::PastDue => {
                SubscriptionStatus::PastDue
            }
            tablebook_proto::account_service::SubscriptionStatus::Incomplete => {
                SubscriptionStatus::Incomplete
            }
            tablebook_proto::account_service::SubscriptionStatus::Trialing => {
                SubscriptionStatus::Trialing
            }
        }
    }
}

impl From<SubscriptionStatus> for tablebook_proto::account_service::SubscriptionStatus {
    fn from(s: SubscriptionStatus) -> Self {
        match s {
            SubscriptionStatus::Active => {
                tablebook_proto::account_service::SubscriptionStatus::Active
            }
            SubscriptionStatus::Canceled => {
                tablebook_proto::account_service::SubscriptionStatus::Canceled
            }
            SubscriptionStatus::PastDue => {
                tablebook_proto::account_service::SubscriptionStatus::PastDue
            }
            SubscriptionStatus::Incomplete => {
                tablebook_proto::account_service::SubscriptionStatus::Incomplete
            }
            SubscriptionStatus::Trialing => {
                tablebook_proto::account_service::SubscriptionStatus::Trialing
            }
        }
    }
}

#[derive(Queryable, Selectable, Identifiable, Insertable, Debug, PartialEq)]
#[diesel(table_name = accounts)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub paid_member: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Insertable, AsChangeset, Debug, PartialEq)]
#[diesel(belongs_to(Account))]
#[diesel(table_name = subscriptions, primary_key(account_id))]
pub struct Subscription {
    pub account_id: Uuid,
    pub processor_customer_id: String,
    pub processor_subscription_id: String,
    pub status: SubscriptionStatus,
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
    fn paid_membership_follows_processor_status() {
        assert!(SubscriptionStatus::Active.grants_paid_membership());
        assert!(SubscriptionStatus::Trialing.grants_paid_membership());
        assert!(!SubscriptionStatus::Canceled.grants_paid_membership());
        assert!(!SubscriptionStatus::PastDue.grants_paid_membership());
        assert!(!SubscriptionStatus::Incomplete.grants_paid_membership());
    }
}
