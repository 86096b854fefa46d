use chrono::Utc;
use diesel::dsl::{insert_into, update};
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use diesel::result::Error::{DatabaseError, NotFound};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use prost_types::Timestamp;
use tonic::transport::Server;
use tonic::{Request, Response, Status};
use uuid::Uuid;

use tablebook_proto::account_service::account_service_server::{
    AccountService, AccountServiceServer,
};
use tablebook_proto::account_service::{
    Account, ActivateSubscriptionPayload, CreateAccountPayload, GetAccountPayload, Subscription,
    SubscriptionStatus, UpdateSubscriptionStatusPayload,
};

use crate::events::AccountEventPublisher;
use crate::{establish_connection, models, schema};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

#[derive(Default)]
pub struct AccountServiceImpl {}

#[tonic::async_trait]
impl AccountService for AccountServiceImpl {
    async fn create_account(
        &self,
        request: Request<CreateAccountPayload>,
    ) -> Result<Response<Account>, Status> {
        use schema::accounts::dsl::*;

        let payload = request.into_inner();
        if payload.email.is_empty() {
            return Err(Status::invalid_argument("Email required"));
        }
        if payload.name.is_empty() {
            return Err(Status::invalid_argument("Name required"));
        }

        let account = models::Account {
            id: Uuid::new_v4(),
            email: payload.email,
            name: payload.name,
            paid_member: false,
            created_at: Utc::now(),
        };

        let conn = &mut establish_connection();
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            insert_into(accounts).values(&account).execute(conn)?;

            let mut publisher = AccountEventPublisher::new(conn);
            publisher.account_created(&account);

            Ok(())
        })
        .map_err(|err| match err {
            DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                Status::already_exists("Email already registered")
            }
            _ => Status::internal("Failed to create account"),
        })?;

        Ok(Response::new(serialize_account(&account)))
    }

    async fn get_account(
        &self,
        request: Request<GetAccountPayload>,
    ) -> Result<Response<Account>, Status> {
        use schema::accounts::dsl::*;

        let payload = request.into_inner();
        let aid = payload
            .account_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid account id"))?;

        let conn = &mut establish_connection();
        let account = match accounts
            .find(&aid)
            .select(models::Account::as_select())
            .first::<models::Account>(conn)
        {
            Ok(account) => account,
            Err(NotFound) => return Err(Status::not_found("Account not found")),
            Err(_) => return Err(Status::internal("Cannot fetch account")),
        };

        Ok(Response::new(serialize_account(&account)))
    }

    async fn activate_subscription(
        &self,
        request: Request<ActivateSubscriptionPayload>,
    ) -> Result<Response<Subscription>, Status> {
        let payload = request.into_inner();
        let aid = payload
            .account_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid account id"))?;

        let subscription = models::Subscription {
            account_id: aid,
            processor_customer_id: payload.processor_customer_id,
            processor_subscription_id: payload.processor_subscription_id,
            status: models::SubscriptionStatus::Active,
        };

        enum Error {
            NotFound,
            Unexpected,
        }

        impl From<diesel::result::Error> for Error {
            fn from(err: diesel::result::Error) -> Self {
                match err {
                    NotFound => Error::NotFound,
                    _ => Error::Unexpected,
                }
            }
        }

        let conn = &mut establish_connection();
        conn.transaction(|conn| {
            let account = schema::accounts::table
                .find(&aid)
                .select(models::Account::as_select())
                .for_update()
                .first::<models::Account>(conn)?;

            insert_into(schema::subscriptions::table)
                .values(&subscription)
                .on_conflict(schema::subscriptions::account_id)
                .do_update()
                .set(&subscription)
                .execute(conn)?;

            if !account.paid_member {
                update(schema::accounts::table)
                    .set(schema::accounts::paid_member.eq(true))
                    .filter(schema::accounts::id.eq(&aid))
                    .execute(conn)?;

                let mut publisher = AccountEventPublisher::new(conn);
                publisher.membership_changed(aid, true);
            }

            Ok(())
        })
        .map_err(|err| match err {
            Error::NotFound => Status::not_found("Account not found"),
            Error::Unexpected => Status::internal("Failed to activate subscription"),
        })?;

        Ok(Response::new(serialize_subscription(&subscription)))
    }

    async fn update_subscription_status(
        &self,
        request: Request<UpdateSubscriptionStatusPayload>,
    ) -> Result<Response<Subscription>, Status> {
        let payload = request.into_inner();
        let aid = payload
            .account_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid account id"))?;
        let status = SubscriptionStatus::try_from(payload.status)
            .map_err(|_| Status::invalid_argument("Invalid subscription status"))?;
        let status = models::SubscriptionStatus::from(status);

        enum Error {
            NotFound,
            Unexpected,
        }

        impl From<diesel::result::Error> for Error {
            fn from(err: diesel::result::Error) -> Self {
                match err {
                    NotFound => Error::NotFound,
                    _ => Error::Unexpected,
                }
            }
        }

        let conn = &mut establish_connection();
        let subscription = conn
            .transaction(|conn| {
                let mut subscription = schema::subscriptions::table
                    .find(&aid)
                    .select(models::Subscription::as_select())
                    .for_update()
                    .first::<models::Subscription>(conn)?;
                let account = schema::accounts::table
                    .find(&aid)
                    .select(models::Account::as_select())
                    .for_update()
                    .first::<models::Account>(conn)?;

                update(schema::subscriptions::table)
                    .set(schema::subscriptions::status.eq(status))
                    .filter(schema::subscriptions::account_id.eq(&aid))
                    .execute(conn)?;
                subscription.status = status;

                let paid = status.grants_paid_membership();
                if account.paid_member != paid {
                    update(schema::accounts::table)
                        .set(schema::accounts::paid_member.eq(paid))
                        .filter(schema::accounts::id.eq(&aid))
                        .execute(conn)?;

                    let mut publisher = AccountEventPublisher::new(conn);
                    publisher.membership_changed(aid, paid);
                }

                Ok(subscription)
            })
            .map_err(|err| match err {
                Error::NotFound => Status::not_found("Subscription not found"),
                Error::Unexpected => Status::internal("Failed to update subscription"),
            })?;

        Ok(Response::new(serialize_subscription(&subscription)))
    }
}

fn serialize_account(account: &models::Account) -> Account {
    Account {
        id: account.id.to_string(),
        email: account.email.clone(),
        name: account.name.clone(),
        paid_member: account.paid_member,
        created_at: Some(Timestamp {
            seconds: account.created_at.timestamp(),
            nanos: account.created_at.timestamp_subsec_nanos() as i32,
        }),
    }
}

fn serialize_subscription(subscription: &models::Subscription) -> Subscription {
    Subscription {
        account_id: subscription.account_id.to_string(),
        processor_customer_id: subscription.processor_customer_id.clone(),
        processor_subscription_id: subscription.processor_subscription_id.clone(),
        status: SubscriptionStatus::from(subscription.status).into(),
    }
}

pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut conn = establish_connection();
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run migrations");

    let addr = "0.0.0.0:8201".parse().unwrap();
    let account_service = AccountServiceImpl::default();

    let (mut health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<AccountServiceServer<AccountServiceImpl>>()
        .await;

    println!("listening on {}", addr);

    Server::builder()
        .add_service(health_service)
        .add_service(AccountServiceServer::new(account_service))
        .serve(addr)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_account_maps_fields() {
        let account = models::Account {
            id: Uuid::new_v4(),
            email: "diner@example.com".to_string(),
            name: "Diner".to_string(),
            paid_member: true,
            created_at: Utc::now(),
        };

        let serialized = serialize_account(&account);
        assert_eq!(serialized.id, account.id.to_string());
        assert_eq!(serialized.email, "diner@example.com");
        assert!(serialized.paid_member);
        assert_eq!(
            serialized.created_at.unwrap().seconds,
            account.created_at.timestamp()
        );
    }

    #[test]
    fn serialize_subscription_maps_status() {
        let subscription = models::Subscription {
            account_id: Uuid::new_v4(),
            processor_customer_id: "cus_123".to_string(),
            processor_subscription_id: "sub_456".to_string(),
            status: models::SubscriptionStatus::Trialing,
        };

        let serialized = serialize_subscription(&subscription);
        assert_eq!(serialized.status, SubscriptionStatus::Trialing as i32);
    }
}
