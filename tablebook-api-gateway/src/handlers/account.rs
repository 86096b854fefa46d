use axum::{
    extract::State,
    http::HeaderMap,
    response::Json,
    routing::{get, post},
    Router,
};
use tablebook_proto::account_service::{
    ActivateSubscriptionPayload, CreateAccountPayload, GetAccountPayload, SubscriptionStatus,
    UpdateSubscriptionStatusPayload,
};
use tracing::instrument;

use crate::error::ApiError;
use crate::models::*;

use super::{extract_account_id, serialize_timestamp, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/accounts", post(create_account))
        .route("/accounts/me", get(get_my_account))
        .route(
            "/subscriptions",
            post(activate_subscription).delete(cancel_subscription),
        )
}

#[utoipa::path(
    post,
    path = "/accounts",
    request_body = CreateAccountRequest,
    responses(
        (status = 200, description = "Account created successfully", body = AccountResponse),
        (status = 400, description = "Bad request", body = ApiErrorResponse),
        (status = 409, description = "Email already registered", body = ApiErrorResponse),
        (status = 503, description = "Service unavailable", body = ApiErrorResponse),
    ),
    tag = "accounts"
)]
#[instrument(skip(state))]
pub async fn create_account(
    State(state): State<AppState>,
    Json(payload): Json<CreateAccountRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    let mut client = state.account_client.clone();

    let request = tonic::Request::new(CreateAccountPayload {
        email: payload.email,
        name: payload.name,
    });
    let account = client.create_account(request).await?.into_inner();

    Ok(Json(AccountResponse {
        id: account.id,
        email: account.email,
        name: account.name,
        paid_member: account.paid_member,
        created_at: serialize_timestamp(account.created_at),
    }))
}

#[utoipa::path(
    get,
    path = "/accounts/me",
    responses(
        (status = 200, description = "The authenticated account", body = AccountResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 404, description = "Account not found", body = ApiErrorResponse),
    ),
    security(
        ("principal" = []),
    ),
    tag = "accounts"
)]
#[instrument(skip(state))]
pub async fn get_my_account(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AccountResponse>, ApiError> {
    let account_id = extract_account_id(&headers)?;
    let mut client = state.account_client.clone();

    let request = tonic::Request::new(GetAccountPayload {
        account_id: account_id.to_string(),
    });
    let account = client.get_account(request).await?.into_inner();

    Ok(Json(AccountResponse {
        id: account.id,
        email: account.email,
        name: account.name,
        paid_member: account.paid_member,
        created_at: serialize_timestamp(account.created_at),
    }))
}

#[utoipa::path(
    post,
    path = "/subscriptions",
    request_body = ActivateSubscriptionRequest,
    responses(
        (status = 200, description = "Subscription activated", body = SubscriptionResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 404, description = "Account not found", body = ApiErrorResponse),
    ),
    security(
        ("principal" = []),
    ),
    tag = "accounts"
)]
#[instrument(skip(state))]
pub async fn activate_subscription(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ActivateSubscriptionRequest>,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    let account_id = extract_account_id(&headers)?;
    let mut client = state.account_client.clone();

    let request = tonic::Request::new(ActivateSubscriptionPayload {
        account_id: account_id.to_string(),
        processor_customer_id: payload.processor_customer_id,
        processor_subscription_id: payload.processor_subscription_id,
    });
    let subscription = client.activate_subscription(request).await?.into_inner();

    Ok(Json(serialize_subscription(subscription)))
}

#[utoipa::path(
    delete,
    path = "/subscriptions",
    responses(
        (status = 200, description = "Subscription cancelled", body = SubscriptionResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 404, description = "Subscription not found", body = ApiErrorResponse),
    ),
    security(
        ("principal" = []),
    ),
    tag = "accounts"
)]
#[instrument(skip(state))]
pub async fn cancel_subscription(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    let account_id = extract_account_id(&headers)?;
    let mut client = state.account_client.clone();

    let request = tonic::Request::new(UpdateSubscriptionStatusPayload {
        account_id: account_id.to_string(),
        status: SubscriptionStatus::Canceled as i32,
    });
    let subscription = client
        .update_subscription_status(request)
        .await?
        .into_inner();

    Ok(Json(serialize_subscription(subscription)))
}

fn serialize_subscription(
    subscription: tablebook_proto::account_service::Subscription,
) -> SubscriptionResponse {
    SubscriptionResponse {
        account_id: subscription.account_id.clone(),
        processor_customer_id: subscription.processor_customer_id.clone(),
        processor_subscription_id: subscription.processor_subscription_id.clone(),
        status: subscription_status_label(subscription.status).to_string(),
    }
}

fn subscription_status_label(status: i32) -> &'static str {
    match SubscriptionStatus::try_from(status) {
        Ok(SubscriptionStatus::Active) => "ACTIVE",
        Ok(SubscriptionStatus::Canceled) => "CANCELED",
        Ok(SubscriptionStatus::PastDue) => "PAST_DUE",
        Ok(SubscriptionStatus::Incomplete) => "INCOMPLETE",
        Ok(SubscriptionStatus::Trialing) => "TRIALING",
        Err(_) => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels_cover_the_processor_states() {
        assert_eq!(
            subscription_status_label(SubscriptionStatus::Active as i32),
            "ACTIVE"
        );
        assert_eq!(
            subscription_status_label(SubscriptionStatus::PastDue as i32),
            "PAST_DUE"
        );
        assert_eq!(subscription_status_label(999), "UNKNOWN");
    }
}
