pub mod account;
pub mod directory;
pub mod reservation;

// Re-export routers for easier importing
pub use account::router as account_router;
pub use directory::router as directory_router;
pub use reservation::router as reservation_router;

use axum::http::HeaderMap;
use tablebook_proto::directory_service::directory_service_client::DirectoryServiceClient;
use tablebook_proto::directory_service::IsRestaurantOperatorPayload;
use tonic::transport::Channel;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub account_client:
        tablebook_proto::account_service::account_service_client::AccountServiceClient<Channel>,
    pub directory_client: DirectoryServiceClient<Channel>,
    pub reservation_client:
        tablebook_proto::reservation_service::reservation_service_client::ReservationServiceClient<
            Channel,
        >,
}

/// Set by the authenticating proxy in front of the gateway; session and
/// token mechanics live outside this service.
pub const PRINCIPAL_HEADER: &str = "x-account-id";

fn extract_account_id(headers: &HeaderMap) -> Result<Uuid, ApiError> {
    let value = headers
        .get(PRINCIPAL_HEADER)
        .ok_or(ApiError::AuthenticationRequired)?
        .to_str()
        .map_err(|_| ApiError::InvalidPrincipal)?;
    value.parse::<Uuid>().map_err(|_| ApiError::InvalidPrincipal)
}

async fn verify_restaurant_operator(
    directory_client: &DirectoryServiceClient<Channel>,
    restaurant_id: &str,
    account_id: Uuid,
) -> Result<(), ApiError> {
    let mut client = directory_client.clone();

    let request = tonic::Request::new(IsRestaurantOperatorPayload {
        restaurant_id: restaurant_id.to_string(),
        account_id: account_id.to_string(),
    });
    let response = client.is_restaurant_operator(request).await?;

    if response.into_inner().operator {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "Not an operator of this restaurant".to_string(),
        ))
    }
}

fn serialize_timestamp(timestamp: Option<prost_types::Timestamp>) -> String {
    timestamp
        .and_then(|ts| chrono::DateTime::from_timestamp(ts.seconds, ts.nanos as u32))
        .unwrap_or_else(chrono::Utc::now)
        .to_rfc3339()
}

#[derive(OpenApi)]
#[openapi(
    paths(
        account::create_account,
        account::get_my_account,
        account::activate_subscription,
        account::cancel_subscription,
        directory::create_company,
        directory::create_category,
        directory::list_categories,
        directory::create_restaurant,
        directory::list_restaurants,
        directory::get_restaurant,
        directory::update_restaurant,
        directory::create_table,
        directory::list_tables,
        directory::update_table,
        directory::create_review,
        directory::list_reviews,
        directory::update_review,
        directory::delete_review,
        directory::add_favorite,
        directory::remove_favorite,
        directory::list_favorites,
        reservation::create_reservation,
        reservation::list_my_reservations,
        reservation::get_reservation,
        reservation::revise_reservation,
        reservation::cancel_reservation,
        reservation::confirm_reservation,
        reservation::complete_reservation,
        reservation::list_restaurant_reservations,
    ),
    components(schemas(
        crate::models::CreateAccountRequest,
        crate::models::AccountResponse,
        crate::models::ActivateSubscriptionRequest,
        crate::models::SubscriptionResponse,
        crate::models::CreateCompanyRequest,
        crate::models::CompanyResponse,
        crate::models::CreateCategoryRequest,
        crate::models::CategoryResponse,
        crate::models::ListCategoriesResponse,
        crate::models::RestaurantAttributesRequest,
        crate::models::CreateRestaurantRequest,
        crate::models::RestaurantResponse,
        crate::models::RestaurantDetailResponse,
        crate::models::ListRestaurantsResponse,
        crate::models::CreateTableRequest,
        crate::models::TableResponse,
        crate::models::ListTablesResponse,
        crate::models::CreateReviewRequest,
        crate::models::ReviewResponse,
        crate::models::ListReviewsResponse,
        crate::models::CreateReservationRequest,
        crate::models::ReservationResponse,
        crate::models::ReservationEdgeResponse,
        crate::models::ListReservationsResponse,
        crate::models::RestaurantReservationsResponse,
        crate::models::ApiErrorResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "accounts", description = "Diner accounts and the paid tier"),
        (name = "directory", description = "Companies, categories, restaurants, tables, reviews and favorites"),
        (name = "reservations", description = "Table reservations"),
    ),
    info(
        title = "Tablebook API Gateway",
        description = "HTTP front-end for the Tablebook services",
        version = "1.0.0"
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            use utoipa::openapi::security::*;
            components.add_security_scheme(
                "principal",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(PRINCIPAL_HEADER))),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_account_id_requires_the_header() {
        let headers = HeaderMap::new();
        assert!(matches!(
            extract_account_id(&headers),
            Err(ApiError::AuthenticationRequired)
        ));
    }

    #[test]
    fn extract_account_id_rejects_garbage() {
        let mut headers = HeaderMap::new();
        headers.insert(PRINCIPAL_HEADER, "not-a-uuid".parse().unwrap());
        assert!(matches!(
            extract_account_id(&headers),
            Err(ApiError::InvalidPrincipal)
        ));
    }

    #[test]
    fn extract_account_id_parses_a_uuid() {
        let account_id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(PRINCIPAL_HEADER, account_id.to_string().parse().unwrap());
        assert_eq!(extract_account_id(&headers).unwrap(), account_id);
    }
}
