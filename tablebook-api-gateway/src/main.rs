use axum::Router;
use dotenvy::dotenv;
use tablebook_proto::{
    account_service::account_service_client::AccountServiceClient,
    directory_service::directory_service_client::DirectoryServiceClient,
    reservation_service::reservation_service_client::ReservationServiceClient,
};
use tower_http::cors::CorsLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod error;
mod handlers;
mod models;

use handlers::{account_router, directory_router, reservation_router, ApiDoc, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let account_service_endpoint =
        std::env::var("ACCOUNT_SERVICE_ENDPOINT").expect("ACCOUNT_SERVICE_ENDPOINT required");
    let directory_service_endpoint =
        std::env::var("DIRECTORY_SERVICE_ENDPOINT").expect("DIRECTORY_SERVICE_ENDPOINT required");
    let reservation_service_endpoint = std::env::var("RESERVATION_SERVICE_ENDPOINT")
        .expect("RESERVATION_SERVICE_ENDPOINT required");

    let account_client = AccountServiceClient::connect(account_service_endpoint).await?;
    let directory_client = DirectoryServiceClient::connect(directory_service_endpoint).await?;
    let reservation_client =
        ReservationServiceClient::connect(reservation_service_endpoint).await?;

    let state = AppState {
        account_client,
        directory_client,
        reservation_client,
    };

    let app = Router::new()
        .merge(account_router())
        .merge(directory_router())
        .merge(reservation_router())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8200").await?;
    info!("API Gateway listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
