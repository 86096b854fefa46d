use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Json,
    routing::{get, post, put},
    Router,
};
use tablebook_proto::reservation_service::{
    CancelReservationPayload, CompleteReservationPayload, ConfirmReservationPayload,
    CreateReservationPayload, GetReservationPayload, ListDinerReservationsPayload,
    ListRestaurantReservationsPayload, ReservationState, ReviseReservationPayload,
};
use tracing::instrument;

use crate::error::ApiError;
use crate::models::*;

use super::{extract_account_id, serialize_timestamp, verify_restaurant_operator, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/restaurants/{id}/reservations",
            post(create_reservation).get(list_restaurant_reservations),
        )
        .route("/reservations", get(list_my_reservations))
        .route(
            "/reservations/{id}",
            get(get_reservation).put(revise_reservation),
        )
        .route("/reservations/{id}/cancel", post(cancel_reservation))
        .route(
            "/restaurants/{id}/reservations/{reservation_id}/confirm",
            post(confirm_reservation),
        )
        .route(
            "/restaurants/{id}/reservations/{reservation_id}/complete",
            post(complete_reservation),
        )
}

#[utoipa::path(
    post,
    path = "/restaurants/{id}/reservations",
    request_body = CreateReservationRequest,
    responses(
        (status = 200, description = "Reservation created with an assigned table", body = ReservationResponse),
        (status = 400, description = "Invalid date or time", body = ApiErrorResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 404, description = "Restaurant not found", body = ApiErrorResponse),
        (status = 409, description = "No table is available for the requested window", body = ApiErrorResponse),
    ),
    params(
        ("id" = String, Path, description = "Restaurant ID")
    ),
    security(
        ("principal" = []),
    ),
    tag = "reservations"
)]
#[instrument(skip(state))]
pub async fn create_reservation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(restaurant_id): Path<String>,
    Json(payload): Json<CreateReservationRequest>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let account_id = extract_account_id(&headers)?;
    let mut client = state.reservation_client.clone();

    let request = tonic::Request::new(CreateReservationPayload {
        diner_id: account_id.to_string(),
        restaurant_id,
        reservation_date: payload.reservation_date,
        reservation_time: payload.reservation_time,
        party_size: payload.party_size,
        notes: payload.notes,
    });
    let reservation = client.create_reservation(request).await?.into_inner();

    Ok(Json(serialize_reservation(reservation)))
}

#[utoipa::path(
    get,
    path = "/reservations",
    params(ReservationListQuery),
    responses(
        (status = 200, description = "The diner's reservations", body = ListReservationsResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
    ),
    security(
        ("principal" = []),
    ),
    tag = "reservations"
)]
#[instrument(skip(state))]
pub async fn list_my_reservations(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ReservationListQuery>,
) -> Result<Json<ListReservationsResponse>, ApiError> {
    let account_id = extract_account_id(&headers)?;
    let mut client = state.reservation_client.clone();

    // Default to the first page when the client sends no paging arguments.
    let first = match (query.first, query.last) {
        (None, None) => Some(10),
        (first, _) => first,
    };

    let request = tonic::Request::new(ListDinerReservationsPayload {
        diner_id: account_id.to_string(),
        after: query.after,
        before: query.before,
        first,
        last: query.last,
    });
    let response = client.list_diner_reservations(request).await?;

    Ok(Json(ListReservationsResponse {
        edges: response
            .into_inner()
            .edges
            .into_iter()
            .map(|edge| ReservationEdgeResponse {
                cursor: edge.cursor,
                node: serialize_reservation(edge.node.unwrap_or_default()),
            })
            .collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/reservations/{id}",
    responses(
        (status = 200, description = "The reservation", body = ReservationResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Not the reservation owner", body = ApiErrorResponse),
        (status = 404, description = "Reservation not found", body = ApiErrorResponse),
    ),
    params(
        ("id" = String, Path, description = "Reservation ID")
    ),
    security(
        ("principal" = []),
    ),
    tag = "reservations"
)]
#[instrument(skip(state))]
pub async fn get_reservation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(reservation_id): Path<String>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let account_id = extract_account_id(&headers)?;
    let mut client = state.reservation_client.clone();

    let request = tonic::Request::new(GetReservationPayload {
        reservation_id,
        diner_id: account_id.to_string(),
    });
    let reservation = client.get_reservation(request).await?.into_inner();

    Ok(Json(serialize_reservation(reservation)))
}

#[utoipa::path(
    put,
    path = "/reservations/{id}",
    request_body = CreateReservationRequest,
    responses(
        (status = 200, description = "Reservation revised, possibly on another table", body = ReservationResponse),
        (status = 400, description = "Invalid date or time", body = ApiErrorResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Not the reservation owner", body = ApiErrorResponse),
        (status = 404, description = "Reservation not found", body = ApiErrorResponse),
        (status = 409, description = "No table is available for the requested window", body = ApiErrorResponse),
    ),
    params(
        ("id" = String, Path, description = "Reservation ID")
    ),
    security(
        ("principal" = []),
    ),
    tag = "reservations"
)]
#[instrument(skip(state))]
pub async fn revise_reservation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(reservation_id): Path<String>,
    Json(payload): Json<CreateReservationRequest>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let account_id = extract_account_id(&headers)?;
    let mut client = state.reservation_client.clone();

    let request = tonic::Request::new(ReviseReservationPayload {
        reservation_id,
        diner_id: account_id.to_string(),
        reservation_date: payload.reservation_date,
        reservation_time: payload.reservation_time,
        party_size: payload.party_size,
        notes: payload.notes,
    });
    let reservation = client.revise_reservation(request).await?.into_inner();

    Ok(Json(serialize_reservation(reservation)))
}

#[utoipa::path(
    post,
    path = "/reservations/{id}/cancel",
    responses(
        (status = 200, description = "Reservation cancelled (repeat cancels are no-ops)", body = ReservationResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Not the reservation owner", body = ApiErrorResponse),
        (status = 404, description = "Reservation not found", body = ApiErrorResponse),
        (status = 409, description = "Reservation already completed", body = ApiErrorResponse),
    ),
    params(
        ("id" = String, Path, description = "Reservation ID")
    ),
    security(
        ("principal" = []),
    ),
    tag = "reservations"
)]
#[instrument(skip(state))]
pub async fn cancel_reservation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(reservation_id): Path<String>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let account_id = extract_account_id(&headers)?;
    let mut client = state.reservation_client.clone();

    let request = tonic::Request::new(CancelReservationPayload {
        reservation_id,
        diner_id: account_id.to_string(),
    });
    let reservation = client.cancel_reservation(request).await?.into_inner();

    Ok(Json(serialize_reservation(reservation)))
}

#[utoipa::path(
    post,
    path = "/restaurants/{id}/reservations/{reservation_id}/confirm",
    responses(
        (status = 200, description = "Reservation confirmed", body = ReservationResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Not an operator of this restaurant", body = ApiErrorResponse),
        (status = 404, description = "Reservation not found", body = ApiErrorResponse),
        (status = 409, description = "Unsupported state transition", body = ApiErrorResponse),
    ),
    params(
        ("id" = String, Path, description = "Restaurant ID"),
        ("reservation_id" = String, Path, description = "Reservation ID"),
    ),
    security(
        ("principal" = []),
    ),
    tag = "reservations"
)]
#[instrument(skip(state))]
pub async fn confirm_reservation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((restaurant_id, reservation_id)): Path<(String, String)>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let account_id = extract_account_id(&headers)?;
    verify_restaurant_operator(&state.directory_client, &restaurant_id, account_id).await?;

    let mut client = state.reservation_client.clone();
    let request = tonic::Request::new(ConfirmReservationPayload {
        reservation_id,
        restaurant_id,
    });
    let reservation = client.confirm_reservation(request).await?.into_inner();

    Ok(Json(serialize_reservation(reservation)))
}

#[utoipa::path(
    post,
    path = "/restaurants/{id}/reservations/{reservation_id}/complete",
    responses(
        (status = 200, description = "Reservation completed", body = ReservationResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Not an operator of this restaurant", body = ApiErrorResponse),
        (status = 404, description = "Reservation not found", body = ApiErrorResponse),
        (status = 409, description = "Unsupported state transition", body = ApiErrorResponse),
    ),
    params(
        ("id" = String, Path, description = "Restaurant ID"),
        ("reservation_id" = String, Path, description = "Reservation ID"),
    ),
    security(
        ("principal" = []),
    ),
    tag = "reservations"
)]
#[instrument(skip(state))]
pub async fn complete_reservation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((restaurant_id, reservation_id)): Path<(String, String)>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let account_id = extract_account_id(&headers)?;
    verify_restaurant_operator(&state.directory_client, &restaurant_id, account_id).await?;

    let mut client = state.reservation_client.clone();
    let request = tonic::Request::new(CompleteReservationPayload {
        reservation_id,
        restaurant_id,
    });
    let reservation = client.complete_reservation(request).await?.into_inner();

    Ok(Json(serialize_reservation(reservation)))
}

#[utoipa::path(
    get,
    path = "/restaurants/{id}/reservations",
    params(
        ("id" = String, Path, description = "Restaurant ID"),
        ServiceDayQuery,
    ),
    responses(
        (status = 200, description = "Reservations of the service day", body = RestaurantReservationsResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Not an operator of this restaurant", body = ApiErrorResponse),
        (status = 404, description = "Restaurant not found", body = ApiErrorResponse),
    ),
    security(
        ("principal" = []),
    ),
    tag = "reservations"
)]
#[instrument(skip(state))]
pub async fn list_restaurant_reservations(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(restaurant_id): Path<String>,
    Query(query): Query<ServiceDayQuery>,
) -> Result<Json<RestaurantReservationsResponse>, ApiError> {
    let account_id = extract_account_id(&headers)?;
    verify_restaurant_operator(&state.directory_client, &restaurant_id, account_id).await?;

    let mut client = state.reservation_client.clone();
    let request = tonic::Request::new(ListRestaurantReservationsPayload {
        restaurant_id,
        reservation_date: query.date,
    });
    let response = client.list_restaurant_reservations(request).await?;

    Ok(Json(RestaurantReservationsResponse {
        reservations: response
            .into_inner()
            .reservations
            .into_iter()
            .map(serialize_reservation)
            .collect(),
    }))
}

fn serialize_reservation(
    reservation: tablebook_proto::reservation_service::Reservation,
) -> ReservationResponse {
    ReservationResponse {
        id: reservation.id,
        diner_id: reservation.diner_id,
        restaurant_id: reservation.restaurant_id,
        table_id: reservation.table_id,
        reservation_date: reservation.reservation_date,
        reservation_time: reservation.reservation_time,
        party_size: reservation.party_size,
        state: reservation_state_label(reservation.state).to_string(),
        notes: reservation.notes,
        created_at: serialize_timestamp(reservation.created_at),
    }
}

fn reservation_state_label(state: i32) -> &'static str {
    match ReservationState::try_from(state) {
        Ok(ReservationState::Pending) => "PENDING",
        Ok(ReservationState::Confirmed) => "CONFIRMED",
        Ok(ReservationState::Cancelled) => "CANCELLED",
        Ok(ReservationState::Completed) => "COMPLETED",
        Err(_) => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_labels_cover_the_lifecycle() {
        assert_eq!(
            reservation_state_label(ReservationState::Pending as i32),
            "PENDING"
        );
        assert_eq!(
            reservation_state_label(ReservationState::Cancelled as i32),
            "CANCELLED"
        );
        assert_eq!(reservation_state_label(999), "UNKNOWN");
    }
}
