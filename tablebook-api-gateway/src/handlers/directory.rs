use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Json,
    routing::{get, post, put},
    Router,
};
use tablebook_proto::directory_service::{
    CreateCategoryPayload, CreateCompanyPayload, CreateRestaurantPayload, CreateReviewPayload,
    CreateTablePayload, DeleteReviewPayload, FavoritePayload, GetRestaurantPayload,
    ListFavoritesPayload, ListRestaurantsPayload, ListReviewsPayload, ListTablesPayload,
    RestaurantAttributes, UpdateRestaurantPayload, UpdateReviewPayload,
    UpdateTableCapacityPayload,
};
use tracing::instrument;

use crate::error::ApiError;
use crate::models::*;

use super::{extract_account_id, serialize_timestamp, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/companies", post(create_company))
        .route("/categories", post(create_category).get(list_categories))
        .route("/restaurants", post(create_restaurant).get(list_restaurants))
        .route(
            "/restaurants/{id}",
            get(get_restaurant).put(update_restaurant),
        )
        .route(
            "/restaurants/{id}/tables",
            post(create_table).get(list_tables),
        )
        .route("/tables/{id}", put(update_table))
        .route(
            "/restaurants/{id}/reviews",
            post(create_review).get(list_reviews),
        )
        .route("/reviews/{id}", put(update_review).delete(delete_review))
        .route(
            "/restaurants/{id}/favorite",
            put(add_favorite).delete(remove_favorite),
        )
        .route("/favorites", get(list_favorites))
}

#[utoipa::path(
    post,
    path = "/companies",
    request_body = CreateCompanyRequest,
    responses(
        (status = 200, description = "Company created successfully", body = CompanyResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
    ),
    security(
        ("principal" = []),
    ),
    tag = "directory"
)]
#[instrument(skip(state))]
pub async fn create_company(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateCompanyRequest>,
) -> Result<Json<CompanyResponse>, ApiError> {
    let account_id = extract_account_id(&headers)?;
    let mut client = state.directory_client.clone();

    let request = tonic::Request::new(CreateCompanyPayload {
        name: payload.name,
        representative: payload.representative,
        zipcode: payload.zipcode,
        address: payload.address,
        business: payload.business,
        owner_account_id: account_id.to_string(),
    });
    let company = client.create_company(request).await?.into_inner();

    Ok(Json(CompanyResponse {
        id: company.id,
        name: company.name,
        representative: company.representative,
        zipcode: company.zipcode,
        address: company.address,
        business: company.business,
    }))
}

#[utoipa::path(
    post,
    path = "/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 200, description = "Category created successfully", body = CategoryResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 409, description = "Category already exists", body = ApiErrorResponse),
    ),
    security(
        ("principal" = []),
    ),
    tag = "directory"
)]
#[instrument(skip(state))]
pub async fn create_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<Json<CategoryResponse>, ApiError> {
    extract_account_id(&headers)?;
    let mut client = state.directory_client.clone();

    let request = tonic::Request::new(CreateCategoryPayload { name: payload.name });
    let category = client.create_category(request).await?.into_inner();

    Ok(Json(CategoryResponse {
        id: category.id,
        name: category.name,
    }))
}

#[utoipa::path(
    get,
    path = "/categories",
    responses(
        (status = 200, description = "All categories", body = ListCategoriesResponse),
        (status = 503, description = "Service unavailable", body = ApiErrorResponse),
    ),
    tag = "directory"
)]
#[instrument(skip(state))]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<ListCategoriesResponse>, ApiError> {
    let mut client = state.directory_client.clone();

    let response = client.list_categories(tonic::Request::new(())).await?;

    Ok(Json(ListCategoriesResponse {
        categories: response
            .into_inner()
            .categories
            .into_iter()
            .map(|c| CategoryResponse {
                id: c.id,
                name: c.name,
            })
            .collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/restaurants",
    request_body = CreateRestaurantRequest,
    responses(
        (status = 200, description = "Restaurant created successfully", body = RestaurantResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Not a staff of the company", body = ApiErrorResponse),
    ),
    security(
        ("principal" = []),
    ),
    tag = "directory"
)]
#[instrument(skip(state))]
pub async fn create_restaurant(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateRestaurantRequest>,
) -> Result<Json<RestaurantResponse>, ApiError> {
    let account_id = extract_account_id(&headers)?;
    let mut client = state.directory_client.clone();

    let request = tonic::Request::new(CreateRestaurantPayload {
        company_id: payload.company_id,
        attributes: Some(serialize_attributes(payload.attributes)),
        acting_account_id: account_id.to_string(),
    });
    let restaurant = client.create_restaurant(request).await?.into_inner();

    Ok(Json(serialize_restaurant(restaurant)))
}

#[utoipa::path(
    put,
    path = "/restaurants/{id}",
    request_body = RestaurantAttributesRequest,
    responses(
        (status = 200, description = "Restaurant updated successfully", body = RestaurantResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Not a staff of the company", body = ApiErrorResponse),
        (status = 404, description = "Restaurant not found", body = ApiErrorResponse),
    ),
    params(
        ("id" = String, Path, description = "Restaurant ID")
    ),
    security(
        ("principal" = []),
    ),
    tag = "directory"
)]
#[instrument(skip(state))]
pub async fn update_restaurant(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(restaurant_id): Path<String>,
    Json(payload): Json<RestaurantAttributesRequest>,
) -> Result<Json<RestaurantResponse>, ApiError> {
    let account_id = extract_account_id(&headers)?;
    let mut client = state.directory_client.clone();

    let request = tonic::Request::new(UpdateRestaurantPayload {
        restaurant_id,
        attributes: Some(serialize_attributes(payload)),
        acting_account_id: account_id.to_string(),
    });
    let restaurant = client.update_restaurant(request).await?.into_inner();

    Ok(Json(serialize_restaurant(restaurant)))
}

#[utoipa::path(
    get,
    path = "/restaurants",
    params(RestaurantListQuery),
    responses(
        (status = 200, description = "Restaurants, newest first", body = ListRestaurantsResponse),
        (status = 503, description = "Service unavailable", body = ApiErrorResponse),
    ),
    tag = "directory"
)]
#[instrument(skip(state))]
pub async fn list_restaurants(
    State(state): State<AppState>,
    Query(query): Query<RestaurantListQuery>,
) -> Result<Json<ListRestaurantsResponse>, ApiError> {
    let mut client = state.directory_client.clone();

    let request = tonic::Request::new(ListRestaurantsPayload {
        category_id: query.category,
        keyword: query.keyword,
    });
    let response = client.list_restaurants(request).await?;

    Ok(Json(ListRestaurantsResponse {
        restaurants: response
            .into_inner()
            .restaurants
            .into_iter()
            .map(serialize_restaurant)
            .collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/restaurants/{id}",
    responses(
        (status = 200, description = "Restaurant details with its review aggregate", body = RestaurantDetailResponse),
        (status = 404, description = "Restaurant not found", body = ApiErrorResponse),
    ),
    params(
        ("id" = String, Path, description = "Restaurant ID")
    ),
    tag = "directory"
)]
#[instrument(skip(state))]
pub async fn get_restaurant(
    State(state): State<AppState>,
    Path(restaurant_id): Path<String>,
) -> Result<Json<RestaurantDetailResponse>, ApiError> {
    let mut client = state.directory_client.clone();

    let request = tonic::Request::new(GetRestaurantPayload { restaurant_id });
    let detail = client.get_restaurant(request).await?.into_inner();

    let restaurant = detail
        .restaurant
        .ok_or_else(|| ApiError::InternalError("Missing restaurant".to_string()))?;

    Ok(Json(RestaurantDetailResponse {
        restaurant: serialize_restaurant(restaurant),
        average_rating: detail.average_rating,
        review_count: detail.review_count,
    }))
}

#[utoipa::path(
    post,
    path = "/restaurants/{id}/tables",
    request_body = CreateTableRequest,
    responses(
        (status = 200, description = "Table created successfully", body = TableResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Not a staff of the company", body = ApiErrorResponse),
        (status = 404, description = "Restaurant not found", body = ApiErrorResponse),
    ),
    params(
        ("id" = String, Path, description = "Restaurant ID")
    ),
    security(
        ("principal" = []),
    ),
    tag = "directory"
)]
#[instrument(skip(state))]
pub async fn create_table(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(restaurant_id): Path<String>,
    Json(payload): Json<CreateTableRequest>,
) -> Result<Json<TableResponse>, ApiError> {
    let account_id = extract_account_id(&headers)?;
    let mut client = state.directory_client.clone();

    let request = tonic::Request::new(CreateTablePayload {
        restaurant_id,
        capacity: payload.capacity,
        acting_account_id: account_id.to_string(),
    });
    let table = client.create_table(request).await?.into_inner();

    Ok(Json(TableResponse {
        id: table.id,
        restaurant_id: table.restaurant_id,
        capacity: table.capacity,
    }))
}

#[utoipa::path(
    get,
    path = "/restaurants/{id}/tables",
    responses(
        (status = 200, description = "Tables ordered by capacity", body = ListTablesResponse),
        (status = 503, description = "Service unavailable", body = ApiErrorResponse),
    ),
    params(
        ("id" = String, Path, description = "Restaurant ID")
    ),
    tag = "directory"
)]
#[instrument(skip(state))]
pub async fn list_tables(
    State(state): State<AppState>,
    Path(restaurant_id): Path<String>,
) -> Result<Json<ListTablesResponse>, ApiError> {
    let mut client = state.directory_client.clone();

    let request = tonic::Request::new(ListTablesPayload { restaurant_id });
    let response = client.list_tables(request).await?;

    Ok(Json(ListTablesResponse {
        tables: response
            .into_inner()
            .tables
            .into_iter()
            .map(|t| TableResponse {
                id: t.id,
                restaurant_id: t.restaurant_id,
                capacity: t.capacity,
            })
            .collect(),
    }))
}

#[utoipa::path(
    put,
    path = "/tables/{id}",
    request_body = CreateTableRequest,
    responses(
        (status = 200, description = "Table capacity updated", body = TableResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Not a staff of the company", body = ApiErrorResponse),
        (status = 404, description = "Table not found", body = ApiErrorResponse),
    ),
    params(
        ("id" = String, Path, description = "Table ID")
    ),
    security(
        ("principal" = []),
    ),
    tag = "directory"
)]
#[instrument(skip(state))]
pub async fn update_table(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(table_id): Path<String>,
    Json(payload): Json<CreateTableRequest>,
) -> Result<Json<TableResponse>, ApiError> {
    let account_id = extract_account_id(&headers)?;
    let mut client = state.directory_client.clone();

    let request = tonic::Request::new(UpdateTableCapacityPayload {
        table_id,
        capacity: payload.capacity,
        acting_account_id: account_id.to_string(),
    });
    let table = client.update_table_capacity(request).await?.into_inner();

    Ok(Json(TableResponse {
        id: table.id,
        restaurant_id: table.restaurant_id,
        capacity: table.capacity,
    }))
}

#[utoipa::path(
    post,
    path = "/restaurants/{id}/reviews",
    request_body = CreateReviewRequest,
    responses(
        (status = 200, description = "Review posted", body = ReviewResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Paid membership required", body = ApiErrorResponse),
        (status = 409, description = "Restaurant already reviewed", body = ApiErrorResponse),
    ),
    params(
        ("id" = String, Path, description = "Restaurant ID")
    ),
    security(
        ("principal" = []),
    ),
    tag = "directory"
)]
#[instrument(skip(state))]
pub async fn create_review(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(restaurant_id): Path<String>,
    Json(payload): Json<CreateReviewRequest>,
) -> Result<Json<ReviewResponse>, ApiError> {
    let account_id = extract_account_id(&headers)?;
    let mut client = state.directory_client.clone();

    let request = tonic::Request::new(CreateReviewPayload {
        restaurant_id,
        account_id: account_id.to_string(),
        rating: payload.rating,
        title: payload.title,
        comment: payload.comment,
    });
    let review = client.create_review(request).await?.into_inner();

    Ok(Json(serialize_review(review)))
}

#[utoipa::path(
    put,
    path = "/reviews/{id}",
    request_body = CreateReviewRequest,
    responses(
        (status = 200, description = "Review updated", body = ReviewResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Not the author or not a paid member", body = ApiErrorResponse),
        (status = 404, description = "Review not found", body = ApiErrorResponse),
    ),
    params(
        ("id" = String, Path, description = "Review ID")
    ),
    security(
        ("principal" = []),
    ),
    tag = "directory"
)]
#[instrument(skip(state))]
pub async fn update_review(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(review_id): Path<String>,
    Json(payload): Json<CreateReviewRequest>,
) -> Result<Json<ReviewResponse>, ApiError> {
    let account_id = extract_account_id(&headers)?;
    let mut client = state.directory_client.clone();

    let request = tonic::Request::new(UpdateReviewPayload {
        review_id,
        account_id: account_id.to_string(),
        rating: payload.rating,
        title: payload.title,
        comment: payload.comment,
    });
    let review = client.update_review(request).await?.into_inner();

    Ok(Json(serialize_review(review)))
}

#[utoipa::path(
    delete,
    path = "/reviews/{id}",
    responses(
        (status = 200, description = "Review deleted"),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Not the author", body = ApiErrorResponse),
        (status = 404, description = "Review not found", body = ApiErrorResponse),
    ),
    params(
        ("id" = String, Path, description = "Review ID")
    ),
    security(
        ("principal" = []),
    ),
    tag = "directory"
)]
#[instrument(skip(state))]
pub async fn delete_review(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(review_id): Path<String>,
) -> Result<(), ApiError> {
    let account_id = extract_account_id(&headers)?;
    let mut client = state.directory_client.clone();

    let request = tonic::Request::new(DeleteReviewPayload {
        review_id,
        account_id: account_id.to_string(),
    });
    client.delete_review(request).await?;

    Ok(())
}

#[utoipa::path(
    get,
    path = "/restaurants/{id}/reviews",
    responses(
        (status = 200, description = "Reviews, newest first", body = ListReviewsResponse),
        (status = 503, description = "Service unavailable", body = ApiErrorResponse),
    ),
    params(
        ("id" = String, Path, description = "Restaurant ID")
    ),
    tag = "directory"
)]
#[instrument(skip(state))]
pub async fn list_reviews(
    State(state): State<AppState>,
    Path(restaurant_id): Path<String>,
) -> Result<Json<ListReviewsResponse>, ApiError> {
    let mut client = state.directory_client.clone();

    let request = tonic::Request::new(ListReviewsPayload { restaurant_id });
    let response = client.list_reviews(request).await?;

    Ok(Json(ListReviewsResponse {
        reviews: response
            .into_inner()
            .reviews
            .into_iter()
            .map(serialize_review)
            .collect(),
    }))
}

#[utoipa::path(
    put,
    path = "/restaurants/{id}/favorite",
    responses(
        (status = 200, description = "Restaurant favorited"),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Paid membership required", body = ApiErrorResponse),
        (status = 404, description = "Restaurant not found", body = ApiErrorResponse),
    ),
    params(
        ("id" = String, Path, description = "Restaurant ID")
    ),
    security(
        ("principal" = []),
    ),
    tag = "directory"
)]
#[instrument(skip(state))]
pub async fn add_favorite(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(restaurant_id): Path<String>,
) -> Result<(), ApiError> {
    let account_id = extract_account_id(&headers)?;
    let mut client = state.directory_client.clone();

    let request = tonic::Request::new(FavoritePayload {
        account_id: account_id.to_string(),
        restaurant_id,
    });
    client.add_favorite(request).await?;

    Ok(())
}

#[utoipa::path(
    delete,
    path = "/restaurants/{id}/favorite",
    responses(
        (status = 200, description = "Restaurant unfavorited"),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
    ),
    params(
        ("id" = String, Path, description = "Restaurant ID")
    ),
    security(
        ("principal" = []),
    ),
    tag = "directory"
)]
#[instrument(skip(state))]
pub async fn remove_favorite(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(restaurant_id): Path<String>,
) -> Result<(), ApiError> {
    let account_id = extract_account_id(&headers)?;
    let mut client = state.directory_client.clone();

    let request = tonic::Request::new(FavoritePayload {
        account_id: account_id.to_string(),
        restaurant_id,
    });
    client.remove_favorite(request).await?;

    Ok(())
}

#[utoipa::path(
    get,
    path = "/favorites",
    responses(
        (status = 200, description = "Favorited restaurants, newest first", body = ListRestaurantsResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
    ),
    security(
        ("principal" = []),
    ),
    tag = "directory"
)]
#[instrument(skip(state))]
pub async fn list_favorites(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ListRestaurantsResponse>, ApiError> {
    let account_id = extract_account_id(&headers)?;
    let mut client = state.directory_client.clone();

    let request = tonic::Request::new(ListFavoritesPayload {
        account_id: account_id.to_string(),
    });
    let response = client.list_favorites(request).await?;

    Ok(Json(ListRestaurantsResponse {
        restaurants: response
            .into_inner()
            .restaurants
            .into_iter()
            .map(serialize_restaurant)
            .collect(),
    }))
}

fn serialize_attributes(attrs: RestaurantAttributesRequest) -> RestaurantAttributes {
    RestaurantAttributes {
        category_id: attrs.category_id,
        name: attrs.name,
        description: attrs.description,
        price_min: attrs.price_min,
        price_max: attrs.price_max,
        open_time: attrs.open_time,
        close_time: attrs.close_time,
        zipcode: attrs.zipcode,
        address: attrs.address,
        tel: attrs.tel,
        holiday: attrs.holiday,
    }
}

fn serialize_restaurant(
    restaurant: tablebook_proto::directory_service::Restaurant,
) -> RestaurantResponse {
    let attrs = restaurant.attributes.unwrap_or_default();
    RestaurantResponse {
        id: restaurant.id,
        company_id: restaurant.company_id,
        category_id: attrs.category_id,
        name: attrs.name,
        description: attrs.description,
        price_min: attrs.price_min,
        price_max: attrs.price_max,
        open_time: attrs.open_time,
        close_time: attrs.close_time,
        zipcode: attrs.zipcode,
        address: attrs.address,
        tel: attrs.tel,
        holiday: attrs.holiday,
    }
}

fn serialize_review(review: tablebook_proto::directory_service::Review) -> ReviewResponse {
    ReviewResponse {
        id: review.id,
        restaurant_id: review.restaurant_id,
        account_id: review.account_id,
        author_name: review.author_name,
        rating: review.rating,
        title: review.title,
        comment: review.comment,
        created_at: serialize_timestamp(review.created_at),
    }
}
