use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateAccountRequest {
    /// Email address used as the login identity
    pub email: String,
    /// Display name of the diner
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AccountResponse {
    /// Unique identifier for the account
    pub id: String,
    /// Email address of the account
    pub email: String,
    /// Display name of the diner
    pub name: String,
    /// Whether the paid tier is currently active
    pub paid_member: bool,
    /// ISO 8601 timestamp when the account was created
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ActivateSubscriptionRequest {
    /// Customer reference at the payment processor
    pub processor_customer_id: String,
    /// Subscription reference at the payment processor
    pub processor_subscription_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubscriptionResponse {
    /// Account the subscription belongs to
    pub account_id: String,
    /// Customer reference at the payment processor
    pub processor_customer_id: String,
    /// Subscription reference at the payment processor
    pub processor_subscription_id: String,
    /// Subscription status as reported by the processor
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateCompanyRequest {
    /// Legal name of the company
    pub name: String,
    /// Name of the company representative
    pub representative: String,
    /// Postal code of the head office
    pub zipcode: String,
    /// Address of the head office
    pub address: String,
    /// Description of the company's business
    pub business: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CompanyResponse {
    /// Unique identifier for the company
    pub id: String,
    /// Legal name of the company
    pub name: String,
    /// Name of the company representative
    pub representative: String,
    /// Postal code of the head office
    pub zipcode: String,
    /// Address of the head office
    pub address: String,
    /// Description of the company's business
    pub business: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateCategoryRequest {
    /// Name of the category
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryResponse {
    /// Unique identifier for the category
    pub id: String,
    /// Name of the category
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListCategoriesResponse {
    pub categories: Vec<CategoryResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RestaurantAttributesRequest {
    /// Category the restaurant belongs to
    pub category_id: String,
    /// Name of the restaurant
    pub name: String,
    /// Free-text description
    pub description: String,
    /// Lower bound of the typical budget
    pub price_min: i32,
    /// Upper bound of the typical budget
    pub price_max: i32,
    /// Opening time ("HH:MM")
    pub open_time: String,
    /// Closing time ("HH:MM")
    pub close_time: String,
    /// Postal code
    pub zipcode: String,
    /// Street address
    pub address: String,
    /// Telephone number
    pub tel: String,
    /// Weekly closing days
    pub holiday: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateRestaurantRequest {
    /// Company that owns the restaurant
    pub company_id: String,
    pub attributes: RestaurantAttributesRequest,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RestaurantResponse {
    /// Unique identifier for the restaurant
    pub id: String,
    /// Company that owns the restaurant
    pub company_id: String,
    /// Category the restaurant belongs to
    pub category_id: String,
    /// Name of the restaurant
    pub name: String,
    /// Free-text description
    pub description: String,
    /// Lower bound of the typical budget
    pub price_min: i32,
    /// Upper bound of the typical budget
    pub price_max: i32,
    /// Opening time ("HH:MM")
    pub open_time: String,
    /// Closing time ("HH:MM")
    pub close_time: String,
    /// Postal code
    pub zipcode: String,
    /// Street address
    pub address: String,
    /// Telephone number
    pub tel: String,
    /// Weekly closing days
    pub holiday: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RestaurantDetailResponse {
    pub restaurant: RestaurantResponse,
    /// Average review rating, 0.0 when unreviewed
    pub average_rating: f64,
    /// Number of reviews
    pub review_count: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListRestaurantsResponse {
    pub restaurants: Vec<RestaurantResponse>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RestaurantListQuery {
    /// Restrict the listing to a category
    pub category: Option<String>,
    /// Substring match against restaurant names
    pub keyword: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateTableRequest {
    /// Number of seats at the table
    pub capacity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TableResponse {
    /// Unique identifier for the table
    pub id: String,
    /// Restaurant the table belongs to
    pub restaurant_id: String,
    /// Number of seats at the table
    pub capacity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListTablesResponse {
    pub tables: Vec<TableResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateReviewRequest {
    /// Rating from 1 to 5
    pub rating: i32,
    /// Short headline
    pub title: String,
    /// Review body
    pub comment: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewResponse {
    /// Unique identifier for the review
    pub id: String,
    /// Restaurant being reviewed
    pub restaurant_id: String,
    /// Account that wrote the review
    pub account_id: String,
    /// Display name of the author
    pub author_name: String,
    /// Rating from 1 to 5
    pub rating: i32,
    /// Short headline
    pub title: String,
    /// Review body
    pub comment: String,
    /// ISO 8601 timestamp when the review was posted
    pub created_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListReviewsResponse {
    pub reviews: Vec<ReviewResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateReservationRequest {
    /// Requested calendar date ("YYYY-MM-DD")
    pub reservation_date: String,
    /// Requested time of day ("HH:MM")
    pub reservation_time: String,
    /// Number of guests
    pub party_size: i32,
    /// Requests or allergy information for the restaurant
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReservationResponse {
    /// Unique identifier for the reservation
    pub id: String,
    /// Diner who booked
    pub diner_id: String,
    /// Restaurant booked
    pub restaurant_id: String,
    /// Table assigned to the booking
    pub table_id: String,
    /// Reserved calendar date ("YYYY-MM-DD")
    pub reservation_date: String,
    /// Reserved time of day ("HH:MM")
    pub reservation_time: String,
    /// Number of guests
    pub party_size: i32,
    /// Reservation state
    pub state: String,
    /// Requests or allergy information for the restaurant
    pub notes: String,
    /// ISO 8601 timestamp when the booking was made
    pub created_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReservationEdgeResponse {
    /// Opaque cursor for pagination
    pub cursor: String,
    pub node: ReservationResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListReservationsResponse {
    pub edges: Vec<ReservationEdgeResponse>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReservationListQuery {
    /// Return this many newest-first entries
    pub first: Option<i32>,
    /// Cursor to continue a newest-first page
    pub after: Option<String>,
    /// Return this many oldest-first entries
    pub last: Option<i32>,
    /// Cursor to continue an oldest-first page
    pub before: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RestaurantReservationsResponse {
    pub reservations: Vec<ReservationResponse>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ServiceDayQuery {
    /// Service day to list ("YYYY-MM-DD")
    pub date: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorResponse {
    /// Error message
    pub error: String,
}
