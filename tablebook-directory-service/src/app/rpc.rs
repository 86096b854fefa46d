use chrono::{NaiveTime, Utc};
use diesel::dsl::{delete, insert_into, update};
use diesel::prelude::*;
use diesel::PgConnection;
use diesel::result::DatabaseErrorKind;
use diesel::result::Error::{DatabaseError, NotFound};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use prost_types::Timestamp;
use tonic::transport::Server;
use tonic::{Request, Response, Status};
use uuid::Uuid;

use tablebook_proto::directory_service::directory_service_server::{
    DirectoryService, DirectoryServiceServer,
};
use tablebook_proto::directory_service::{
    Category, Company, CreateCategoryPayload, CreateCompanyPayload, CreateRestaurantPayload,
    CreateReviewPayload, CreateTablePayload, DeleteReviewPayload, DiningTable, FavoritePayload,
    GetRestaurantPayload, IsRestaurantOperatorPayload, IsRestaurantOperatorResponse,
    ListCategoriesResponse, ListFavoritesPayload, ListFavoritesResponse, ListRestaurantsPayload,
    ListRestaurantsResponse, ListReviewsPayload, ListReviewsResponse, ListTablesPayload,
    ListTablesResponse, Restaurant, RestaurantAttributes, RestaurantDetail, Review,
    UpdateRestaurantPayload, UpdateReviewPayload, UpdateTableCapacityPayload,
};

use crate::events::RestaurantEventPublisher;
use crate::{establish_connection, models, schema};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

const TIME_FORMAT: &str = "%H:%M";

#[derive(Default)]
pub struct DirectoryServiceImpl {}

#[tonic::async_trait]
impl DirectoryService for DirectoryServiceImpl {
    async fn create_company(
        &self,
        request: Request<CreateCompanyPayload>,
    ) -> Result<Response<Company>, Status> {
        let payload = request.into_inner();
        let owner = payload
            .owner_account_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid owner account id"))?;
        if payload.name.is_empty() {
            return Err(Status::invalid_argument("Name required"));
        }

        let company = models::Company {
            id: Uuid::new_v4(),
            name: payload.name,
            representative: payload.representative,
            zipcode: payload.zipcode,
            address: payload.address,
            business: payload.business,
            created_at: Utc::now(),
        };
        let staff = models::CompanyStaff {
            company_id: company.id,
            account_id: owner,
        };

        let conn = &mut establish_connection();
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            insert_into(schema::companies::table)
                .values(&company)
                .execute(conn)?;
            insert_into(schema::company_staff::table)
                .values(&staff)
                .execute(conn)?;

            Ok(())
        })
        .map_err(|_| Status::internal("Failed to create company"))?;

        Ok(Response::new(serialize_company(&company)))
    }

    async fn create_category(
        &self,
        request: Request<CreateCategoryPayload>,
    ) -> Result<Response<Category>, Status> {
        use schema::categories::dsl::*;

        let payload = request.into_inner();
        if payload.name.is_empty() {
            return Err(Status::invalid_argument("Name required"));
        }

        let category = models::Category {
            id: Uuid::new_v4(),
            name: payload.name,
        };

        let conn = &mut establish_connection();
        insert_into(categories)
            .values(&category)
            .execute(conn)
            .map_err(|err| match err {
                DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    Status::already_exists("Category already exists")
                }
                _ => Status::internal("Failed to create category"),
            })?;

        Ok(Response::new(Category {
            id: category.id.to_string(),
            name: category.name,
        }))
    }

    async fn list_categories(
        &self,
        _: Request<()>,
    ) -> Result<Response<ListCategoriesResponse>, Status> {
        use schema::categories::dsl::*;

        let conn = &mut establish_connection();
        let results = categories
            .select(models::Category::as_select())
            .order(name.asc())
            .load(conn)
            .map_err(|_| Status::internal("Cannot fetch categories"))?;

        Ok(Response::new(ListCategoriesResponse {
            categories: results
                .into_iter()
                .map(|c| Category {
                    id: c.id.to_string(),
                    name: c.name,
                })
                .collect(),
        }))
    }

    async fn create_restaurant(
        &self,
        request: Request<CreateRestaurantPayload>,
    ) -> Result<Response<Restaurant>, Status> {
        let payload = request.into_inner();
        let cid = payload
            .company_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid company id"))?;
        let actor = payload
            .acting_account_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid acting account id"))?;
        let attrs = parse_attributes(
            payload
                .attributes
                .ok_or(Status::invalid_argument("Attributes required"))?,
        )?;

        let conn = &mut establish_connection();
        match schema::companies::table
            .find(&cid)
            .select(models::Company::as_select())
            .first::<models::Company>(conn)
        {
            Ok(_) => {}
            Err(NotFound) => return Err(Status::not_found("Company not found")),
            Err(_) => return Err(Status::internal("Cannot fetch company")),
        }
        if !is_company_staff(conn, &cid, &actor)
            .map_err(|_| Status::internal("Cannot check company staff"))?
        {
            return Err(Status::permission_denied("Not a staff of this company"));
        }

        let restaurant = models::Restaurant {
            id: Uuid::new_v4(),
            company_id: cid,
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
            created_at: Utc::now(),
        };

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            insert_into(schema::restaurants::table)
                .values(&restaurant)
                .execute(conn)?;

            let mut publisher = RestaurantEventPublisher::new(conn);
            publisher.restaurant_created(&restaurant);

            Ok(())
        })
        .map_err(|err| match err {
            DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                Status::not_found("Category not found")
            }
            _ => Status::internal("Failed to create restaurant"),
        })?;

        Ok(Response::new(serialize_restaurant(&restaurant)))
    }

    async fn update_restaurant(
        &self,
        request: Request<UpdateRestaurantPayload>,
    ) -> Result<Response<Restaurant>, Status> {
        let payload = request.into_inner();
        let rid = payload
            .restaurant_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid restaurant id"))?;
        let actor = payload
            .acting_account_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid acting account id"))?;
        let attrs = parse_attributes(
            payload
                .attributes
                .ok_or(Status::invalid_argument("Attributes required"))?,
        )?;

        let conn = &mut establish_connection();
        let restaurant = match schema::restaurants::table
            .find(&rid)
            .select(models::Restaurant::as_select())
            .first::<models::Restaurant>(conn)
        {
            Ok(restaurant) => restaurant,
            Err(NotFound) => return Err(Status::not_found("Restaurant not found")),
            Err(_) => return Err(Status::internal("Cannot fetch restaurant")),
        };
        if !is_company_staff(conn, &restaurant.company_id, &actor)
            .map_err(|_| Status::internal("Cannot check company staff"))?
        {
            return Err(Status::permission_denied("Not a staff of this company"));
        }

        let changeset = models::RestaurantChangeset {
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
        };

        let updated = conn
            .transaction::<_, diesel::result::Error, _>(|conn| {
                let updated = update(schema::restaurants::table)
                    .set(&changeset)
                    .filter(schema::restaurants::id.eq(&rid))
                    .returning(models::Restaurant::as_returning())
                    .get_result::<models::Restaurant>(conn)?;

                let mut publisher = RestaurantEventPublisher::new(conn);
                publisher.restaurant_updated(&updated);

                Ok(updated)
            })
            .map_err(|err| match err {
                DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                    Status::not_found("Category not found")
                }
                _ => Status::internal("Failed to update restaurant"),
            })?;

        Ok(Response::new(serialize_restaurant(&updated)))
    }

    async fn get_restaurant(
        &self,
        request: Request<GetRestaurantPayload>,
    ) -> Result<Response<RestaurantDetail>, Status> {
        let payload = request.into_inner();
        let rid = payload
            .restaurant_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid restaurant id"))?;

        let conn = &mut establish_connection();
        let restaurant = match schema::restaurants::table
            .find(&rid)
            .select(models::Restaurant::as_select())
            .first::<models::Restaurant>(conn)
        {
            Ok(restaurant) => restaurant,
            Err(NotFound) => return Err(Status::not_found("Restaurant not found")),
            Err(_) => return Err(Status::internal("Cannot fetch restaurant")),
        };

        let ratings = schema::reviews::table
            .filter(schema::reviews::restaurant_id.eq(&rid))
            .select(schema::reviews::rating)
            .load::<i32>(conn)
            .map_err(|_| Status::internal("Cannot fetch reviews"))?;
        let (average_rating, review_count) = rating_summary(&ratings);

        Ok(Response::new(RestaurantDetail {
            restaurant: Some(serialize_restaurant(&restaurant)),
            average_rating,
            review_count,
        }))
    }

    async fn list_restaurants(
        &self,
        request: Request<ListRestaurantsPayload>,
    ) -> Result<Response<ListRestaurantsResponse>, Status> {
        use schema::restaurants::dsl::*;

        let payload = request.into_inner();

        let mut query = restaurants
            .select(models::Restaurant::as_select())
            .order(created_at.desc())
            .into_boxed();
        if let Some(cid) = payload.category_id {
            let cid = cid
                .parse::<Uuid>()
                .map_err(|_| Status::invalid_argument("Invalid category id"))?;
            query = query.filter(category_id.eq(cid));
        }
        if let Some(keyword) = payload.keyword {
            if !keyword.is_empty() {
                query = query.filter(name.ilike(format!("%{}%", keyword)));
            }
        }

        let conn = &mut establish_connection();
        let results = query
            .load::<models::Restaurant>(conn)
            .map_err(|_| Status::internal("Cannot fetch restaurants"))?;

        Ok(Response::new(ListRestaurantsResponse {
            restaurants: results.iter().map(serialize_restaurant).collect(),
        }))
    }

    async fn is_restaurant_operator(
        &self,
        request: Request<IsRestaurantOperatorPayload>,
    ) -> Result<Response<IsRestaurantOperatorResponse>, Status> {
        let payload = request.into_inner();
        let rid = payload
            .restaurant_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid restaurant id"))?;
        let aid = payload
            .account_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid account id"))?;

        let conn = &mut establish_connection();
        let restaurant = match schema::restaurants::table
            .find(&rid)
            .select(models::Restaurant::as_select())
            .first::<models::Restaurant>(conn)
        {
            Ok(restaurant) => restaurant,
            Err(NotFound) => return Err(Status::not_found("Restaurant not found")),
            Err(_) => return Err(Status::internal("Cannot fetch restaurant")),
        };
        let operator = is_company_staff(conn, &restaurant.company_id, &aid)
            .map_err(|_| Status::internal("Cannot check company staff"))?;

        Ok(Response::new(IsRestaurantOperatorResponse { operator }))
    }

    async fn create_table(
        &self,
        request: Request<CreateTablePayload>,
    ) -> Result<Response<DiningTable>, Status> {
        let payload = request.into_inner();
        let rid = payload
            .restaurant_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid restaurant id"))?;
        let actor = payload
            .acting_account_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid acting account id"))?;
        if payload.capacity < 1 {
            return Err(Status::invalid_argument("Capacity must be at least 1"));
        }

        let conn = &mut establish_connection();
        let restaurant = match schema::restaurants::table
            .find(&rid)
            .select(models::Restaurant::as_select())
            .first::<models::Restaurant>(conn)
        {
            Ok(restaurant) => restaurant,
            Err(NotFound) => return Err(Status::not_found("Restaurant not found")),
            Err(_) => return Err(Status::internal("Cannot fetch restaurant")),
        };
        if !is_company_staff(conn, &restaurant.company_id, &actor)
            .map_err(|_| Status::internal("Cannot check company staff"))?
        {
            return Err(Status::permission_denied("Not a staff of this company"));
        }

        let table = models::DiningTable {
            id: Uuid::new_v4(),
            restaurant_id: rid,
            capacity: payload.capacity,
        };

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            insert_into(schema::dining_tables::table)
                .values(&table)
                .execute(conn)?;

            let mut publisher = RestaurantEventPublisher::new(conn);
            publisher.table_created(&table);

            Ok(())
        })
        .map_err(|_| Status::internal("Failed to create table"))?;

        Ok(Response::new(serialize_table(&table)))
    }

    async fn update_table_capacity(
        &self,
        request: Request<UpdateTableCapacityPayload>,
    ) -> Result<Response<DiningTable>, Status> {
        let payload = request.into_inner();
        let tid = payload
            .table_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid table id"))?;
        let actor = payload
            .acting_account_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid acting account id"))?;
        if payload.capacity < 1 {
            return Err(Status::invalid_argument("Capacity must be at least 1"));
        }

        let conn = &mut establish_connection();
        let (table, restaurant) = match schema::dining_tables::table
            .inner_join(schema::restaurants::table)
            .filter(schema::dining_tables::id.eq(&tid))
            .select((
                models::DiningTable::as_select(),
                models::Restaurant::as_select(),
            ))
            .first::<(models::DiningTable, models::Restaurant)>(conn)
        {
            Ok(row) => row,
            Err(NotFound) => return Err(Status::not_found("Table not found")),
            Err(_) => return Err(Status::internal("Cannot fetch table")),
        };
        if !is_company_staff(conn, &restaurant.company_id, &actor)
            .map_err(|_| Status::internal("Cannot check company staff"))?
        {
            return Err(Status::permission_denied("Not a staff of this company"));
        }

        let table = models::DiningTable {
            capacity: payload.capacity,
            ..table
        };

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            update(schema::dining_tables::table)
                .set(schema::dining_tables::capacity.eq(payload.capacity))
                .filter(schema::dining_tables::id.eq(&tid))
                .execute(conn)?;

            let mut publisher = RestaurantEventPublisher::new(conn);
            publisher.table_updated(&table);

            Ok(())
        })
        .map_err(|_| Status::internal("Failed to update table"))?;

        Ok(Response::new(serialize_table(&table)))
    }

    async fn list_tables(
        &self,
        request: Request<ListTablesPayload>,
    ) -> Result<Response<ListTablesResponse>, Status> {
        use schema::dining_tables::dsl::*;

        let payload = request.into_inner();
        let rid = payload
            .restaurant_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid restaurant id"))?;

        let conn = &mut establish_connection();
        let results = dining_tables
            .select(models::DiningTable::as_select())
            .filter(restaurant_id.eq(&rid))
            .order((capacity.asc(), id.asc()))
            .load(conn)
            .map_err(|_| Status::internal("Cannot fetch tables"))?;

        Ok(Response::new(ListTablesResponse {
            tables: results.iter().map(serialize_table).collect(),
        }))
    }

    async fn create_review(
        &self,
        request: Request<CreateReviewPayload>,
    ) -> Result<Response<Review>, Status> {
        let payload = request.into_inner();
        let rid = payload
            .restaurant_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid restaurant id"))?;
        let aid = payload
            .account_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid account id"))?;
        if !(1..=5).contains(&payload.rating) {
            return Err(Status::invalid_argument("Rating must be between 1 and 5"));
        }

        let conn = &mut establish_connection();
        match schema::restaurants::table
            .find(&rid)
            .select(models::Restaurant::as_select())
            .first::<models::Restaurant>(conn)
        {
            Ok(_) => {}
            Err(NotFound) => return Err(Status::not_found("Restaurant not found")),
            Err(_) => return Err(Status::internal("Cannot fetch restaurant")),
        }
        let diner = fetch_diner(conn, &aid)?;
        if !diner.paid_member {
            return Err(Status::permission_denied("Paid membership required"));
        }

        let review = models::Review {
            id: Uuid::new_v4(),
            restaurant_id: rid,
            account_id: aid,
            rating: payload.rating,
            title: payload.title,
            comment: payload.comment,
            created_at: Utc::now(),
        };

        insert_into(schema::reviews::table)
            .values(&review)
            .execute(conn)
            .map_err(|err| match err {
                DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    Status::already_exists("Restaurant already reviewed")
                }
                _ => Status::internal("Failed to create review"),
            })?;

        Ok(Response::new(serialize_review(&review, &diner.name)))
    }

    async fn update_review(
        &self,
        request: Request<UpdateReviewPayload>,
    ) -> Result<Response<Review>, Status> {
        let payload = request.into_inner();
        let rvid = payload
            .review_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid review id"))?;
        let aid = payload
            .account_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid account id"))?;
        if !(1..=5).contains(&payload.rating) {
            return Err(Status::invalid_argument("Rating must be between 1 and 5"));
        }

        let conn = &mut establish_connection();
        let review = match schema::reviews::table
            .find(&rvid)
            .select(models::Review::as_select())
            .first::<models::Review>(conn)
        {
            Ok(review) => review,
            Err(NotFound) => return Err(Status::not_found("Review not found")),
            Err(_) => return Err(Status::internal("Cannot fetch review")),
        };
        if review.account_id != aid {
            return Err(Status::permission_denied("Not the review author"));
        }
        let diner = fetch_diner(conn, &aid)?;
        if !diner.paid_member {
            return Err(Status::permission_denied("Paid membership required"));
        }

        let review = models::Review {
            rating: payload.rating,
            title: payload.title,
            comment: payload.comment,
            ..review
        };

        update(schema::reviews::table)
            .set((
                schema::reviews::rating.eq(review.rating),
                schema::reviews::title.eq(&review.title),
                schema::reviews::comment.eq(&review.comment),
            ))
            .filter(schema::reviews::id.eq(&rvid))
            .execute(conn)
            .map_err(|_| Status::internal("Failed to update review"))?;

        Ok(Response::new(serialize_review(&review, &diner.name)))
    }

    async fn delete_review(
        &self,
        request: Request<DeleteReviewPayload>,
    ) -> Result<Response<()>, Status> {
        let payload = request.into_inner();
        let rvid = payload
            .review_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid review id"))?;
        let aid = payload
            .account_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid account id"))?;

        let conn = &mut establish_connection();
        let review = match schema::reviews::table
            .find(&rvid)
            .select(models::Review::as_select())
            .first::<models::Review>(conn)
        {
            Ok(review) => review,
            Err(NotFound) => return Err(Status::not_found("Review not found")),
            Err(_) => return Err(Status::internal("Cannot fetch review")),
        };
        if review.account_id != aid {
            return Err(Status::permission_denied("Not the review author"));
        }

        delete(schema::reviews::table.filter(schema::reviews::id.eq(&rvid)))
            .execute(conn)
            .map_err(|_| Status::internal("Failed to delete review"))?;

        Ok(Response::new(()))
    }

    async fn list_reviews(
        &self,
        request: Request<ListReviewsPayload>,
    ) -> Result<Response<ListReviewsResponse>, Status> {
        let payload = request.into_inner();
        let rid = payload
            .restaurant_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid restaurant id"))?;

        let conn = &mut establish_connection();
        let results = schema::reviews::table
            .left_join(
                schema::diners::table
                    .on(schema::diners::id.eq(schema::reviews::account_id)),
            )
            .filter(schema::reviews::restaurant_id.eq(&rid))
            .order(schema::reviews::created_at.desc())
            .select((
                models::Review::as_select(),
                Option::<models::Diner>::as_select(),
            ))
            .load::<(models::Review, Option<models::Diner>)>(conn)
            .map_err(|_| Status::internal("Cannot fetch reviews"))?;

        Ok(Response::new(ListReviewsResponse {
            reviews: results
                .into_iter()
                .map(|(review, diner)| {
                    let author = diner.map(|d| d.name).unwrap_or_default();
                    serialize_review(&review, &author)
                })
                .collect(),
        }))
    }

    async fn add_favorite(
        &self,
        request: Request<FavoritePayload>,
    ) -> Result<Response<()>, Status> {
        let payload = request.into_inner();
        let aid = payload
            .account_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid account id"))?;
        let rid = payload
            .restaurant_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid restaurant id"))?;

        let conn = &mut establish_connection();
        match schema::restaurants::table
            .find(&rid)
            .select(models::Restaurant::as_select())
            .first::<models::Restaurant>(conn)
        {
            Ok(_) => {}
            Err(NotFound) => return Err(Status::not_found("Restaurant not found")),
            Err(_) => return Err(Status::internal("Cannot fetch restaurant")),
        }
        let diner = fetch_diner(conn, &aid)?;
        if !diner.paid_member {
            return Err(Status::permission_denied("Paid membership required"));
        }

        let favorite = models::Favorite {
            account_id: aid,
            restaurant_id: rid,
            created_at: Utc::now(),
        };

        insert_into(schema::favorites::table)
            .values(&favorite)
            .on_conflict_do_nothing()
            .execute(conn)
            .map_err(|_| Status::internal("Failed to add favorite"))?;

        Ok(Response::new(()))
    }

    async fn remove_favorite(
        &self,
        request: Request<FavoritePayload>,
    ) -> Result<Response<()>, Status> {
        use schema::favorites::dsl::*;

        let payload = request.into_inner();
        let aid = payload
            .account_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid account id"))?;
        let rid = payload
            .restaurant_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid restaurant id"))?;

        let conn = &mut establish_connection();
        delete(
            favorites
                .filter(account_id.eq(&aid))
                .filter(restaurant_id.eq(&rid)),
        )
        .execute(conn)
        .map_err(|_| Status::internal("Failed to remove favorite"))?;

        Ok(Response::new(()))
    }

    async fn list_favorites(
        &self,
        request: Request<ListFavoritesPayload>,
    ) -> Result<Response<ListFavoritesResponse>, Status> {
        let payload = request.into_inner();
        let aid = payload
            .account_id
            .parse::<Uuid>()
            .map_err(|_| Status::invalid_argument("Invalid account id"))?;

        let conn = &mut establish_connection();
        let results = schema::favorites::table
            .inner_join(schema::restaurants::table)
            .filter(schema::favorites::account_id.eq(&aid))
            .order(schema::favorites::created_at.desc())
            .select(models::Restaurant::as_select())
            .load::<models::Restaurant>(conn)
            .map_err(|_| Status::internal("Cannot fetch favorites"))?;

        Ok(Response::new(ListFavoritesResponse {
            restaurants: results.iter().map(serialize_restaurant).collect(),
        }))
    }
}

#[derive(Debug)]
struct ParsedAttributes {
    category_id: Uuid,
    name: String,
    description: String,
    price_min: i32,
    price_max: i32,
    open_time: NaiveTime,
    close_time: NaiveTime,
    zipcode: String,
    address: String,
    tel: String,
    holiday: String,
}

fn parse_attributes(attrs: RestaurantAttributes) -> Result<ParsedAttributes, Status> {
    let category_id = attrs
        .category_id
        .parse::<Uuid>()
        .map_err(|_| Status::invalid_argument("Invalid category id"))?;
    if attrs.name.is_empty() {
        return Err(Status::invalid_argument("Name required"));
    }
    if attrs.price_min < 0 || attrs.price_max < attrs.price_min {
        return Err(Status::invalid_argument("Invalid price range"));
    }
    let open_time = parse_time_of_day(&attrs.open_time)
        .ok_or(Status::invalid_argument("Invalid open time"))?;
    let close_time = parse_time_of_day(&attrs.close_time)
        .ok_or(Status::invalid_argument("Invalid close time"))?;
    if close_time <= open_time {
        return Err(Status::invalid_argument(
            "Closing time must be after opening time",
        ));
    }

    Ok(ParsedAttributes {
        category_id,
        name: attrs.name,
        description: attrs.description,
        price_min: attrs.price_min,
        price_max: attrs.price_max,
        open_time,
        close_time,
        zipcode: attrs.zipcode,
        address: attrs.address,
        tel: attrs.tel,
        holiday: attrs.holiday,
    })
}

fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

fn rating_summary(ratings: &[i32]) -> (f64, i32) {
    if ratings.is_empty() {
        return (0.0, 0);
    }
    let sum: i32 = ratings.iter().sum();
    (f64::from(sum) / ratings.len() as f64, ratings.len() as i32)
}

fn is_company_staff(
    conn: &mut PgConnection,
    company: &Uuid,
    account: &Uuid,
) -> Result<bool, diesel::result::Error> {
    use schema::company_staff::dsl::*;

    let count: i64 = company_staff
        .filter(company_id.eq(company))
        .filter(account_id.eq(account))
        .count()
        .get_result(conn)?;
    Ok(count > 0)
}

fn fetch_diner(conn: &mut PgConnection, account: &Uuid) -> Result<models::Diner, Status> {
    match schema::diners::table
        .find(account)
        .select(models::Diner::as_select())
        .first::<models::Diner>(conn)
    {
        Ok(diner) => Ok(diner),
        Err(NotFound) => Err(Status::not_found("Diner not found")),
        Err(_) => Err(Status::internal("Cannot fetch diner")),
    }
}

fn serialize_company(company: &models::Company) -> Company {
    Company {
        id: company.id.to_string(),
        name: company.name.clone(),
        representative: company.representative.clone(),
        zipcode: company.zipcode.clone(),
        address: company.address.clone(),
        business: company.business.clone(),
    }
}

fn serialize_restaurant(restaurant: &models::Restaurant) -> Restaurant {
    Restaurant {
        id: restaurant.id.to_string(),
        company_id: restaurant.company_id.to_string(),
        attributes: Some(RestaurantAttributes {
            category_id: restaurant.category_id.to_string(),
            name: restaurant.name.clone(),
            description: restaurant.description.clone(),
            price_min: restaurant.price_min,
            price_max: restaurant.price_max,
            open_time: restaurant.open_time.format(TIME_FORMAT).to_string(),
            close_time: restaurant.close_time.format(TIME_FORMAT).to_string(),
            zipcode: restaurant.zipcode.clone(),
            address: restaurant.address.clone(),
            tel: restaurant.tel.clone(),
            holiday: restaurant.holiday.clone(),
        }),
    }
}

fn serialize_table(table: &models::DiningTable) -> DiningTable {
    DiningTable {
        id: table.id.to_string(),
        restaurant_id: table.restaurant_id.to_string(),
        capacity: table.capacity,
    }
}

fn serialize_review(review: &models::Review, author_name: &str) -> Review {
    Review {
        id: review.id.to_string(),
        restaurant_id: review.restaurant_id.to_string(),
        account_id: review.account_id.to_string(),
        author_name: author_name.to_string(),
        rating: review.rating,
        title: review.title.clone(),
        comment: review.comment.clone(),
        created_at: Some(Timestamp {
            seconds: review.created_at.timestamp(),
            nanos: review.created_at.timestamp_subsec_nanos() as i32,
        }),
    }
}

pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut conn = establish_connection();
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run migrations");

    let addr = "0.0.0.0:8202".parse().unwrap();
    let directory_service = DirectoryServiceImpl::default();

    let (mut health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<DirectoryServiceServer<DirectoryServiceImpl>>()
        .await;

    println!("listening on {}", addr);

    Server::builder()
        .add_service(health_service)
        .add_service(DirectoryServiceServer::new(directory_service))
        .serve(addr)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attributes() -> RestaurantAttributes {
        RestaurantAttributes {
            category_id: Uuid::new_v4().to_string(),
            name: "Meshiya Aoi".to_string(),
            description: "Set meals".to_string(),
            price_min: 1000,
            price_max: 3000,
            open_time: "11:00".to_string(),
            close_time: "22:00".to_string(),
            zipcode: "460-0008".to_string(),
            address: "Nagoya".to_string(),
            tel: "052-000-0000".to_string(),
            holiday: "Wednesday".to_string(),
        }
    }

    #[test]
    fn parse_time_of_day_accepts_both_formats() {
        assert_eq!(
            parse_time_of_day("11:30"),
            NaiveTime::from_hms_opt(11, 30, 0)
        );
        assert_eq!(
            parse_time_of_day("11:30:15"),
            NaiveTime::from_hms_opt(11, 30, 15)
        );
        assert_eq!(parse_time_of_day("tomorrow"), None);
    }

    #[test]
    fn parse_attributes_accepts_valid_input() {
        let parsed = parse_attributes(attributes()).unwrap();
        assert_eq!(parsed.name, "Meshiya Aoi");
        assert_eq!(parsed.open_time, NaiveTime::from_hms_opt(11, 0, 0).unwrap());
    }

    #[test]
    fn parse_attributes_rejects_inverted_prices() {
        let attrs = RestaurantAttributes {
            price_min: 3000,
            price_max: 1000,
            ..attributes()
        };
        let err = parse_attributes(attrs).unwrap_err();
        assert_eq!(err.code(), tonic::Code::InvalidArgument);
    }

    #[test]
    fn parse_attributes_rejects_inverted_hours() {
        let attrs = RestaurantAttributes {
            open_time: "22:00".to_string(),
            close_time: "11:00".to_string(),
            ..attributes()
        };
        let err = parse_attributes(attrs).unwrap_err();
        assert_eq!(err.code(), tonic::Code::InvalidArgument);
    }

    #[test]
    fn rating_summary_averages_ratings() {
        assert_eq!(rating_summary(&[]), (0.0, 0));
        assert_eq!(rating_summary(&[4]), (4.0, 1));
        assert_eq!(rating_summary(&[5, 4, 3]), (4.0, 3));
    }
}
