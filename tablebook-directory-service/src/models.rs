use chrono::{DateTime, NaiveTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::{
    categories, companies, company_staff, diners, dining_tables, favorites, outbox, restaurants,
    reviews,
};

#[derive(Queryable, Selectable, Identifiable, Insertable, Debug, PartialEq)]
#[diesel(table_name = companies)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub representative: String,
    pub zipcode: String,
    pub address: String,
    pub business: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Insertable, Debug, PartialEq)]
#[diesel(belongs_to(Company))]
#[diesel(table_name = company_staff, primary_key(company_id, account_id))]
pub struct CompanyStaff {
    pub company_id: Uuid,
    pub account_id: Uuid,
}

#[derive(Queryable, Selectable, Identifiable, Insertable, Debug, PartialEq)]
#[diesel(table_name = categories)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Insertable, Debug, PartialEq)]
#[diesel(belongs_to(Company))]
#[diesel(belongs_to(Category))]
#[diesel(table_name = restaurants)]
pub struct Restaurant {
    pub id: Uuid,
    pub company_id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub description: String,
    pub price_min: i32,
    pub price_max: i32,
    pub open_time: NaiveTime,
    pub close_time: NaiveTime,
    pub zipcode: String,
    pub address: String,
    pub tel: String,
    pub holiday: String,
    pub created_at: DateTime<Utc>,
}

/// Operator-editable subset of a restaurant row.
#[derive(AsChangeset, Debug, PartialEq)]
#[diesel(table_name = restaurants)]
pub struct RestaurantChangeset {
    pub category_id: Uuid,
    pub name: String,
    pub description: String,
    pub price_min: i32,
    pub price_max: i32,
    pub open_time: NaiveTime,
    pub close_time: NaiveTime,
    pub zipcode: String,
    pub address: String,
    pub tel: String,
    pub holiday: String,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Insertable, Debug, PartialEq)]
#[diesel(belongs_to(Restaurant))]
#[diesel(table_name = dining_tables)]
pub struct DiningTable {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub capacity: i32,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Insertable, Debug, PartialEq)]
#[diesel(belongs_to(Restaurant))]
#[diesel(table_name = reviews)]
pub struct Review {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub account_id: Uuid,
    pub rating: i32,
    pub title: String,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Insertable, Debug, PartialEq)]
#[diesel(belongs_to(Restaurant))]
#[diesel(table_name = favorites, primary_key(account_id, restaurant_id))]
pub struct Favorite {
    pub account_id: Uuid,
    pub restaurant_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Insertable, Debug, PartialEq)]
#[diesel(table_name = diners)]
pub struct Diner {
    pub id: Uuid,
    pub name: String,
    pub paid_member: bool,
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
