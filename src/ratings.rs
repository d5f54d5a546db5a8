//! Product ratings left by customers on delivered orders.

use chrono::{DateTime, Utc};
use diesel::dsl::{avg, count};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::delivery::DeliveryTimeline;
use crate::error::ShopError;
use crate::insertables::NewProductRating;
use crate::models::{Order, OrderItem, ProductRating};
use crate::schema::{order_items, orders, product_ratings, products, users};

#[derive(Deserialize, Debug, Clone)]
pub struct RatingRequest {
    pub product_id: i32,
    pub rating: i32,
    #[serde(default)]
    pub review: String,
}

pub fn validate_rating(rating: i32) -> Result<i16, ShopError> {
    match i16::try_from(rating) {
        Ok(value @ 1..=5) => Ok(value),
        _ => Err(ShopError::validation("Rating must be between 1 and 5.")),
    }
}

/// Aggregate shown on a product: average rounded to two places.
pub fn aggregate_rating(average: Option<Decimal>) -> Decimal {
    average.map(|avg| avg.round_dp(2)).unwrap_or(Decimal::ZERO)
}

fn refresh_product_rating(conn: &mut PgConnection, product_id: i32) -> QueryResult<(Decimal, i32)> {
    let (average, total): (Option<Decimal>, i64) = product_ratings::table
        .filter(product_ratings::product_id.eq(product_id))
        .select((avg(product_ratings::rating), count(product_ratings::id)))
        .first(conn)?;
    let rating = aggregate_rating(average);
    let rating_count = i32::try_from(total).unwrap_or(i32::MAX);
    diesel::update(products::table.find(product_id))
        .set((
            products::rating.eq(rating),
            products::rating_count.eq(rating_count),
        ))
        .execute(conn)?;
    Ok((rating, rating_count))
}

pub fn submit_rating(
    conn: &mut PgConnection,
    user_id: i32,
    order_id: i32,
    request: &RatingRequest,
    timeline: &DeliveryTimeline,
    now: DateTime<Utc>,
) -> Result<ProductRating, ShopError> {
    conn.transaction(|conn| {
        let order = orders::table
            .find(order_id)
            .filter(orders::user_id.eq(user_id))
            .select(Order::as_select())
            .first(conn)
            .optional()?
            .ok_or(ShopError::NotFound("Order"))?;

        if !timeline.progress(order.delivery_started_at, now).is_delivered {
            return Err(ShopError::validation(
                "You can only rate products after delivery.",
            ));
        }

        let item = order_items::table
            .filter(order_items::order_id.eq(order.id))
            .filter(order_items::product_id.eq(request.product_id))
            .select(OrderItem::as_select())
            .first(conn)
            .optional()?
            .ok_or_else(|| ShopError::validation("Product is not in this order."))?;
        let rating = validate_rating(request.rating)?;

        let already_rated: i64 = product_ratings::table
            .filter(product_ratings::user_id.eq(user_id))
            .filter(product_ratings::product_id.eq(request.product_id))
            .count()
            .get_result(conn)?;
        if already_rated > 0 {
            return Err(ShopError::Conflict(
                "You have already rated this product.".to_owned(),
            ));
        }

        let created = diesel::insert_into(product_ratings::table)
            .values(&NewProductRating {
                user_id,
                product_id: request.product_id,
                order_item_id: item.id,
                rating,
                review: request.review.trim(),
            })
            .returning(ProductRating::as_returning())
            .get_result(conn)?;

        let (average, rating_count) = refresh_product_rating(conn, request.product_id)?;
        tracing::info!(
            product_id = request.product_id,
            user_id,
            rating,
            average = %average,
            rating_count,
            "product rated"
        );
        Ok(created)
    })
}

#[derive(Serialize, Debug, Clone)]
pub struct RatingView {
    pub id: i32,
    pub username: String,
    pub rating: i16,
    pub review: String,
    pub created_at: DateTime<Utc>,
}

pub fn list_ratings(conn: &mut PgConnection, product_id: i32) -> Result<Vec<RatingView>, ShopError> {
    let exists: i64 = products::table
        .filter(products::id.eq(product_id))
        .count()
        .get_result(conn)?;
    if exists == 0 {
        return Err(ShopError::NotFound("Product"));
    }

    let rows: Vec<(ProductRating, String)> = product_ratings::table
        .inner_join(users::table)
        .filter(product_ratings::product_id.eq(product_id))
        .order((product_ratings::created_at.desc(), product_ratings::id.desc()))
        .select((ProductRating::as_select(), users::username))
        .load(conn)?;
    Ok(rows
        .into_iter()
        .map(|(rating, username)| RatingView {
            id: rating.id,
            username,
            rating: rating.rating,
            review: rating.review,
            created_at: rating.created_at,
        })
        .collect())
}
