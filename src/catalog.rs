//! Product catalog: listing with filters, detail pages and product CRUD.

use diesel::dsl::count_star;
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ShopError;
use crate::insertables::NewProduct;
use crate::models::{Product, ProductType};
use crate::schema::{order_items, product_types, products};

pub const PAGE_SIZE: i64 = 20;
/// Prices are NUMERIC(10, 2).
const PRICE_CEILING: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);
const RELATED_LIMIT: i64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Newest,
    PriceLow,
    PriceHigh,
    NameAsc,
    NameDesc,
}

impl SortOrder {
    /// Unknown values fall back to newest first.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("price_low") => SortOrder::PriceLow,
            Some("price_high") => SortOrder::PriceHigh,
            Some("name_asc") => SortOrder::NameAsc,
            Some("name_desc") => SortOrder::NameDesc,
            _ => SortOrder::Newest,
        }
    }
}

/// Raw query string of `GET products`. Every field is kept as text so a
/// malformed value is ignored instead of failing the request.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ProductFilterParams {
    pub search: Option<String>,
    pub categories: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub in_stock_only: Option<String>,
    pub sort_by: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category_ids: Vec<i32>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub in_stock_only: bool,
    pub sort: SortOrder,
    pub page: i64,
}

fn truthy(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "1" | "on" | "yes")
}

impl From<ProductFilterParams> for ProductFilter {
    fn from(params: ProductFilterParams) -> Self {
        let decimal = |raw: &Option<String>| raw.as_deref().and_then(|s| s.trim().parse().ok());
        ProductFilter {
            search: params
                .search
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty()),
            category_ids: params
                .categories
                .as_deref()
                .map(|raw| raw.split(',').filter_map(|id| id.trim().parse().ok()).collect())
                .unwrap_or_default(),
            min_price: decimal(&params.min_price),
            max_price: decimal(&params.max_price),
            in_stock_only: params.in_stock_only.as_deref().is_some_and(truthy),
            sort: SortOrder::parse(params.sort_by.as_deref()),
            page: params
                .page
                .as_deref()
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub total_count: i64,
    pub total_pages: i64,
    pub current_page: i64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl Page {
    /// Clamps `requested` into `1..=total_pages`; an empty result still has
    /// one (empty) page.
    pub fn new(total_count: i64, requested: i64, per_page: i64) -> Self {
        let total_pages = ((total_count + per_page - 1) / per_page).max(1);
        let current_page = requested.clamp(1, total_pages);
        Page {
            total_count,
            total_pages,
            current_page,
            has_next: current_page < total_pages,
            has_previous: current_page > 1,
        }
    }

    pub fn offset(&self, per_page: i64) -> i64 {
        (self.current_page - 1) * per_page
    }
}

/// `%term%` with LIKE wildcards in `term` escaped.
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

type FilteredProducts<'a> = products::BoxedQuery<'a, Pg>;

fn filtered(filter: &ProductFilter) -> FilteredProducts<'_> {
    let mut query = products::table.into_boxed();
    if let Some(term) = &filter.search {
        let pattern = like_pattern(term);
        query = query.filter(
            products::name
                .ilike(pattern.clone())
                .or(products::description.ilike(pattern)),
        );
    }
    if !filter.category_ids.is_empty() {
        query = query.filter(products::product_type_id.eq_any(&filter.category_ids));
    }
    if let Some(min) = filter.min_price {
        query = query.filter(products::price.ge(min));
    }
    if let Some(max) = filter.max_price {
        query = query.filter(products::price.le(max));
    }
    if filter.in_stock_only {
        query = query.filter(products::stock.gt(0));
    }
    query
}

#[derive(Serialize, Debug, Clone)]
pub struct ProductCard {
    #[serde(flatten)]
    pub product: Product,
    pub product_type: String,
    pub in_stock: bool,
}

#[derive(Serialize, Debug, Clone)]
pub struct ProductPage {
    pub products: Vec<ProductCard>,
    #[serde(flatten)]
    pub page: Page,
}

fn with_type_names(
    conn: &mut PgConnection,
    list: Vec<Product>,
) -> QueryResult<Vec<ProductCard>> {
    let type_ids: Vec<i32> = list.iter().map(|p| p.product_type_id).collect();
    let names: Vec<(i32, String)> = product_types::table
        .filter(product_types::id.eq_any(type_ids))
        .select((product_types::id, product_types::name))
        .load(conn)?;
    Ok(list
        .into_iter()
        .map(|product| {
            let product_type = names
                .iter()
                .find(|(id, _)| *id == product.product_type_id)
                .map(|(_, name)| name.clone())
                .unwrap_or_default();
            ProductCard {
                in_stock: product.in_stock(),
                product_type,
                product,
            }
        })
        .collect())
}

pub fn list_products(
    conn: &mut PgConnection,
    filter: &ProductFilter,
) -> Result<ProductPage, ShopError> {
    let total_count: i64 = filtered(filter).count().get_result(conn)?;
    let page = Page::new(total_count, filter.page, PAGE_SIZE);

    let query = filtered(filter);
    let query = match filter.sort {
        SortOrder::Newest => query.order((products::created_at.desc(), products::id.desc())),
        SortOrder::PriceLow => query.order((products::price.asc(), products::id.asc())),
        SortOrder::PriceHigh => query.order((products::price.desc(), products::id.asc())),
        SortOrder::NameAsc => query.order((products::name.asc(), products::id.asc())),
        SortOrder::NameDesc => query.order((products::name.desc(), products::id.asc())),
    };
    let list = query
        .limit(PAGE_SIZE)
        .offset(page.offset(PAGE_SIZE))
        .select(Product::as_select())
        .load(conn)?;

    Ok(ProductPage {
        products: with_type_names(conn, list)?,
        page,
    })
}

#[derive(Serialize, Debug, Clone)]
pub struct ProductTypeCount {
    #[serde(flatten)]
    pub product_type: ProductType,
    pub product_count: i64,
}

pub fn list_product_types(conn: &mut PgConnection) -> Result<Vec<ProductTypeCount>, ShopError> {
    let types = product_types::table
        .order(product_types::name.asc())
        .select(ProductType::as_select())
        .load(conn)?;
    let counts: Vec<(i32, i64)> = products::table
        .group_by(products::product_type_id)
        .select((products::product_type_id, count_star()))
        .load(conn)?;
    Ok(types
        .into_iter()
        .map(|product_type| ProductTypeCount {
            product_count: counts
                .iter()
                .find(|(id, _)| *id == product_type.id)
                .map_or(0, |(_, n)| *n),
            product_type,
        })
        .collect())
}

fn find_product(conn: &mut PgConnection, product_id: i32) -> Result<Product, ShopError> {
    products::table
        .find(product_id)
        .select(Product::as_select())
        .first(conn)
        .optional()?
        .ok_or(ShopError::NotFound("Product"))
}

#[derive(Serialize, Debug, Clone)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: ProductCard,
    pub related_products: Vec<ProductCard>,
}

pub fn product_detail(conn: &mut PgConnection, product_id: i32) -> Result<ProductDetail, ShopError> {
    let product = find_product(conn, product_id)?;
    let related = products::table
        .filter(products::product_type_id.eq(product.product_type_id))
        .filter(products::id.ne(product.id))
        .order((products::created_at.desc(), products::id.desc()))
        .limit(RELATED_LIMIT)
        .select(Product::as_select())
        .load(conn)?;

    let mut cards = with_type_names(conn, vec![product])?;
    let product = cards.pop().ok_or(ShopError::NotFound("Product"))?;
    Ok(ProductDetail {
        product,
        related_products: with_type_names(conn, related)?,
    })
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct QuickView {
    pub id: i32,
    pub name: String,
    pub price: Decimal,
    pub product_type: String,
    pub description: String,
    pub stock: i32,
    pub image_url: Option<String>,
    pub rating: Decimal,
    pub rating_count: i32,
    pub in_stock: bool,
}

pub fn quick_view(conn: &mut PgConnection, product_id: i32) -> Result<QuickView, ShopError> {
    let (product, product_type): (Product, String) = products::table
        .inner_join(product_types::table)
        .filter(products::id.eq(product_id))
        .select((Product::as_select(), product_types::name))
        .first(conn)
        .optional()?
        .ok_or(ShopError::NotFound("Product"))?;
    Ok(QuickView {
        in_stock: product.in_stock(),
        id: product.id,
        name: product.name,
        price: product.price,
        product_type,
        description: product.description,
        stock: product.stock,
        image_url: product.image_url,
        rating: product.rating,
        rating_count: product.rating_count,
    })
}

pub fn validate_new_product(product: &NewProduct) -> Result<(), ShopError> {
    let name = product.name.trim();
    if name.is_empty() {
        return Err(ShopError::validation("Product name is required."));
    }
    if name.chars().count() > 200 {
        return Err(ShopError::validation(
            "Product name must be at most 200 characters.",
        ));
    }
    if product.price < Decimal::ZERO {
        return Err(ShopError::validation("Price cannot be negative."));
    }
    if product.price >= PRICE_CEILING {
        return Err(ShopError::validation("Price must be less than 100000000."));
    }
    if product.stock < 0 {
        return Err(ShopError::validation("Stock cannot be negative."));
    }
    Ok(())
}

pub fn create_product(
    conn: &mut PgConnection,
    user_id: i32,
    mut product: NewProduct,
) -> Result<Product, ShopError> {
    validate_new_product(&product)?;
    product.name = product.name.trim().to_owned();
    product.price = product.price.round_dp(2);
    product.created_by = user_id;

    let type_exists: i64 = product_types::table
        .filter(product_types::id.eq(product.product_type_id))
        .count()
        .get_result(conn)?;
    if type_exists == 0 {
        return Err(ShopError::validation("Unknown product type."));
    }

    let created = diesel::insert_into(products::table)
        .values(&product)
        .returning(Product::as_returning())
        .get_result(conn)?;
    tracing::info!(product_id = created.id, user_id, "product created");
    Ok(created)
}

pub fn delete_product(conn: &mut PgConnection, user_id: i32, product_id: i32) -> Result<(), ShopError> {
    conn.transaction(|conn| {
        let product = find_product(conn, product_id)?;
        if product.created_by != user_id {
            return Err(ShopError::Forbidden(
                "You can only delete your own products.".to_owned(),
            ));
        }
        let ordered: i64 = order_items::table
            .filter(order_items::product_id.eq(product_id))
            .count()
            .get_result(conn)?;
        if ordered > 0 {
            return Err(ShopError::Conflict(
                "Product has been ordered and cannot be deleted.".to_owned(),
            ));
        }
        diesel::delete(products::table.find(product_id)).execute(conn)?;
        tracing::info!(product_id, user_id, "product deleted");
        Ok(())
    })
}
