mod common;

use becathlon::carts::{self, CartOwner};
use becathlon::delivery::{DeliveryStatus, DeliveryTimeline};
use becathlon::error::ShopError;
use becathlon::insertables::NewShippingAddress;
use becathlon::models::{Order, OrderStatus, PaymentStatus};
use becathlon::orders::{self, CheckoutRequest};
use becathlon::schema::{orders as orders_table, products};
use chrono::{Duration, Utc};
use common::price;
use diesel::prelude::*;

fn request() -> CheckoutRequest {
    CheckoutRequest {
        address: NewShippingAddress {
            user_id: None,
            full_name: "John Doe".into(),
            phone_number: "+62123456789".into(),
            address_line1: "123 Main St".into(),
            address_line2: String::new(),
            city: "Jakarta".into(),
            state: "DKI Jakarta".into(),
            postal_code: "12345".into(),
            country: "Indonesia".into(),
        },
        payment_method: Some("CREDIT_CARD".into()),
    }
}

#[test]
fn checkout_decrements_stock_and_keeps_price_snapshot() {
    let Some(mut conn) = common::connection() else { return };
    let conn = &mut conn;
    let buyer = common::user(conn, "checkout_buyer");
    let kind = common::product_type(conn, "Checkout Running");
    let shoes = common::product(conn, &kind, &buyer, "Road Shoe", price(9999), 10);
    let socks = common::product(conn, &kind, &buyer, "Socks", price(5000), 5);
    let owner = CartOwner::User(buyer.id);
    carts::add_item(conn, &owner, shoes.id, 2).unwrap();
    carts::add_item(conn, &owner, socks.id, 1).unwrap();

    let timeline = DeliveryTimeline::default();
    let detail = orders::checkout(conn, buyer.id, request(), &timeline).unwrap();

    assert_eq!(detail.order.total_price, price(24998));
    assert_eq!(detail.order.status, OrderStatus::Paid.as_str());
    assert!(detail.order.delivery_started_at.is_some());
    assert_eq!(detail.delivery.delivery_status, DeliveryStatus::Processing);
    let payment = detail.payment.as_ref().expect("payment recorded");
    assert_eq!(payment.status, PaymentStatus::Success.as_str());
    assert_eq!(payment.amount, detail.order.total_price);
    assert!(payment.transaction_id.starts_with("TXN-"));
    assert_eq!(detail.shipping_address.as_ref().unwrap().city, "Jakarta");

    assert_eq!(common::stock_of(conn, shoes.id), 8);
    assert_eq!(common::stock_of(conn, socks.id), 4);
    assert_eq!(carts::find_cart(conn, &owner).unwrap(), None);

    // Repricing the catalog leaves the placed order untouched.
    diesel::update(products::table.find(shoes.id))
        .set(products::price.eq(price(15000)))
        .execute(conn)
        .unwrap();
    let again = orders::order_detail(conn, buyer.id, detail.order.id, &timeline, Utc::now()).unwrap();
    assert_eq!(again.order.total_price, price(24998));
    let shoe_line = again.items.iter().find(|l| l.product_id == shoes.id).unwrap();
    assert_eq!(shoe_line.price, price(9999));
    assert_eq!(shoe_line.subtotal, price(19998));
}

#[test]
fn insufficient_stock_rolls_back_every_line() {
    let Some(mut conn) = common::connection() else { return };
    let conn = &mut conn;
    let buyer = common::user(conn, "short_stock_buyer");
    let kind = common::product_type(conn, "Checkout Cycling");
    let helmet = common::product(conn, &kind, &buyer, "Helmet", price(49900), 10);
    let bottle = common::product(conn, &kind, &buyer, "Bottle", price(5900), 5);
    let owner = CartOwner::User(buyer.id);
    carts::add_item(conn, &owner, helmet.id, 2).unwrap();
    carts::add_item(conn, &owner, bottle.id, 5).unwrap();
    // Someone else bought most of the bottles after they were carted.
    diesel::update(products::table.find(bottle.id))
        .set(products::stock.eq(1))
        .execute(conn)
        .unwrap();

    let err = orders::checkout(conn, buyer.id, request(), &DeliveryTimeline::default()).unwrap_err();
    match err {
        ShopError::InsufficientStock { product, available } => {
            assert_eq!(product, "Bottle");
            assert_eq!(available, 1);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    assert_eq!(common::stock_of(conn, helmet.id), 10);
    assert_eq!(common::stock_of(conn, bottle.id), 1);
    let placed: Vec<Order> = orders_table::table
        .filter(orders_table::user_id.eq(buyer.id))
        .select(Order::as_select())
        .load(conn)
        .unwrap();
    assert!(placed.is_empty());
    let cart = carts::get_summary(conn, &owner).unwrap();
    assert_eq!(cart.item_count, 2);
}

#[test]
fn empty_cart_cannot_check_out() {
    let Some(mut conn) = common::connection() else { return };
    let conn = &mut conn;
    let buyer = common::user(conn, "empty_cart_buyer");
    let err = orders::checkout(conn, buyer.id, request(), &DeliveryTimeline::default()).unwrap_err();
    assert_eq!(err.to_string(), "Your cart is empty.");
}

#[test]
fn orders_of_other_users_are_not_found() {
    let Some(mut conn) = common::connection() else { return };
    let conn = &mut conn;
    let buyer = common::user(conn, "owner_buyer");
    let stranger = common::user(conn, "nosy_stranger");
    let kind = common::product_type(conn, "Checkout Swimming");
    let goggles = common::product(conn, &kind, &buyer, "Goggles", price(9900), 3);
    carts::add_item(conn, &CartOwner::User(buyer.id), goggles.id, 1).unwrap();
    let timeline = DeliveryTimeline::default();
    let detail = orders::checkout(conn, buyer.id, request(), &timeline).unwrap();

    let err = orders::order_detail(conn, stranger.id, detail.order.id, &timeline, Utc::now()).unwrap_err();
    assert!(matches!(err, ShopError::NotFound("Order")));

    let later = Utc::now() + Duration::seconds(121);
    let status = orders::delivery_status(conn, buyer.id, detail.order.id, &timeline, later).unwrap();
    assert!(status.is_delivered);
    assert_eq!(status.progress, 100);

    let history = orders::list_orders(conn, buyer.id, &timeline, Utc::now()).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].total_items, 1);
}
