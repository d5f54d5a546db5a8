mod common;

use becathlon::carts::{self, CartOwner};
use common::price;

#[test]
fn guest_cart_is_folded_into_user_cart_on_login() {
    let Some(mut conn) = common::connection() else { return };
    let conn = &mut conn;
    let shopper = common::user(conn, "merge_shopper");
    let kind = common::product_type(conn, "Merge Hiking");
    let boots = common::product(conn, &kind, &shopper, "Boots", price(109900), 10);
    let pack = common::product(conn, &kind, &shopper, "Backpack", price(39900), 10);

    let guest = CartOwner::Guest("mergeguestkey".to_owned());
    let user = CartOwner::User(shopper.id);
    carts::add_item(conn, &user, boots.id, 1).unwrap();
    carts::add_item(conn, &guest, boots.id, 2).unwrap();
    carts::add_item(conn, &guest, pack.id, 1).unwrap();

    let outcome = carts::merge_guest_cart(conn, "mergeguestkey", shopper.id)
        .unwrap()
        .expect("guest cart existed");
    assert_eq!(outcome.merged, 1);
    assert_eq!(outcome.moved, 1);

    assert_eq!(carts::find_cart(conn, &guest).unwrap(), None);
    let summary = carts::get_summary(conn, &user).unwrap();
    assert_eq!(summary.item_count, 2);
    assert_eq!(summary.total_items, 4);
    let boots_line = summary.items.iter().find(|l| l.product_id == boots.id).unwrap();
    assert_eq!(boots_line.quantity, 3);
}

#[test]
fn merging_without_a_guest_cart_is_a_no_op() {
    let Some(mut conn) = common::connection() else { return };
    let conn = &mut conn;
    let shopper = common::user(conn, "merge_nothing");
    assert_eq!(carts::merge_guest_cart(conn, "nocartkey", shopper.id).unwrap(), None);
    assert_eq!(carts::find_cart(conn, &CartOwner::User(shopper.id)).unwrap(), None);
}

#[test]
fn adding_beyond_stock_counts_what_is_already_carted() {
    let Some(mut conn) = common::connection() else { return };
    let conn = &mut conn;
    let shopper = common::user(conn, "stock_shopper");
    let kind = common::product_type(conn, "Merge Camping");
    let tent = common::product(conn, &kind, &shopper, "Tent", price(159900), 3);
    let owner = CartOwner::User(shopper.id);

    carts::add_item(conn, &owner, tent.id, 2).unwrap();
    let err = carts::add_item(conn, &owner, tent.id, 2).unwrap_err();
    assert_eq!(err.to_string(), "Only 3 items available in stock.");
    assert_eq!(carts::count_items(conn, &owner).unwrap(), 2);

    let line = carts::get_summary(conn, &owner).unwrap().items[0].id;
    let summary = carts::update_item(conn, &owner, line, 0).unwrap();
    assert_eq!(summary.item_count, 0);
}
