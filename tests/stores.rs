mod common;

use becathlon::schema::stores as stores_table;
use becathlon::stores::{self, StoreQuery};
use diesel::pg::PgConnection;
use diesel::prelude::*;

fn store(conn: &mut PgConnection, name: &str, city: &str) {
    diesel::insert_into(stores_table::table)
        .values((
            stores_table::name.eq(name),
            stores_table::address.eq("Jl. Sudirman 1"),
            stores_table::city.eq(city),
            stores_table::latitude.eq(-6.2),
            stores_table::longitude.eq(106.8),
            stores_table::store_hours.eq("10:00-22:00"),
        ))
        .execute(conn)
        .expect("insert store");
}

#[test]
fn search_treats_wildcards_literally() {
    let Some(mut conn) = common::connection() else { return };
    let conn = &mut conn;
    store(conn, "Locator 100% Sport", "Locator City");
    store(conn, "Locator 1000 Sport", "Locator City");
    store(conn, "Locator A_B Outlet", "Locator City");
    store(conn, "Locator AXB Outlet", "Locator City");

    let names = |conn: &mut PgConnection, q: &str| -> Vec<String> {
        let query = StoreQuery {
            q: Some(q.to_owned()),
            nearby: None,
        };
        stores::search_stores(conn, &query)
            .unwrap()
            .into_iter()
            .map(|view| view.store.name)
            .collect()
    };

    assert_eq!(names(conn, "100%"), ["Locator 100% Sport"]);
    assert_eq!(names(conn, "A_B"), ["Locator A_B Outlet"]);
    assert_eq!(names(conn, "locator city").len(), 4);
}
