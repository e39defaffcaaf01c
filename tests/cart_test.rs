mod db_utils;

use uuid::Uuid;

use vendora_server::bus::types::ProductUpdated;
use vendora_server::bus::{DomainEvent, EventHandler};
use vendora_server::cart::{store, CartProjectionHandler};
use vendora_server::clients::ProductInfo;

fn keyboard() -> ProductInfo {
    ProductInfo {
        id: "prod-1".to_string(),
        name: "Keyboard".to_string(),
        image: "https://cdn.example.com/kb.png".to_string(),
        price_cents: 500,
    }
}

#[tokio::test]
async fn product_update_refreshes_price_but_not_quantity() {
    let pool = db_utils::spawn_db().await;
    let user = Uuid::new_v4();

    let item = store::add_to_cart(&pool, user, &keyboard(), 2)
        .await
        .expect("add failed");
    assert_eq!(item.price_cents, 500);
    assert_eq!(item.quantity, 2);

    let rows = store::apply_product_update(&pool, "prod-1", "Keyboard", "", 450)
        .await
        .expect("update failed");
    assert_eq!(rows, 1);

    let cart = store::get_cart(&pool, user).await.expect("get failed");
    assert_eq!(cart.len(), 1);
    assert_eq!(cart[0].price_cents, 450);
    assert_eq!(cart[0].quantity, 2);
}

#[tokio::test]
async fn replayed_product_update_leaves_state_unchanged() {
    let pool = db_utils::spawn_db().await;
    let user = Uuid::new_v4();
    store::add_to_cart(&pool, user, &keyboard(), 3)
        .await
        .expect("add failed");

    // At-least-once delivery: the same update can arrive twice. The second
    // application must land on the exact same state.
    for _ in 0..2 {
        store::apply_product_update(&pool, "prod-1", "Mechanical Keyboard", "", 450)
            .await
            .expect("update failed");
    }

    let cart = store::get_cart(&pool, user).await.expect("get failed");
    assert_eq!(cart.len(), 1);
    assert_eq!(cart[0].name, "Mechanical Keyboard");
    assert_eq!(cart[0].price_cents, 450);
    assert_eq!(cart[0].quantity, 3);
}

#[tokio::test]
async fn update_for_product_in_no_cart_touches_nothing() {
    let pool = db_utils::spawn_db().await;

    let rows = store::apply_product_update(&pool, "prod-unknown", "Ghost", "", 100)
        .await
        .expect("update failed");
    assert_eq!(rows, 0);
}

#[tokio::test]
async fn repeated_add_bumps_quantity_on_one_line() {
    let pool = db_utils::spawn_db().await;
    let user = Uuid::new_v4();

    store::add_to_cart(&pool, user, &keyboard(), 1)
        .await
        .expect("add failed");
    let item = store::add_to_cart(&pool, user, &keyboard(), 2)
        .await
        .expect("add failed");

    assert_eq!(item.quantity, 3);
    let cart = store::get_cart(&pool, user).await.expect("get failed");
    assert_eq!(cart.len(), 1);
}

#[tokio::test]
async fn projection_handler_is_replay_safe() {
    let pool = db_utils::spawn_db().await;
    let user = Uuid::new_v4();
    store::add_to_cart(&pool, user, &keyboard(), 2)
        .await
        .expect("add failed");

    let handler = CartProjectionHandler::new(pool.clone());
    let event = DomainEvent::ProductUpdated(ProductUpdated {
        id: "prod-1".to_string(),
        name: "Keyboard".to_string(),
        image: String::new(),
        price_cents: 450,
    });

    handler.handle(event.clone()).await.expect("first delivery failed");
    handler.handle(event).await.expect("redelivery failed");

    let cart = store::get_cart(&pool, user).await.expect("get failed");
    assert_eq!(cart[0].price_cents, 450);
    assert_eq!(cart[0].quantity, 2);
}

#[tokio::test]
async fn remove_reports_whether_a_line_existed() {
    let pool = db_utils::spawn_db().await;
    let user = Uuid::new_v4();
    store::add_to_cart(&pool, user, &keyboard(), 1)
        .await
        .expect("add failed");

    assert!(store::remove_from_cart(&pool, user, "prod-1")
        .await
        .expect("remove failed"));
    assert!(!store::remove_from_cart(&pool, user, "prod-1")
        .await
        .expect("remove failed"));
}
