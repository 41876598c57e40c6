//! Full event path across all three services on one shared bus:
//! an order write fans out to the inventory reconciler and the analytics
//! consumer, each committing to its own store.

use e2e_tests::broker_for;
use futures::StreamExt;
use message_bus::{BusTransport, Envelope, InMemoryTransport};
use order_service::{InMemoryOrderStore, OrderEventPublisher, OrderItem, OrderService};
use product_service::{
    start_reconciler, InMemoryProductStore, InventoryLowPayload, ProductStore,
};
use std::sync::Arc;
use std::time::Duration;
use user_service::{start_analytics_consumer, InMemoryUserStore, UserStore};

struct Platform {
    bus: InMemoryTransport,
    orders: OrderService,
    product_store: Arc<InMemoryProductStore>,
    product_broker: Arc<message_bus::BrokerClient>,
    user_store: Arc<InMemoryUserStore>,
    user_broker: Arc<message_bus::BrokerClient>,
}

/// Wire all three services onto one in-memory bus
async fn platform() -> Platform {
    let bus = InMemoryTransport::new();

    let product_broker = Arc::new(broker_for(&bus, "product"));
    let product_store = Arc::new(InMemoryProductStore::new());
    start_reconciler(product_broker.clone(), product_store.clone())
        .await
        .expect("reconciler starts");

    let user_broker = Arc::new(broker_for(&bus, "user"));
    let user_store = Arc::new(InMemoryUserStore::new());
    start_analytics_consumer(user_broker.clone(), user_store.clone())
        .await
        .expect("analytics starts");

    let order_broker = Arc::new(broker_for(&bus, "order"));
    let orders = OrderService::new(
        Arc::new(InMemoryOrderStore::new()),
        OrderEventPublisher::new(order_broker),
    );

    Platform {
        bus,
        orders,
        product_store,
        product_broker,
        user_store,
        user_broker,
    }
}

async fn wait_for_stock(store: &InMemoryProductStore, product_id: &str, expected: i64) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if store.get_stock(product_id).await.unwrap() == Some(expected) {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for stock of {} to reach {}",
            product_id,
            expected
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn item(product_id: &str, quantity: i64, unit_price_minor: i64) -> OrderItem {
    OrderItem {
        product_id: product_id.to_string(),
        quantity,
        unit_price_minor,
    }
}

#[tokio::test]
async fn order_write_reaches_both_consumers() {
    let p = platform().await;
    p.product_store.set_stock("p1", 15);
    let mut low = p.bus.subscribe("inventory.low", "probe").await.unwrap();

    let order = p
        .orders
        .create_order("u1", vec![item("p1", 10, 300)])
        .await
        .unwrap();

    // inventory side: 15 - 10 = 5, below the threshold of 10
    wait_for_stock(&p.product_store, "p1", 5).await;
    let delivery = tokio::time::timeout(Duration::from_secs(1), low.next())
        .await
        .expect("timeout waiting for inventory.low")
        .expect("stream ended");
    let signal: Envelope<InventoryLowPayload> = Envelope::decode(&delivery.payload).unwrap();
    assert_eq!(signal.payload.product_id, "p1");
    assert_eq!(signal.payload.quantity, 5);

    // analytics side: one order, full committed total
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let stats = p.user_store.get_stats("u1").await.unwrap();
        if stats.order_count == 1 {
            assert_eq!(stats.total_spent_minor, order.total_amount_minor);
            assert_eq!(stats.total_spent_minor, 3000);
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for user statistics"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    p.product_broker.close().await;
    p.user_broker.close().await;
}

#[tokio::test]
async fn cancelling_an_order_restores_stock_across_services() {
    let p = platform().await;
    p.product_store.set_stock("p1", 40);
    p.product_store.set_stock("p2", 40);

    let order = p
        .orders
        .create_order("u1", vec![item("p1", 3, 100), item("p2", 5, 200)])
        .await
        .unwrap();
    wait_for_stock(&p.product_store, "p1", 37).await;
    wait_for_stock(&p.product_store, "p2", 35).await;

    p.orders.cancel_order(&order.id).await.unwrap();
    wait_for_stock(&p.product_store, "p1", 40).await;
    wait_for_stock(&p.product_store, "p2", 40).await;

    p.product_broker.close().await;
    p.user_broker.close().await;
}

#[tokio::test]
async fn status_updates_do_not_touch_stock_or_stats() {
    let p = platform().await;
    p.product_store.set_stock("p1", 40);

    let order = p
        .orders
        .create_order("u1", vec![item("p1", 2, 100)])
        .await
        .unwrap();
    wait_for_stock(&p.product_store, "p1", 38).await;

    p.orders
        .update_status(&order.id, order_service::OrderStatus::Shipped)
        .await
        .unwrap();

    // give the buses a moment; nothing should change
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(p.product_store.get_stock("p1").await.unwrap(), Some(38));
    let stats = p.user_store.get_stats("u1").await.unwrap();
    assert_eq!(stats.order_count, 1);

    p.product_broker.close().await;
    p.user_broker.close().await;
}
