//! Integration tests for the order status lifecycle.

use std::sync::Arc;

use jiff::Timestamp;
use testresult::TestResult;

use till::{
    cart::Cart,
    order::{
        CustomerDetails, Order, OrderId,
        lifecycle::{OrderStatus, StatusEntry, TransitionError},
        service::{OrdersService, OrdersServiceError},
    },
    store::{OrderStore, OrderStoreError, memory::MemoryOrderStore},
};

async fn placed_order(orders: &OrdersService) -> TestResult<Order> {
    let mut cart = Cart::new();

    cart.add_item("widget", "Widget", 100_00, 1)?;
    cart.apply_coupon(Some("SAVE10"))?;

    let customer = CustomerDetails::new(
        "Ada Lovelace",
        "ada@example.com",
        "12 Analytical Row",
        "+44 20 7946 0000",
    )?;

    Ok(orders.place_order(&mut cart, customer).await?)
}

#[tokio::test]
async fn full_cycle_records_three_history_entries() -> TestResult {
    let orders = OrdersService::new(Arc::new(MemoryOrderStore::new()));
    let placed = placed_order(&orders).await?;

    orders
        .transition_order(placed.order_id(), OrderStatus::Processing, None)
        .await?;

    let delivered = orders
        .transition_order(
            placed.order_id(),
            OrderStatus::Delivered,
            Some("Left with the concierge".to_string()),
        )
        .await?;

    assert_eq!(delivered.status(), OrderStatus::Delivered);

    let history = delivered.status_history();

    assert_eq!(history.len(), 3);

    let statuses: Vec<OrderStatus> = history.iter().map(StatusEntry::status).collect();

    assert_eq!(
        statuses,
        vec![
            OrderStatus::Placed,
            OrderStatus::Processing,
            OrderStatus::Delivered
        ]
    );

    let notes: Vec<&str> = history.iter().map(StatusEntry::note).collect();

    assert_eq!(
        notes,
        vec![
            "Status changed to Placed",
            "Status changed to Processing",
            "Left with the concierge"
        ]
    );

    for pair in history.windows(2) {
        let [earlier, later] = pair else {
            continue;
        };

        assert!(
            earlier.changed_at() <= later.changed_at(),
            "history timestamps must not go backwards"
        );
    }

    assert_eq!(
        history.last().map(StatusEntry::changed_at),
        Some(delivered.updated_at())
    );

    Ok(())
}

#[tokio::test]
async fn delivery_requires_processing_first() -> TestResult {
    let orders = OrdersService::new(Arc::new(MemoryOrderStore::new()));
    let placed = placed_order(&orders).await?;

    let result = orders
        .transition_order(placed.order_id(), OrderStatus::Delivered, None)
        .await;

    match result {
        Err(OrdersServiceError::Transition(TransitionError::Illegal { from, allowed, .. })) => {
            assert_eq!(from, OrderStatus::Placed);
            assert_eq!(allowed, &[OrderStatus::Processing, OrderStatus::Cancelled]);
        }
        other => panic!("expected Illegal transition, got {other:?}"),
    }

    let untouched = orders.order(placed.order_id()).await?;

    assert_eq!(untouched.status(), OrderStatus::Placed);
    assert_eq!(untouched.status_history().len(), 1);

    Ok(())
}

#[tokio::test]
async fn terminal_statuses_reject_every_move() -> TestResult {
    let orders = OrdersService::new(Arc::new(MemoryOrderStore::new()));
    let placed = placed_order(&orders).await?;

    orders
        .transition_order(placed.order_id(), OrderStatus::Cancelled, None)
        .await?;

    for target in [
        OrderStatus::Placed,
        OrderStatus::Processing,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ] {
        let result = orders
            .transition_order(placed.order_id(), target, None)
            .await;

        assert!(
            matches!(
                result,
                Err(OrdersServiceError::Transition(TransitionError::Illegal { .. }))
            ),
            "cancelled order accepted a move to {target}"
        );
    }

    let cancelled = orders.order(placed.order_id()).await?;

    assert_eq!(cancelled.status(), OrderStatus::Cancelled);
    assert_eq!(cancelled.status_history().len(), 2);

    Ok(())
}

#[tokio::test]
async fn racing_updates_with_the_same_expectation_land_once() -> TestResult {
    let store = MemoryOrderStore::new();
    let orders = OrdersService::new(Arc::new(store.clone()));
    let placed = placed_order(&orders).await?;

    orders
        .transition_order(placed.order_id(), OrderStatus::Processing, None)
        .await?;

    // Both updates expect Processing; the store lets only the first land.
    let deliver = store.update_status(
        placed.order_id(),
        OrderStatus::Processing,
        StatusEntry::new(OrderStatus::Delivered, None, Timestamp::now()),
    );
    let cancel = store.update_status(
        placed.order_id(),
        OrderStatus::Processing,
        StatusEntry::new(OrderStatus::Cancelled, None, Timestamp::now()),
    );

    let (deliver, cancel) = tokio::join!(deliver, cancel);

    let lost: Vec<OrderStoreError> = [deliver, cancel]
        .into_iter()
        .filter_map(Result::err)
        .collect();

    assert_eq!(lost.len(), 1, "exactly one racing update should land");
    assert!(
        matches!(lost.first(), Some(OrderStoreError::Conflict)),
        "loser should see a conflict: {lost:?}"
    );

    let settled = orders.order(placed.order_id()).await?;

    assert!(settled.status().is_terminal());
    assert_eq!(settled.status_history().len(), 3);

    Ok(())
}

#[tokio::test]
async fn transition_of_unknown_order_is_not_found() {
    let orders = OrdersService::new(Arc::new(MemoryOrderStore::new()));

    let result = orders
        .transition_order(&OrderId::from("ORDMISSING"), OrderStatus::Processing, None)
        .await;

    assert!(
        matches!(result, Err(OrdersServiceError::NotFound)),
        "expected NotFound, got {result:?}"
    );
}
