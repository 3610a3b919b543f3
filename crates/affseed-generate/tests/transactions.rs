use uuid::Uuid;

use affseed_core::{EventLog, EventType, Host, MemoryHost};
use affseed_generate::{
    CountRange, Generate, ProductOptions, Randomizer, SubRequest, Tick, TransactionOptions, Unit,
};

fn event_log() -> EventLog {
    EventLog::new(std::env::temp_dir().join(format!("affseed-transactions-{}", Uuid::new_v4())))
}

#[test]
fn transactions_fill_every_pool() {
    let host = MemoryHost::default();
    let events = event_log();
    let mut generate = Generate::new(&host, &events, Randomizer::seeded(21));

    let mut ticks: Vec<Tick> = Vec::new();
    let batch = generate
        .transactions(
            "edd",
            TransactionOptions {
                number: 20,
                users: SubRequest::Count(5),
                affiliates: SubRequest::Count(2),
                products: SubRequest::Count(6),
                ..TransactionOptions::default()
            },
            &mut |tick| ticks.push(tick),
        )
        .expect("transactions generated");

    assert_eq!(batch.users.len(), 5);
    assert_eq!(batch.affiliates.len(), 2);
    assert_eq!(batch.products.len(), 6);
    assert!(batch.orders.len() <= 20);
    assert_eq!(batch.orders.len() + batch.orders.skipped.len(), 20);

    for id in &batch.orders.ids {
        let order = host.order(*id).expect("stored order");
        assert!(batch.users.ids.contains(&order.customer));
        assert!((1..=4).contains(&order.lines.len()));
        let attribution = order.attribution.expect("referred order");
        assert!(batch.affiliates.ids.contains(&attribution.affiliate_id));
    }

    assert_eq!(ticks.iter().filter(|tick| tick.unit == Unit::Order).count(), 20);
    assert_eq!(ticks.iter().filter(|tick| tick.unit == Unit::Product).count(), 6);

    let logged = events.events();
    assert!(
        logged[&EventType::GeneratorEvent]
            .iter()
            .any(|event| event.code == "transactions_generated")
    );
}

#[test]
fn failing_product_stage_stops_before_orders() {
    let host = MemoryHost::default();
    let events = event_log();
    let mut generate = Generate::new(&host, &events, Randomizer::seeded(22));

    let err = generate
        .transactions(
            "woocommerce",
            TransactionOptions {
                number: 10,
                users: SubRequest::Count(2),
                affiliates: SubRequest::Count(1),
                products: SubRequest::Options(ProductOptions {
                    number: 4,
                    min_price: -5.0,
                    max_price: 10.0,
                }),
                ..TransactionOptions::default()
            },
            &mut |_| {},
        )
        .unwrap_err();

    assert_eq!(err.codes(), vec!["transactions_generation_failed"]);
    let record = err.first().expect("one record");
    assert_eq!(record.context["failed"], serde_json::json!(["products"]));
    let source = record.source.as_deref().expect("stage errors attached");
    assert!(source.has("affseed_min_price_invalid"));

    assert_eq!(host.calls().products_attempted, 0);
    assert_eq!(host.calls().orders_attempted, 0);
}

#[test]
fn transaction_arguments_are_validated_together() {
    let host = MemoryHost::default();
    let events = event_log();
    let mut generate = Generate::new(&host, &events, Randomizer::seeded(23));

    let err = generate
        .transactions(
            "rcp",
            TransactionOptions {
                number: 0,
                users: SubRequest::Count(0),
                affiliates: SubRequest::Count(0),
                products: SubRequest::Count(2),
                products_per_transaction: CountRange::between(1, 4),
                ..TransactionOptions::default()
            },
            &mut |_| {},
        )
        .unwrap_err();

    assert_eq!(
        err.codes(),
        vec![
            "invalid_transaction_number_arg",
            "invalid_transaction_users_arg",
            "invalid_transaction_affiliates_arg",
            "products_per_transaction_max_is_larger_than_products",
        ]
    );
    assert_eq!(host.calls().accounts_attempted, 0);
}

#[test]
fn order_stage_failure_keeps_created_pools() {
    let host = MemoryHost::default();
    host.fail_next_products(3);
    let events = event_log();
    let mut generate = Generate::new(&host, &events, Randomizer::seeded(24));

    let err = generate
        .transactions(
            "edd",
            TransactionOptions {
                number: 5,
                users: SubRequest::Count(2),
                affiliates: SubRequest::Count(1),
                products: SubRequest::Count(3),
                products_per_transaction: CountRange::between(1, 2),
                ..TransactionOptions::default()
            },
            &mut |_| {},
        )
        .unwrap_err();

    assert_eq!(err.codes(), vec!["transactions_generate_order_failed"]);
    let record = err.first().expect("one record");
    assert_eq!(record.context["products"], serde_json::json!([]));
    assert_eq!(record.context["users"].as_array().map(Vec::len), Some(2));
    let source = record.source.as_deref().expect("order errors attached");
    assert!(source.has("products_per_transaction_max_is_larger_than_products"));
    assert_eq!(host.calls().orders_attempted, 0);
}
