use std::path::PathBuf;

use affseed_core::{
    AffiliateFields, AttributionContext, CartLine, Host, MemoryConfig, MemoryHost, NewAccount,
    NewOrder, NewProduct,
};

fn account(login: &str) -> NewAccount {
    NewAccount {
        login: login.to_string(),
        password: "secret".to_string(),
        email: format!("{login}@example.com"),
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
    }
}

fn product(name: &str, price: f64) -> NewProduct {
    NewProduct {
        backend: "woocommerce".to_string(),
        name: name.to_string(),
        price,
        status: "publish".to_string(),
        variable_prices: Vec::new(),
        meta: Default::default(),
    }
}

fn order(customer: u64, product_id: u64, total: f64) -> NewOrder {
    NewOrder {
        backend: "woocommerce".to_string(),
        customer,
        email: "ada@example.com".to_string(),
        lines: vec![CartLine {
            product_id,
            name: "Widget".to_string(),
            price_id: None,
            quantity: 1,
            item_price: total,
            subtotal: total,
            tax: 0.0,
        }],
        subtotal: total,
        tax: 0.0,
        total,
        currency: "USD".to_string(),
        status: "completed".to_string(),
        purchase_key: None,
        billing: None,
        created: None,
        attribution: None,
    }
}

#[test]
fn duplicate_logins_are_rejected() {
    let host = MemoryHost::default();
    assert_eq!(host.create_account(&account("ada")).expect("first account"), 1);

    let duplicate = host.create_account(&account("ada")).unwrap_err();
    assert!(duplicate.has("existing_user_login"));
    assert_eq!(host.calls().accounts_attempted, 2);
}

#[test]
fn attributed_orders_create_referrals() {
    let host = MemoryHost::default();
    let customer = host.create_account(&account("customer")).expect("customer");
    let partner = host.create_account(&account("partner")).expect("partner");
    let affiliate = host
        .create_affiliate(&AffiliateFields {
            user_id: partner,
            status: "active".to_string(),
            date_registered: None,
            rate: 10.0,
            rate_type: "percentage".to_string(),
            payment_email: "partner@example.com".to_string(),
            earnings: 0.0,
            referrals: 0,
            visits: 0,
            website_url: None,
        })
        .expect("affiliate");
    let product_id = host.insert_product(&product("Widget", 50.0)).expect("product");
    let visit_id = host.record_visit("woocommerce", affiliate, "spring").expect("visit");

    let mut new_order = order(customer, product_id, 50.0);
    new_order.attribution = Some(AttributionContext {
        affiliate_id: affiliate,
        visit_id,
        campaign: "spring".to_string(),
    });
    let order_id = host.insert_order(&new_order).expect("order");

    let referral = host
        .find_referral_by_reference("woocommerce", order_id)
        .expect("referral recorded");
    assert_eq!(referral.affiliate_id, affiliate);
    assert_eq!(referral.campaign, "spring");
    assert_eq!(referral.amount, 5.0);
    assert_eq!(host.affiliate(affiliate).map(|record| record.referrals), Some(1));
}

#[test]
fn orders_for_unknown_records_accumulate_errors() {
    let host = MemoryHost::default();
    let errors = host.insert_order(&order(42, 7, 10.0)).unwrap_err();
    assert_eq!(errors.codes(), vec!["invalid_customer", "invalid_product"]);
}

#[test]
fn injected_failures_are_consumed_in_order() {
    let host = MemoryHost::default();
    host.fail_next_products(1);

    assert!(host.insert_product(&product("First", 1.0)).is_err());
    assert!(host.insert_product(&product("Second", 2.0)).is_ok());
    assert_eq!(host.calls().products_attempted, 2);
}

#[test]
fn unknown_integrations_fail_lookup() {
    let host = MemoryHost::default();
    assert!(host.lookup_integration("woocommerce").is_ok());

    let errors = host.lookup_integration("shopify").unwrap_err();
    assert!(errors.has("integration_not_registered"));
}

#[test]
fn partial_integration_config_keeps_the_other_integrations() {
    let config: MemoryConfig = serde_json::from_value(serde_json::json!({
        "integrations": { "edd": { "tax_rate": 0.2 } }
    }))
    .expect("valid config");

    assert_eq!(config.integrations["edd"].tax_rate, 0.2);
    assert!(config.integrations["edd"].plugin_active);
    let host = MemoryHost::new(config);
    assert!(host.lookup_integration("woocommerce").is_ok());
    assert!(host.lookup_integration("rcp").is_ok());
}

#[test]
fn tax_follows_the_integration_rate() {
    let mut config = MemoryConfig::default();
    if let Some(edd) = config.integrations.get_mut("edd") {
        edd.tax_rate = 0.1;
    }
    let host = MemoryHost::new(config);

    assert_eq!(host.calculate_tax("edd", 19.99), 2.0);
    assert_eq!(host.calculate_tax("woocommerce", 19.99), 0.0);
}

#[test]
fn state_round_trips_through_a_file() {
    let path: PathBuf =
        std::env::temp_dir().join(format!("affseed_state_{}.json", uuid::Uuid::new_v4()));
    let host = MemoryHost::default();
    host.create_account(&account("ada")).expect("account");
    host.save(&path).expect("save state");

    let loaded = MemoryHost::load(MemoryConfig::default(), &path).expect("load state");
    assert_eq!(loaded.state(), host.state());
}
