use std::collections::BTreeMap;

use tracing::debug;

use affseed_core::{
    BackendHandle, CartLine, ErrorRecord, ErrorSet, Host, NewOrder, NewProduct, OrderSnapshot,
    ProductSnapshot, Result, round_currency,
};

use super::{
    OrderRequest, Storefront, ensure_plugin_active, missing_customer, missing_product,
    purchase_key,
};
use crate::random::Randomizer;

const PENDING: &str = "pending";
const COMPLETE: &str = "complete";

/// Easy Digital Downloads: downloads as products, payments as orders.
#[derive(Debug, Clone, PartialEq)]
pub struct Edd {
    backend: BackendHandle,
}

impl Edd {
    pub fn new(backend: BackendHandle) -> Self {
        Self { backend }
    }
}

impl Storefront for Edd {
    fn backend(&self) -> &BackendHandle {
        &self.backend
    }

    fn add_product(&self, host: &dyn Host, name: &str, price: f64) -> Result<u64> {
        ensure_plugin_active(&self.backend)?;

        let mut meta = BTreeMap::new();
        meta.insert("edd_price".to_string(), format!("{price:.2}"));
        host.insert_product(&NewProduct {
            backend: self.backend.name.clone(),
            name: name.to_string(),
            price,
            status: "publish".to_string(),
            variable_prices: Vec::new(),
            meta,
        })
    }

    /// Insert a pending payment, then complete it.
    ///
    /// Downloads with variable prices get one of their price options at random.
    fn place_order(
        &self,
        host: &dyn Host,
        random: &mut Randomizer,
        order: OrderRequest<'_>,
    ) -> Result<u64> {
        let account = host.account(order.user).ok_or_else(|| missing_customer(order.user))?;

        let mut lines = Vec::with_capacity(order.products.len());
        let mut missing = ErrorSet::new();
        let mut total = 0.0;
        for &product_id in order.products {
            let Some(download) = host.product(product_id) else {
                missing.push(missing_product(product_id));
                continue;
            };

            let (item_price, price_id) = if download.variable_prices.is_empty() {
                (download.price, None)
            } else {
                let last = download.variable_prices.len() as i64 - 1;
                let idx = random.number(0, last) as usize;
                (download.variable_prices[idx].amount, Some(idx))
            };
            let item_price = round_currency(item_price);

            lines.push(CartLine {
                product_id,
                name: download.name,
                price_id,
                quantity: 1,
                item_price,
                subtotal: item_price,
                tax: host.calculate_tax(&self.backend.name, item_price),
            });
            total += item_price;
        }
        if !missing.is_empty() {
            return Err(missing);
        }

        let subtotal = round_currency(total);
        let tax = host.calculate_tax(&self.backend.name, subtotal);
        let payment_id = host.insert_order(&NewOrder {
            backend: self.backend.name.clone(),
            customer: account.id,
            email: account.email,
            lines,
            subtotal,
            tax,
            total: round_currency(subtotal + tax),
            currency: host.currency(),
            status: PENDING.to_string(),
            purchase_key: Some(purchase_key(random)),
            billing: None,
            created: order.date,
            attribution: order.attribution.cloned(),
        })?;

        if !host.update_order_status(payment_id, COMPLETE) {
            return Err(ErrorSet::from(
                ErrorRecord::new("payment_not_completed", "The payment could not be marked complete.")
                    .with_context("payment_id", payment_id),
            ));
        }
        debug!(event = "edd_payment_completed", payment_id, customer = account.id);
        Ok(payment_id)
    }

    fn get_product(&self, host: &dyn Host, id: u64) -> Option<ProductSnapshot> {
        host.product(id)
            .filter(|product| product.backend == self.backend.name)
            .map(|product| ProductSnapshot::from(&product))
    }

    fn get_order(&self, host: &dyn Host, id: u64) -> Option<OrderSnapshot> {
        host.order(id)
            .filter(|order| order.backend == self.backend.name)
            .map(|order| OrderSnapshot::from(&order))
    }

    fn supports_reporting(&self) -> bool {
        true
    }
}
