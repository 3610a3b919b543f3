use std::collections::BTreeMap;

use tracing::debug;

use affseed_core::{BackendHandle, CartLine, ErrorSet, Host, NewOrder, NewProduct, Result, round_currency};

use super::{
    OrderRequest, Storefront, ensure_plugin_active, missing_customer, missing_product,
    purchase_key,
};
use crate::random::Randomizer;

/// Restrict Content Pro: membership levels as products, payments as orders.
/// Payments are tax free and the backend has no reporting view.
#[derive(Debug, Clone, PartialEq)]
pub struct Rcp {
    backend: BackendHandle,
}

impl Rcp {
    pub fn new(backend: BackendHandle) -> Self {
        Self { backend }
    }
}

impl Storefront for Rcp {
    fn backend(&self) -> &BackendHandle {
        &self.backend
    }

    fn add_product(&self, host: &dyn Host, name: &str, price: f64) -> Result<u64> {
        ensure_plugin_active(&self.backend)?;

        let meta = BTreeMap::from([
            ("duration".to_string(), "1".to_string()),
            ("duration_unit".to_string(), "month".to_string()),
        ]);
        host.insert_product(&NewProduct {
            backend: self.backend.name.clone(),
            name: name.to_string(),
            price,
            status: "active".to_string(),
            variable_prices: Vec::new(),
            meta,
        })
    }

    fn place_order(
        &self,
        host: &dyn Host,
        random: &mut Randomizer,
        order: OrderRequest<'_>,
    ) -> Result<u64> {
        let member = host.account(order.user).ok_or_else(|| missing_customer(order.user))?;

        let mut lines = Vec::new();
        let mut missing = ErrorSet::new();
        for &level_id in order.products {
            match host.product(level_id) {
                Some(level) => lines.push(CartLine {
                    product_id: level_id,
                    name: level.name,
                    price_id: None,
                    quantity: 1,
                    item_price: level.price,
                    subtotal: level.price,
                    tax: 0.0,
                }),
                None => missing.push(missing_product(level_id)),
            }
        }
        if !missing.is_empty() {
            return Err(missing);
        }

        let total = round_currency(lines.iter().map(|line| line.subtotal).sum());
        let payment_id = host.insert_order(&NewOrder {
            backend: self.backend.name.clone(),
            customer: member.id,
            email: member.email,
            lines,
            subtotal: total,
            tax: 0.0,
            total,
            currency: host.currency(),
            status: "complete".to_string(),
            purchase_key: Some(purchase_key(random)),
            billing: None,
            created: order.date,
            attribution: order.attribution.cloned(),
        })?;

        debug!(event = "rcp_payment_recorded", payment_id, member = member.id);
        Ok(payment_id)
    }
}
