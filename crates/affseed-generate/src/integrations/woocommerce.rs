use std::collections::BTreeMap;

use tracing::debug;

use affseed_core::{
    BackendHandle, CartLine, ErrorSet, Host, NewOrder, NewProduct, OrderSnapshot,
    ProductSnapshot, Result, round_currency,
};

use super::{
    OrderRequest, Storefront, ensure_plugin_active, missing_customer, missing_product,
};
use crate::random::Randomizer;

#[derive(Debug, Clone, PartialEq)]
pub struct WooCommerce {
    backend: BackendHandle,
}

impl WooCommerce {
    pub fn new(backend: BackendHandle) -> Self {
        Self { backend }
    }
}

impl Storefront for WooCommerce {
    fn backend(&self) -> &BackendHandle {
        &self.backend
    }

    fn add_product(&self, host: &dyn Host, name: &str, price: f64) -> Result<u64> {
        ensure_plugin_active(&self.backend)?;

        let price_meta = format!("{price:.2}");
        let meta = BTreeMap::from([
            ("_downloadable".to_string(), "no".to_string()),
            ("_virtual".to_string(), "no".to_string()),
            ("_manage_stock".to_string(), "no".to_string()),
            ("_price".to_string(), price_meta.clone()),
            ("_regular_price".to_string(), price_meta),
        ]);
        host.insert_product(&NewProduct {
            backend: self.backend.name.clone(),
            name: name.to_string(),
            price,
            status: "publish".to_string(),
            variable_prices: Vec::new(),
            meta,
        })
    }

    /// Completed order with a random billing address and computed totals.
    fn place_order(
        &self,
        host: &dyn Host,
        random: &mut Randomizer,
        order: OrderRequest<'_>,
    ) -> Result<u64> {
        let customer = host.account(order.user).ok_or_else(|| missing_customer(order.user))?;

        let mut missing = ErrorSet::new();
        let lines: Vec<CartLine> = order
            .products
            .iter()
            .filter_map(|&product_id| match host.product(product_id) {
                Some(product) => Some(CartLine {
                    product_id,
                    name: product.name,
                    price_id: None,
                    quantity: 1,
                    item_price: product.price,
                    subtotal: product.price,
                    tax: host.calculate_tax(&self.backend.name, product.price),
                }),
                None => {
                    missing.push(missing_product(product_id));
                    None
                }
            })
            .collect();
        if !missing.is_empty() {
            return Err(missing);
        }

        let subtotal = round_currency(lines.iter().map(|line| line.subtotal).sum());
        let tax = round_currency(lines.iter().map(|line| line.tax).sum());
        let order_id = host.insert_order(&NewOrder {
            backend: self.backend.name.clone(),
            customer: customer.id,
            email: customer.email,
            lines,
            subtotal,
            tax,
            total: round_currency(subtotal + tax),
            currency: host.currency(),
            status: "completed".to_string(),
            purchase_key: None,
            billing: Some(random.address()),
            created: order.date,
            attribution: order.attribution.cloned(),
        })?;

        debug!(event = "woocommerce_order_saved", order_id, customer = customer.id);
        Ok(order_id)
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
