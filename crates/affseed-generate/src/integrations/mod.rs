//! Backend platform adapters.
//!
//! An [`Integration`] binds generation to one e-commerce or subscription
//! backend. The set of backends is closed; each variant implements
//! [`Storefront`] and the shared attribution flow lives on the enum.

mod edd;
mod rcp;
mod registry;
mod woocommerce;

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use affseed_core::{
    AttributionContext, BackendHandle, ErrorRecord, ErrorSet, Host, OrderSnapshot,
    ProductSnapshot, ReferralUpdate, Result,
};

use crate::random::Randomizer;

pub use edd::Edd;
pub use rcp::Rcp;
pub use registry::{IntegrationRef, get, is_supported};
pub use woocommerce::WooCommerce;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationKind {
    Edd,
    Rcp,
    #[serde(rename = "woocommerce")]
    WooCommerce,
}

impl IntegrationKind {
    pub const ALL: [IntegrationKind; 3] = [
        IntegrationKind::Edd,
        IntegrationKind::Rcp,
        IntegrationKind::WooCommerce,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::Edd => "edd",
            Self::Rcp => "rcp",
            Self::WooCommerce => "woocommerce",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == name)
    }

    pub fn supported_keys() -> Vec<&'static str> {
        Self::ALL.iter().map(|kind| kind.key()).collect()
    }
}

impl fmt::Display for IntegrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One order to place through a backend.
#[derive(Debug, Clone, Copy)]
pub struct OrderRequest<'a> {
    pub user: u64,
    pub products: &'a [u64],
    pub date: Option<NaiveDateTime>,
    pub attribution: Option<&'a AttributionContext>,
}

/// Capabilities every backend adapter provides.
pub trait Storefront {
    fn backend(&self) -> &BackendHandle;

    fn add_product(&self, host: &dyn Host, name: &str, price: f64) -> Result<u64>;

    fn place_order(
        &self,
        host: &dyn Host,
        random: &mut Randomizer,
        order: OrderRequest<'_>,
    ) -> Result<u64>;

    fn get_product(&self, _host: &dyn Host, _id: u64) -> Option<ProductSnapshot> {
        None
    }

    fn get_order(&self, _host: &dyn Host, _id: u64) -> Option<OrderSnapshot> {
        None
    }

    fn supports_reporting(&self) -> bool {
        false
    }
}

/// Resolved backend adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum Integration {
    Edd(Edd),
    Rcp(Rcp),
    WooCommerce(WooCommerce),
}

impl Integration {
    pub fn new(kind: IntegrationKind, backend: BackendHandle) -> Self {
        match kind {
            IntegrationKind::Edd => Self::Edd(Edd::new(backend)),
            IntegrationKind::Rcp => Self::Rcp(Rcp::new(backend)),
            IntegrationKind::WooCommerce => Self::WooCommerce(WooCommerce::new(backend)),
        }
    }

    pub fn kind(&self) -> IntegrationKind {
        match self {
            Self::Edd(_) => IntegrationKind::Edd,
            Self::Rcp(_) => IntegrationKind::Rcp,
            Self::WooCommerce(_) => IntegrationKind::WooCommerce,
        }
    }

    pub fn backend(&self) -> &BackendHandle {
        self.storefront().backend()
    }

    fn storefront(&self) -> &dyn Storefront {
        match self {
            Self::Edd(edd) => edd,
            Self::Rcp(rcp) => rcp,
            Self::WooCommerce(woo) => woo,
        }
    }

    pub fn add_product(&self, host: &dyn Host, name: &str, price: f64) -> Result<u64> {
        self.storefront().add_product(host, name, price)
    }

    /// Place an order with no affiliate attribution.
    pub fn place_order(
        &self,
        host: &dyn Host,
        random: &mut Randomizer,
        user: u64,
        products: &[u64],
        date: Option<NaiveDateTime>,
    ) -> Result<u64> {
        self.storefront().place_order(
            host,
            random,
            OrderRequest {
                user,
                products,
                date,
                attribution: None,
            },
        )
    }

    /// Record a tracking visit and return the attribution to carry into an order.
    pub fn simulate_visit(
        &self,
        host: &dyn Host,
        affiliate_id: u64,
        campaign: &str,
    ) -> Result<AttributionContext> {
        let visit_id = host.record_visit(&self.backend().context, affiliate_id, campaign)?;
        debug!(
            event = "visit_simulated",
            integration = %self.kind(),
            affiliate_id,
            visit_id
        );
        Ok(AttributionContext {
            affiliate_id,
            visit_id,
            campaign: campaign.to_string(),
        })
    }

    /// Place an order attributed to `affiliate_id`.
    ///
    /// The host stamps referrals at insertion time, so when `date` is given the
    /// referral recorded for the new order is moved to that date afterwards.
    #[allow(clippy::too_many_arguments)]
    pub fn place_referred_order(
        &self,
        host: &dyn Host,
        random: &mut Randomizer,
        user: u64,
        affiliate_id: u64,
        products: &[u64],
        campaign: &str,
        date: Option<NaiveDateTime>,
    ) -> Result<u64> {
        let attribution = self.simulate_visit(host, affiliate_id, campaign)?;
        let order_id = self.storefront().place_order(
            host,
            random,
            OrderRequest {
                user,
                products,
                date,
                attribution: Some(&attribution),
            },
        )?;

        if let Some(date) = date {
            let context = &self.backend().context;
            match host.find_referral_by_reference(context, order_id) {
                Some(referral) => {
                    let update = ReferralUpdate {
                        date: Some(date),
                        ..ReferralUpdate::default()
                    };
                    if !host.update_referral(referral.id, &update) {
                        warn!(event = "referral_date_not_updated", order_id, referral_id = referral.id);
                    }
                }
                None => warn!(event = "referral_not_found", order_id, context = %context),
            }
        }

        Ok(order_id)
    }

    pub fn get_product(&self, host: &dyn Host, id: u64) -> Option<ProductSnapshot> {
        self.storefront().get_product(host, id)
    }

    pub fn get_order(&self, host: &dyn Host, id: u64) -> Option<OrderSnapshot> {
        self.storefront().get_order(host, id)
    }

    pub fn supports_reporting(&self) -> bool {
        self.storefront().supports_reporting()
    }
}

fn ensure_plugin_active(backend: &BackendHandle) -> Result<()> {
    if backend.plugin_active {
        return Ok(());
    }
    Err(ErrorSet::from(
        ErrorRecord::new(
            "plugin_is_not_active",
            format!("The {} plugin is not active.", backend.name),
        )
        .with_context("integration", &backend.name),
    ))
}

fn missing_customer(user: u64) -> ErrorSet {
    ErrorSet::from(
        ErrorRecord::new("invalid_customer", "Orders require an existing customer.")
            .with_context("customer", user),
    )
}

fn missing_product(id: u64) -> ErrorRecord {
    ErrorRecord::new("invalid_product", "Orders can only contain existing products.")
        .with_context("product_id", id)
}

/// Opaque 32 character key derived from random bytes.
fn purchase_key(random: &mut Randomizer) -> String {
    use rand::RngCore;

    let mut seed = [0_u8; 16];
    random.rng().fill_bytes(&mut seed);
    let digest = Sha256::digest(seed);
    hex::encode(&digest[..16])
}
