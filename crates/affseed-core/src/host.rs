//! Host platform collaborator.
//!
//! Every record the generators create is persisted by the host platform. This
//! module describes the primitives the host exposes and the shapes passed
//! through them; nothing here stores data by itself.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Input for the account creation primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAccount {
    pub login: String,
    pub password: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Stored account, without credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: u64,
    pub login: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub registered: NaiveDateTime,
}

/// Fields of a new affiliate record. Unset dates are stamped by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffiliateFields {
    pub user_id: u64,
    pub status: String,
    pub date_registered: Option<NaiveDateTime>,
    pub rate: f64,
    pub rate_type: String,
    pub payment_email: String,
    pub earnings: f64,
    pub referrals: u64,
    pub visits: u64,
    pub website_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffiliateRecord {
    pub id: u64,
    pub user_id: u64,
    pub status: String,
    pub date_registered: NaiveDateTime,
    pub rate: f64,
    pub rate_type: String,
    pub payment_email: String,
    pub earnings: f64,
    pub referrals: u64,
    pub visits: u64,
    pub website_url: Option<String>,
}

/// Order attribution carried explicitly from a simulated visit into order placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributionContext {
    pub affiliate_id: u64,
    pub visit_id: u64,
    pub campaign: String,
}

/// Host record attributing an order to an affiliate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Referral {
    pub id: u64,
    pub affiliate_id: u64,
    pub visit_id: u64,
    /// Order id the referral was recorded for.
    pub reference: u64,
    pub context: String,
    pub campaign: String,
    pub amount: f64,
    pub status: String,
    pub date: NaiveDateTime,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferralUpdate {
    pub status: Option<String>,
    pub amount: Option<f64>,
    pub date: Option<NaiveDateTime>,
}

/// Host registry entry for one backend platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendHandle {
    pub name: String,
    /// Context key used when recording visits and referrals.
    pub context: String,
    pub plugin_active: bool,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceOption {
    pub name: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub backend: String,
    pub name: String,
    pub price: f64,
    pub status: String,
    #[serde(default)]
    pub variable_prices: Vec<PriceOption>,
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: u64,
    pub backend: String,
    pub name: String,
    pub price: f64,
    pub status: String,
    #[serde(default)]
    pub variable_prices: Vec<PriceOption>,
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
    pub created: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postcode: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: u64,
    pub name: String,
    /// Selected variable price, for backends that support price variants.
    pub price_id: Option<usize>,
    pub quantity: u32,
    pub item_price: f64,
    pub subtotal: f64,
    pub tax: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub backend: String,
    pub customer: u64,
    pub email: String,
    pub lines: Vec<CartLine>,
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
    pub currency: String,
    pub status: String,
    pub purchase_key: Option<String>,
    pub billing: Option<Address>,
    /// Creation timestamp; `None` stamps the order "now".
    pub created: Option<NaiveDateTime>,
    pub attribution: Option<AttributionContext>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: u64,
    pub backend: String,
    pub customer: u64,
    pub email: String,
    pub lines: Vec<CartLine>,
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
    pub currency: String,
    pub status: String,
    pub purchase_key: Option<String>,
    pub billing: Option<Address>,
    pub created: NaiveDateTime,
    pub attribution: Option<AttributionContext>,
}

/// Primitives consumed from the host platform.
///
/// Implementations are shared by reference across a whole generation run, so
/// mutation happens behind interior mutability. An order inserted with an
/// attribution makes the host record a referral for it, stamped at insertion
/// time.
pub trait Host {
    fn create_account(&self, account: &NewAccount) -> Result<u64>;

    fn account(&self, id: u64) -> Option<Account>;

    /// Returns `None` when the host refuses the record.
    fn create_affiliate(&self, fields: &AffiliateFields) -> Option<u64>;

    fn affiliate(&self, id: u64) -> Option<AffiliateRecord>;

    fn rate_types(&self) -> Vec<String>;

    fn affiliate_statuses(&self) -> Vec<String>;

    fn referral_statuses(&self) -> Vec<String>;

    fn record_visit(&self, context: &str, affiliate_id: u64, campaign: &str) -> Result<u64>;

    fn find_referral_by_reference(&self, context: &str, reference: u64) -> Option<Referral>;

    fn update_referral(&self, id: u64, update: &ReferralUpdate) -> bool;

    fn lookup_integration(&self, name: &str) -> Result<BackendHandle>;

    fn insert_product(&self, product: &NewProduct) -> Result<u64>;

    fn product(&self, id: u64) -> Option<ProductRecord>;

    fn insert_order(&self, order: &NewOrder) -> Result<u64>;

    fn update_order_status(&self, id: u64, status: &str) -> bool;

    fn order(&self, id: u64) -> Option<OrderRecord>;

    /// Tax owed on `amount` under the backend's own tax rules.
    fn calculate_tax(&self, backend: &str, amount: f64) -> f64;

    fn currency(&self) -> String;
}
