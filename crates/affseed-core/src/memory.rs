//! In-process host platform.
//!
//! `MemoryHost` keeps every record in a serialisable [`MemoryState`] so the
//! CLI can run generators without a live platform and persist the results
//! between invocations. It also counts calls and can be told to fail upcoming
//! creations, which is how the generator tests observe the pipeline.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::{ErrorRecord, ErrorSet, Result};
use crate::host::{
    Account, AffiliateFields, AffiliateRecord, BackendHandle, Host, NewAccount, NewOrder,
    NewProduct, OrderRecord, ProductRecord, Referral, ReferralUpdate,
};
use crate::round_currency;

/// Per-integration switches of the simulated platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationConfig {
    pub plugin_active: bool,
    pub enabled: bool,
    /// Fraction of the taxable amount, e.g. `0.08` for 8%.
    pub tax_rate: f64,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            plugin_active: true,
            enabled: true,
            tax_rate: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub currency: String,
    pub rate_types: Vec<String>,
    pub affiliate_statuses: Vec<String>,
    pub referral_statuses: Vec<String>,
    /// Status given to referrals created for attributed orders.
    pub referral_status: String,
    /// Entries override the built-in integrations by name; unnamed ones keep their defaults.
    #[serde(deserialize_with = "over_default_integrations")]
    pub integrations: BTreeMap<String, IntegrationConfig>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            rate_types: strings(&["percentage", "flat"]),
            affiliate_statuses: strings(&["active", "inactive", "pending", "rejected"]),
            referral_statuses: strings(&["paid", "unpaid", "pending", "rejected"]),
            referral_status: "unpaid".to_string(),
            integrations: default_integrations(),
        }
    }
}

fn default_integrations() -> BTreeMap<String, IntegrationConfig> {
    ["edd", "rcp", "woocommerce"]
        .into_iter()
        .map(|name| (name.to_string(), IntegrationConfig::default()))
        .collect()
}

fn over_default_integrations<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, IntegrationConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    let overrides = BTreeMap::<String, IntegrationConfig>::deserialize(deserializer)?;
    let mut integrations = default_integrations();
    integrations.extend(overrides);
    Ok(integrations)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub id: u64,
    pub affiliate_id: u64,
    pub context: String,
    pub campaign: String,
    pub date: NaiveDateTime,
}

/// Every record held by a [`MemoryHost`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryState {
    pub accounts: BTreeMap<u64, Account>,
    pub affiliates: BTreeMap<u64, AffiliateRecord>,
    pub visits: BTreeMap<u64, Visit>,
    pub referrals: BTreeMap<u64, Referral>,
    pub products: BTreeMap<u64, ProductRecord>,
    pub orders: BTreeMap<u64, OrderRecord>,
}

/// Number of primitive calls made against a [`MemoryHost`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub accounts_attempted: usize,
    pub affiliates_attempted: usize,
    pub visits_recorded: usize,
    pub products_attempted: usize,
    pub orders_attempted: usize,
    pub referral_updates: usize,
}

#[derive(Debug, Default)]
struct Faults {
    accounts: usize,
    products: usize,
    orders: usize,
    status_updates: usize,
}

#[derive(Debug)]
struct Inner {
    state: MemoryState,
    calls: CallCounts,
    faults: Faults,
}

#[derive(Debug)]
pub struct MemoryHost {
    config: MemoryConfig,
    inner: Mutex<Inner>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new(MemoryConfig::default())
    }
}

impl MemoryHost {
    pub fn new(config: MemoryConfig) -> Self {
        Self::with_state(config, MemoryState::default())
    }

    pub fn with_state(config: MemoryConfig, state: MemoryState) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state,
                calls: CallCounts::default(),
                faults: Faults::default(),
            }),
        }
    }

    /// Load state from a JSON file, starting empty when the file does not exist.
    pub fn load(config: MemoryConfig, path: &Path) -> io::Result<Self> {
        if !path.exists() {
            return Ok(Self::new(config));
        }
        let content = fs::read_to_string(path)?;
        let state: MemoryState = serde_json::from_str(&content).map_err(io::Error::from)?;
        Ok(Self::with_state(config, state))
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(&self.lock().state).map_err(io::Error::from)?;
        fs::write(path, data)
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn state(&self) -> MemoryState {
        self.lock().state.clone()
    }

    pub fn calls(&self) -> CallCounts {
        self.lock().calls
    }

    pub fn visits(&self) -> Vec<Visit> {
        self.lock().state.visits.values().cloned().collect()
    }

    pub fn referrals(&self) -> Vec<Referral> {
        self.lock().state.referrals.values().cloned().collect()
    }

    /// Make the next `count` account creations fail.
    pub fn fail_next_accounts(&self, count: usize) {
        self.lock().faults.accounts = count;
    }

    /// Make the next `count` product insertions fail.
    pub fn fail_next_products(&self, count: usize) {
        self.lock().faults.products = count;
    }

    /// Make the next `count` order insertions fail.
    pub fn fail_next_orders(&self, count: usize) {
        self.lock().faults.orders = count;
    }

    /// Make the next `count` order status updates report failure.
    pub fn fail_next_status_updates(&self, count: usize) {
        self.lock().faults.status_updates = count;
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn integration(&self, name: &str) -> Option<&IntegrationConfig> {
        self.config.integrations.get(name)
    }
}

impl Host for MemoryHost {
    fn create_account(&self, account: &NewAccount) -> Result<u64> {
        let mut inner = self.lock();
        inner.calls.accounts_attempted += 1;
        if take_fault(&mut inner.faults.accounts) {
            return Err(ErrorSet::single("account_insert_failed", "Could not insert the account."));
        }

        let state = &mut inner.state;
        if account.login.is_empty() {
            return Err(ErrorSet::single("empty_user_login", "Cannot create a user with an empty login name."));
        }
        if state.accounts.values().any(|existing| existing.login == account.login) {
            return Err(ErrorSet::from(
                ErrorRecord::new("existing_user_login", "Sorry, that username already exists!")
                    .with_context("login", &account.login),
            ));
        }
        if state.accounts.values().any(|existing| existing.email == account.email) {
            return Err(ErrorSet::from(
                ErrorRecord::new("existing_user_email", "Sorry, that email address is already used!")
                    .with_context("email", &account.email),
            ));
        }

        let id = next_id(&state.accounts);
        state.accounts.insert(
            id,
            Account {
                id,
                login: account.login.clone(),
                email: account.email.clone(),
                first_name: account.first_name.clone(),
                last_name: account.last_name.clone(),
                registered: now(),
            },
        );
        debug!(event = "account_created", id);
        Ok(id)
    }

    fn account(&self, id: u64) -> Option<Account> {
        self.lock().state.accounts.get(&id).cloned()
    }

    fn create_affiliate(&self, fields: &AffiliateFields) -> Option<u64> {
        let mut inner = self.lock();
        inner.calls.affiliates_attempted += 1;

        let state = &mut inner.state;
        let valid = state.accounts.contains_key(&fields.user_id)
            && !state.affiliates.values().any(|existing| existing.user_id == fields.user_id)
            && self.config.affiliate_statuses.contains(&fields.status)
            && self.config.rate_types.contains(&fields.rate_type);
        if !valid {
            return None;
        }

        let id = next_id(&state.affiliates);
        state.affiliates.insert(
            id,
            AffiliateRecord {
                id,
                user_id: fields.user_id,
                status: fields.status.clone(),
                date_registered: fields.date_registered.unwrap_or_else(now),
                rate: fields.rate,
                rate_type: fields.rate_type.clone(),
                payment_email: fields.payment_email.clone(),
                earnings: fields.earnings,
                referrals: fields.referrals,
                visits: fields.visits,
                website_url: fields.website_url.clone(),
            },
        );
        Some(id)
    }

    fn affiliate(&self, id: u64) -> Option<AffiliateRecord> {
        self.lock().state.affiliates.get(&id).cloned()
    }

    fn rate_types(&self) -> Vec<String> {
        self.config.rate_types.clone()
    }

    fn affiliate_statuses(&self) -> Vec<String> {
        self.config.affiliate_statuses.clone()
    }

    fn referral_statuses(&self) -> Vec<String> {
        self.config.referral_statuses.clone()
    }

    fn record_visit(&self, context: &str, affiliate_id: u64, campaign: &str) -> Result<u64> {
        let mut inner = self.lock();
        inner.calls.visits_recorded += 1;

        let state = &mut inner.state;
        let Some(affiliate) = state.affiliates.get_mut(&affiliate_id) else {
            return Err(ErrorSet::from(
                ErrorRecord::new("invalid_affiliate", "Visits can only be recorded for existing affiliates.")
                    .with_context("affiliate_id", affiliate_id),
            ));
        };
        affiliate.visits += 1;

        let id = next_id(&state.visits);
        state.visits.insert(
            id,
            Visit {
                id,
                affiliate_id,
                context: context.to_string(),
                campaign: campaign.to_string(),
                date: now(),
            },
        );
        Ok(id)
    }

    fn find_referral_by_reference(&self, context: &str, reference: u64) -> Option<Referral> {
        self.lock()
            .state
            .referrals
            .values()
            .find(|referral| referral.context == context && referral.reference == reference)
            .cloned()
    }

    fn update_referral(&self, id: u64, update: &ReferralUpdate) -> bool {
        let mut inner = self.lock();
        inner.calls.referral_updates += 1;

        let Some(referral) = inner.state.referrals.get_mut(&id) else {
            return false;
        };
        if let Some(status) = &update.status {
            referral.status = status.clone();
        }
        if let Some(amount) = update.amount {
            referral.amount = amount;
        }
        if let Some(date) = update.date {
            referral.date = date;
        }
        true
    }

    fn lookup_integration(&self, name: &str) -> Result<BackendHandle> {
        let Some(integration) = self.integration(name) else {
            return Err(ErrorSet::from(
                ErrorRecord::new("integration_not_registered", "The platform has no integration registered under this name.")
                    .with_context("integration", name),
            ));
        };

        Ok(BackendHandle {
            name: name.to_string(),
            context: name.to_string(),
            plugin_active: integration.plugin_active,
            enabled: integration.enabled,
        })
    }

    fn insert_product(&self, product: &NewProduct) -> Result<u64> {
        let mut inner = self.lock();
        inner.calls.products_attempted += 1;
        if take_fault(&mut inner.faults.products) {
            return Err(ErrorSet::single("product_insert_failed", "Could not insert the product."));
        }

        let state = &mut inner.state;
        let id = next_id(&state.products);
        state.products.insert(
            id,
            ProductRecord {
                id,
                backend: product.backend.clone(),
                name: product.name.clone(),
                price: product.price,
                status: product.status.clone(),
                variable_prices: product.variable_prices.clone(),
                meta: product.meta.clone(),
                created: now(),
            },
        );
        Ok(id)
    }

    fn product(&self, id: u64) -> Option<ProductRecord> {
        self.lock().state.products.get(&id).cloned()
    }

    fn insert_order(&self, order: &NewOrder) -> Result<u64> {
        let mut inner = self.lock();
        inner.calls.orders_attempted += 1;
        if take_fault(&mut inner.faults.orders) {
            return Err(ErrorSet::single("order_insert_failed", "Could not insert the order."));
        }

        let state = &mut inner.state;
        let mut errors = ErrorSet::new();
        if !state.accounts.contains_key(&order.customer) {
            errors.push(
                ErrorRecord::new("invalid_customer", "Orders require an existing customer.")
                    .with_context("customer", order.customer),
            );
        }
        if order.lines.is_empty() {
            errors.add("empty_cart", "Orders require at least one product.");
        }
        for line in &order.lines {
            if !state.products.contains_key(&line.product_id) {
                errors.push(
                    ErrorRecord::new("invalid_product", "Orders can only contain existing products.")
                        .with_context("product_id", line.product_id),
                );
            }
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        let id = next_id(&state.orders);
        let stamped = now();
        state.orders.insert(
            id,
            OrderRecord {
                id,
                backend: order.backend.clone(),
                customer: order.customer,
                email: order.email.clone(),
                lines: order.lines.clone(),
                subtotal: order.subtotal,
                tax: order.tax,
                total: order.total,
                currency: order.currency.clone(),
                status: order.status.clone(),
                purchase_key: order.purchase_key.clone(),
                billing: order.billing.clone(),
                created: order.created.unwrap_or(stamped),
                attribution: order.attribution.clone(),
            },
        );

        if let Some(attribution) = &order.attribution
            && let Some(affiliate) = state.affiliates.get_mut(&attribution.affiliate_id)
        {
            let amount = if affiliate.rate_type == "flat" {
                affiliate.rate
            } else {
                round_currency(order.total * affiliate.rate / 100.0)
            };
            affiliate.referrals += 1;

            let referral_id = next_id(&state.referrals);
            state.referrals.insert(
                referral_id,
                Referral {
                    id: referral_id,
                    affiliate_id: attribution.affiliate_id,
                    visit_id: attribution.visit_id,
                    reference: id,
                    context: order.backend.clone(),
                    campaign: attribution.campaign.clone(),
                    amount,
                    status: self.config.referral_status.clone(),
                    date: stamped,
                },
            );
        }

        Ok(id)
    }

    fn update_order_status(&self, id: u64, status: &str) -> bool {
        let mut inner = self.lock();
        if take_fault(&mut inner.faults.status_updates) {
            return false;
        }
        match inner.state.orders.get_mut(&id) {
            Some(order) => {
                order.status = status.to_string();
                true
            }
            None => false,
        }
    }

    fn order(&self, id: u64) -> Option<OrderRecord> {
        self.lock().state.orders.get(&id).cloned()
    }

    fn calculate_tax(&self, backend: &str, amount: f64) -> f64 {
        let rate = self.integration(backend).map_or(0.0, |config| config.tax_rate);
        round_currency(amount * rate)
    }

    fn currency(&self) -> String {
        self.config.currency.clone()
    }
}

fn take_fault(remaining: &mut usize) -> bool {
    if *remaining == 0 {
        return false;
    }
    *remaining -= 1;
    true
}

fn next_id<T>(records: &BTreeMap<u64, T>) -> u64 {
    records.keys().next_back().map_or(1, |id| id + 1)
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
