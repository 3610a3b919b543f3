//! Generator arguments.
//!
//! Every options struct deserializes with defaults for missing keys, so a
//! partial JSON or TOML document merges over the defaults field by field.

use serde::{Deserialize, Serialize};

pub const DEFAULT_USER_NUMBER: i64 = 10;
pub const DEFAULT_AFFILIATE_NUMBER: i64 = 10;
pub const DEFAULT_PRODUCT_NUMBER: i64 = 10;
pub const DEFAULT_ORDER_NUMBER: i64 = 100;
pub const DEFAULT_TRANSACTION_NUMBER: i64 = 100;
pub const DEFAULT_EARLIEST_DATE: &str = "last month";
pub const DEFAULT_LATEST_DATE: &str = "today";

/// Options types that carry a requested record count.
pub trait Numbered: Default {
    fn number(&self) -> i64;

    fn with_number(number: i64) -> Self;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserOptions {
    pub number: i64,
}

impl Default for UserOptions {
    fn default() -> Self {
        Self {
            number: DEFAULT_USER_NUMBER,
        }
    }
}

impl Numbered for UserOptions {
    fn number(&self) -> i64 {
        self.number
    }

    fn with_number(number: i64) -> Self {
        Self { number }
    }
}

/// Affiliate fields left unset are filled with random values per affiliate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AffiliateOptions {
    pub number: i64,
    pub status: Option<String>,
    pub date_registered: Option<String>,
    pub rate: Option<f64>,
    pub rate_type: Option<String>,
    pub payment_email: Option<String>,
    pub earnings: f64,
    pub referrals: u64,
    pub visits: u64,
    pub website_url: Option<String>,
}

impl Default for AffiliateOptions {
    fn default() -> Self {
        Self {
            number: DEFAULT_AFFILIATE_NUMBER,
            status: None,
            date_registered: None,
            rate: None,
            rate_type: None,
            payment_email: None,
            earnings: 0.0,
            referrals: 0,
            visits: 0,
            website_url: None,
        }
    }
}

impl Numbered for AffiliateOptions {
    fn number(&self) -> i64 {
        self.number
    }

    fn with_number(number: i64) -> Self {
        Self {
            number,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductOptions {
    pub number: i64,
    pub min_price: f64,
    pub max_price: f64,
}

impl Default for ProductOptions {
    fn default() -> Self {
        Self {
            number: DEFAULT_PRODUCT_NUMBER,
            min_price: 0.0,
            max_price: 100.0,
        }
    }
}

impl Numbered for ProductOptions {
    fn number(&self) -> i64 {
        self.number
    }

    fn with_number(number: i64) -> Self {
        Self {
            number,
            ..Self::default()
        }
    }
}

/// Products per order: a fixed count or an inclusive range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CountRange {
    Exact(i64),
    Range {
        #[serde(default)]
        min: Option<i64>,
        #[serde(default)]
        max: Option<i64>,
    },
}

impl CountRange {
    pub fn between(min: i64, max: i64) -> Self {
        Self::Range {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Lower and upper bounds; a fixed count is both.
    pub fn bounds(&self) -> (Option<i64>, Option<i64>) {
        match self {
            Self::Exact(count) => (Some(*count), Some(*count)),
            Self::Range { min, max } => (*min, *max),
        }
    }
}

impl Default for CountRange {
    fn default() -> Self {
        Self::between(1, 4)
    }
}

/// Date window for generated orders. A single string pins both bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateRangeArg {
    Single(String),
    Bounds {
        #[serde(default)]
        earliest: Option<String>,
        #[serde(default)]
        latest: Option<String>,
    },
}

impl DateRangeArg {
    pub fn between(earliest: impl Into<String>, latest: impl Into<String>) -> Self {
        Self::Bounds {
            earliest: Some(earliest.into()),
            latest: Some(latest.into()),
        }
    }

    pub fn earliest(&self) -> Option<&str> {
        match self {
            Self::Single(value) => Some(value),
            Self::Bounds { earliest, .. } => earliest.as_deref(),
        }
    }

    pub fn latest(&self) -> Option<&str> {
        match self {
            Self::Single(value) => Some(value),
            Self::Bounds { latest, .. } => latest.as_deref(),
        }
    }
}

impl Default for DateRangeArg {
    fn default() -> Self {
        Self::between(DEFAULT_EARLIEST_DATE, DEFAULT_LATEST_DATE)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderOptions {
    pub number: i64,
    pub users: Vec<u64>,
    pub affiliates: Vec<u64>,
    pub products: Vec<u64>,
    /// Campaign labels picked at random for referred orders.
    pub campaigns: Vec<String>,
    pub products_per_transaction: CountRange,
    /// Orders are left undated when no range is given.
    pub date_range: Option<DateRangeArg>,
}

impl Default for OrderOptions {
    fn default() -> Self {
        Self {
            number: DEFAULT_ORDER_NUMBER,
            users: Vec::new(),
            affiliates: Vec::new(),
            products: Vec::new(),
            campaigns: vec![String::new()],
            products_per_transaction: CountRange::default(),
            date_range: None,
        }
    }
}

/// Nested generator request: a bare count or a full options object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubRequest<T> {
    Count(i64),
    Options(T),
}

impl<T: Numbered + Clone> SubRequest<T> {
    pub fn number(&self) -> i64 {
        match self {
            Self::Count(number) => *number,
            Self::Options(options) => options.number(),
        }
    }

    pub fn to_options(&self) -> T {
        match self {
            Self::Count(number) => T::with_number(*number),
            Self::Options(options) => options.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionOptions {
    pub number: i64,
    pub users: SubRequest<UserOptions>,
    pub affiliates: SubRequest<AffiliateOptions>,
    pub products: SubRequest<ProductOptions>,
    pub campaigns: Vec<String>,
    pub products_per_transaction: CountRange,
    pub date_range: DateRangeArg,
}

impl Default for TransactionOptions {
    fn default() -> Self {
        Self {
            number: DEFAULT_TRANSACTION_NUMBER,
            users: SubRequest::Count(20),
            affiliates: SubRequest::Count(5),
            products: SubRequest::Count(10),
            campaigns: vec![String::new()],
            products_per_transaction: CountRange::default(),
            date_range: DateRangeArg::default(),
        }
    }
}
