//! Generation pipeline for seeding an affiliate platform with test data.
//!
//! Generators validate their options at construction, then create users,
//! affiliates, products and orders through the host platform. Products and
//! orders go through an [`Integration`] for one backend store.

pub mod dates;
pub mod facade;
pub mod generators;
pub mod integrations;
pub mod options;
pub mod random;

pub use facade::Generate;
pub use generators::{
    AffiliateGenerator, GenerationContext, Generated, Generator, OrderGenerator,
    ProductGenerator, Progress, Skipped, Tick, TransactionBatch, TransactionGenerator, Unit,
    UserGenerator,
};
pub use integrations::{Integration, IntegrationKind, IntegrationRef, Storefront};
pub use options::{
    AffiliateOptions, CountRange, DateRangeArg, OrderOptions, ProductOptions, SubRequest,
    TransactionOptions, UserOptions,
};
pub use random::Randomizer;
