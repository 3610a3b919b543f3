use affseed_core::{EventLog, Host, Result};

use crate::generators::{
    AffiliateGenerator, GenerationContext, Generated, Generator, OrderGenerator,
    ProductGenerator, Progress, TransactionBatch, TransactionGenerator, UserGenerator,
};
use crate::integrations::{self, Integration, IntegrationRef};
use crate::options::{
    AffiliateOptions, OrderOptions, ProductOptions, TransactionOptions, UserOptions,
};
use crate::random::Randomizer;

/// Entry point bundling the host, event log and random source of one run.
pub struct Generate<'a> {
    ctx: GenerationContext<'a>,
    random: Randomizer,
}

impl<'a> Generate<'a> {
    pub fn new(host: &'a dyn Host, events: &'a EventLog, random: Randomizer) -> Self {
        Self::with_context(GenerationContext::new(host, events), random)
    }

    pub fn with_context(ctx: GenerationContext<'a>, random: Randomizer) -> Self {
        Self { ctx, random }
    }

    pub fn context(&self) -> &GenerationContext<'a> {
        &self.ctx
    }

    pub fn integration(&self, integration: impl Into<IntegrationRef>) -> Result<Integration> {
        integrations::get(self.ctx.host, integration)
    }

    pub fn users(&mut self, options: UserOptions, progress: &mut Progress<'_>) -> Result<Generated> {
        UserGenerator::new(options).run(&self.ctx, &mut self.random, progress)
    }

    pub fn affiliates(
        &mut self,
        options: AffiliateOptions,
        progress: &mut Progress<'_>,
    ) -> Result<Generated> {
        AffiliateGenerator::new(&self.ctx, options).run(&self.ctx, &mut self.random, progress)
    }

    pub fn products(
        &mut self,
        integration: impl Into<IntegrationRef>,
        options: ProductOptions,
        progress: &mut Progress<'_>,
    ) -> Result<Generated> {
        ProductGenerator::new(&self.ctx, integration, options).run(&self.ctx, &mut self.random, progress)
    }

    pub fn orders(
        &mut self,
        integration: impl Into<IntegrationRef>,
        options: OrderOptions,
        progress: &mut Progress<'_>,
    ) -> Result<Generated> {
        OrderGenerator::new(&self.ctx, integration, options).run(&self.ctx, &mut self.random, progress)
    }

    pub fn transactions(
        &mut self,
        integration: impl Into<IntegrationRef>,
        options: TransactionOptions,
        progress: &mut Progress<'_>,
    ) -> Result<TransactionBatch> {
        TransactionGenerator::new(&self.ctx, integration, options).run(
            &self.ctx,
            &mut self.random,
            progress,
        )
    }
}
