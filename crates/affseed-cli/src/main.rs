mod config;
mod logging;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use thiserror::Error;

use affseed_core::{ErrorSet, EventLog, Host, MemoryHost};
use affseed_generate::{
    AffiliateOptions, CountRange, DateRangeArg, Generate, Generated, Integration, OrderOptions,
    ProductOptions, Randomizer, SubRequest, Tick, TransactionOptions, UserOptions,
};
use config::load_settings;
use output::{AffiliateRow, OutputFormat, Records, UserRow};

#[derive(Debug, Error)]
enum CliError {
    #[error("{}", output::error_message(.0))]
    Generation(#[from] ErrorSet),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings: {0}")]
    Settings(#[from] toml::de::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("logging setup failed: {0}")]
    Logging(String),
}

#[derive(Parser, Debug)]
#[command(name = "affseed", version, about = "Seed affiliate test data")]
struct Cli {
    /// Settings file (defaults to ./affseed.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Sandbox state file, loaded before and saved after the run.
    #[arg(long, global = true)]
    state: Option<PathBuf>,
    /// Seed for reproducible output.
    #[arg(long, global = true)]
    seed: Option<u64>,
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(subcommand)]
    Generate(GenerateCommand),
    #[command(subcommand)]
    Logs(LogsCommand),
}

#[derive(Subcommand, Debug)]
enum GenerateCommand {
    Users(UsersArgs),
    Affiliates(AffiliatesArgs),
    Products(ProductsArgs),
    Orders(OrdersArgs),
    Transactions(TransactionsArgs),
}

#[derive(Subcommand, Debug)]
enum LogsCommand {
    /// Delete event log files older than the retention window.
    Purge {
        #[arg(long)]
        days: Option<i64>,
    },
}

#[derive(Args, Debug)]
struct FormatArg {
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[derive(Args, Debug)]
struct UsersArgs {
    #[arg(long, default_value_t = affseed_generate::options::DEFAULT_USER_NUMBER)]
    number: i64,
    #[command(flatten)]
    output: FormatArg,
}

#[derive(Args, Debug)]
struct AffiliatesArgs {
    #[arg(long, default_value_t = affseed_generate::options::DEFAULT_AFFILIATE_NUMBER)]
    number: i64,
    #[arg(long)]
    status: Option<String>,
    #[arg(long)]
    rate: Option<f64>,
    #[arg(long)]
    rate_type: Option<String>,
    #[arg(long)]
    payment_email: Option<String>,
    #[arg(long, default_value_t = 0.0)]
    earnings: f64,
    #[arg(long, default_value_t = 0)]
    referrals: u64,
    #[arg(long, default_value_t = 0)]
    visits: u64,
    #[arg(long)]
    website_url: Option<String>,
    /// Registration date, absolute or relative ("2 days ago").
    #[arg(long)]
    date_registered: Option<String>,
    #[command(flatten)]
    output: FormatArg,
}

#[derive(Args, Debug)]
struct ProductsArgs {
    integration: String,
    #[arg(long, default_value_t = affseed_generate::options::DEFAULT_PRODUCT_NUMBER)]
    number: i64,
    #[arg(long, default_value_t = 0.0)]
    min_price: f64,
    #[arg(long, default_value_t = 100.0)]
    max_price: f64,
    #[command(flatten)]
    output: FormatArg,
}

#[derive(Args, Debug)]
struct CountRangeArgs {
    /// Fewest products per order.
    #[arg(long)]
    min_products: Option<i64>,
    /// Most products per order.
    #[arg(long)]
    max_products: Option<i64>,
}

impl CountRangeArgs {
    fn to_range(&self) -> CountRange {
        match (self.min_products, self.max_products) {
            (None, None) => CountRange::default(),
            (min, max) => CountRange::Range { min, max },
        }
    }
}

#[derive(Args, Debug)]
struct DateArgs {
    #[arg(long)]
    earliest_date: Option<String>,
    #[arg(long)]
    latest_date: Option<String>,
}

impl DateArgs {
    fn to_range(&self) -> Option<DateRangeArg> {
        match (&self.earliest_date, &self.latest_date) {
            (None, None) => None,
            (earliest, latest) => Some(DateRangeArg::Bounds {
                earliest: earliest.clone(),
                latest: latest.clone(),
            }),
        }
    }
}

#[derive(Args, Debug)]
struct OrdersArgs {
    integration: String,
    #[arg(long, default_value_t = affseed_generate::options::DEFAULT_ORDER_NUMBER)]
    number: i64,
    /// Customer account ids.
    #[arg(long, value_delimiter = ',', required = true)]
    users: Vec<u64>,
    /// Product ids available to orders.
    #[arg(long, value_delimiter = ',', required = true)]
    products: Vec<u64>,
    /// Affiliate ids; orders are referred when given.
    #[arg(long, value_delimiter = ',')]
    affiliates: Vec<u64>,
    #[arg(long, value_delimiter = ',')]
    campaigns: Vec<String>,
    #[command(flatten)]
    per_order: CountRangeArgs,
    #[command(flatten)]
    dates: DateArgs,
    #[command(flatten)]
    output: FormatArg,
}

#[derive(Args, Debug)]
struct TransactionsArgs {
    integration: String,
    #[arg(long, default_value_t = affseed_generate::options::DEFAULT_TRANSACTION_NUMBER)]
    number: i64,
    #[arg(long, default_value_t = 20)]
    users: i64,
    #[arg(long, default_value_t = 5)]
    affiliates: i64,
    #[arg(long, default_value_t = 10)]
    products: i64,
    #[arg(long, value_delimiter = ',')]
    campaigns: Vec<String>,
    #[command(flatten)]
    per_order: CountRangeArgs,
    #[command(flatten)]
    dates: DateArgs,
    #[command(flatten)]
    output: FormatArg,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(rendered) => {
            if !rendered.is_empty() {
                println!("{rendered}");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<String, CliError> {
    let settings = load_settings(cli.config.as_deref())?;
    logging::init_logging(cli.verbose, &settings.log_dir)?;

    let events = EventLog::new(&settings.log_dir);

    let command = match cli.command {
        Command::Logs(LogsCommand::Purge { days }) => {
            let days = days.unwrap_or(settings.log_retention_days);
            let removed = events.purge(days)?;
            return Ok(format!("Removed {} log file(s).", removed.len()));
        }
        Command::Generate(command) => command,
    };

    events.purge(settings.log_retention_days)?;

    let state_path = cli.state.or(settings.state);
    let host = match &state_path {
        Some(path) => MemoryHost::load(settings.host.clone(), path)?,
        None => MemoryHost::new(settings.host.clone()),
    };

    let random = match cli.seed.or(settings.seed) {
        Some(seed) => Randomizer::seeded(seed),
        None => Randomizer::from_entropy(),
    };

    tracing::info!(event = "run_started", seed = ?cli.seed.or(settings.seed));
    let mut generate = Generate::new(&host, &events, random);
    let outcome = generate_records(&mut generate, &host, command);

    if let Some(path) = &state_path {
        host.save(path)?;
        tracing::info!(event = "state_saved", path = %path.display());
    }
    conclude(&events, outcome)
}

/// Flush the event log, then render the outcome. A flush failure is only logged
/// so it never hides the generation result.
fn conclude(
    events: &EventLog,
    outcome: Result<(OutputFormat, Records), CliError>,
) -> Result<String, CliError> {
    if let Err(err) = events.flush() {
        tracing::warn!(event = "event_flush_failed", codes = ?err.codes());
    }
    let (format, records) = outcome?;
    output::render(format, &records)
}

fn generate_records(
    generate: &mut Generate<'_>,
    host: &MemoryHost,
    command: GenerateCommand,
) -> Result<(OutputFormat, Records), CliError> {
    let mut progress = |tick: Tick| {
        tracing::debug!(
            event = "unit_generated",
            unit = ?tick.unit,
            index = tick.index,
            id = ?tick.id
        );
    };

    match command {
        GenerateCommand::Users(args) => {
            let generated = generate.users(UserOptions { number: args.number }, &mut progress)?;
            report_skipped(&generated);
            Ok((args.output.format, user_records(host, &generated.ids)))
        }
        GenerateCommand::Affiliates(args) => {
            let options = AffiliateOptions {
                number: args.number,
                status: args.status,
                date_registered: args.date_registered,
                rate: args.rate,
                rate_type: args.rate_type,
                payment_email: args.payment_email,
                earnings: args.earnings,
                referrals: args.referrals,
                visits: args.visits,
                website_url: args.website_url,
            };
            let generated = generate.affiliates(options, &mut progress)?;
            report_skipped(&generated);
            Ok((args.output.format, affiliate_records(host, &generated.ids)))
        }
        GenerateCommand::Products(args) => {
            let integration = generate.integration(args.integration.as_str())?;
            let options = ProductOptions {
                number: args.number,
                min_price: args.min_price,
                max_price: args.max_price,
            };
            let generated = generate.products(&integration, options, &mut progress)?;
            report_skipped(&generated);
            Ok((args.output.format, product_records(host, &integration, &generated.ids)))
        }
        GenerateCommand::Orders(args) => {
            let integration = generate.integration(args.integration.as_str())?;
            let mut options = OrderOptions {
                number: args.number,
                users: args.users,
                affiliates: args.affiliates,
                products: args.products,
                products_per_transaction: args.per_order.to_range(),
                date_range: args.dates.to_range(),
                ..OrderOptions::default()
            };
            if !args.campaigns.is_empty() {
                options.campaigns = args.campaigns;
            }
            let generated = generate.orders(&integration, options, &mut progress)?;
            report_skipped(&generated);
            Ok((args.output.format, order_records(host, &integration, &generated.ids)))
        }
        GenerateCommand::Transactions(args) => {
            let integration = generate.integration(args.integration.as_str())?;
            let mut options = TransactionOptions {
                number: args.number,
                users: SubRequest::Count(args.users),
                affiliates: SubRequest::Count(args.affiliates),
                products: SubRequest::Count(args.products),
                products_per_transaction: args.per_order.to_range(),
                ..TransactionOptions::default()
            };
            if let Some(range) = args.dates.to_range() {
                options.date_range = range;
            }
            if !args.campaigns.is_empty() {
                options.campaigns = args.campaigns;
            }
            let batch = generate.transactions(&integration, options, &mut progress)?;
            for stage in [&batch.users, &batch.affiliates, &batch.products, &batch.orders] {
                report_skipped(stage);
            }
            tracing::info!(
                event = "transaction_pools",
                users = batch.users.len(),
                affiliates = batch.affiliates.len(),
                products = batch.products.len(),
                orders = batch.orders.len()
            );
            Ok((args.output.format, order_records(host, &integration, &batch.orders.ids)))
        }
    }
}

fn report_skipped(generated: &Generated) {
    for skipped in &generated.skipped {
        tracing::warn!(
            event = "unit_skipped",
            unit = ?skipped.unit,
            index = skipped.index,
            codes = ?skipped.errors.codes()
        );
    }
}

fn user_records(host: &dyn Host, ids: &[u64]) -> Records {
    let rows: Vec<UserRow> = ids
        .iter()
        .filter_map(|id| host.account(*id))
        .map(|account| UserRow::from(&account))
        .collect();
    Records::from_rows(&rows)
}

fn affiliate_records(host: &dyn Host, ids: &[u64]) -> Records {
    let rows: Vec<AffiliateRow> = ids
        .iter()
        .filter_map(|id| host.affiliate(*id))
        .map(|affiliate| {
            let account = host.account(affiliate.user_id);
            AffiliateRow::new(&affiliate, account.as_ref())
        })
        .collect();
    Records::from_rows(&rows)
}

fn product_records(host: &dyn Host, integration: &Integration, ids: &[u64]) -> Records {
    if !integration.supports_reporting() {
        return Records::ids(ids);
    }
    let rows: Vec<_> = ids
        .iter()
        .filter_map(|id| integration.get_product(host, *id))
        .collect();
    Records::from_rows(&rows)
}

fn order_records(host: &dyn Host, integration: &Integration, ids: &[u64]) -> Records {
    if !integration.supports_reporting() {
        return Records::ids(ids);
    }
    let rows: Vec<_> = ids
        .iter()
        .filter_map(|id| integration.get_order(host, *id))
        .collect();
    Records::from_rows(&rows)
}
