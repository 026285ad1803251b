use anyhow::Result;
use clap::Parser;

use pos_checkout::cli::commands::checkout::CheckoutCommand;
use pos_checkout::cli::commands::config::{InitConfigCommand, ShowConfigCommand};
use pos_checkout::cli::commands::customers::{CreateCustomerCommand, SearchCustomersCommand};
use pos_checkout::cli::commands::devices::DevicesCommand;
use pos_checkout::cli::commands::phone::NormalizePhoneCommand;
use pos_checkout::cli::commands::quote::QuoteCommand;
use pos_checkout::cli::commands::show_getting_started;
use pos_checkout::cli::{Cli, Commands, ConfigAction, CustomerAction};
use pos_checkout::config::PosCheckoutConfig;
use pos_checkout::observability::api_metrics;
use pos_checkout::telemetry::{init_telemetry, shutdown_telemetry};

fn main() -> Result<()> {
    let cli = Cli::parse();

    PosCheckoutConfig::load_env_file()?;
    let settings = PosCheckoutConfig::load_from(cli.config.as_deref())?;
    init_telemetry(&settings.observability)?;

    let result = match cli.command {
        None => show_getting_started(),
        Some(command) => run(command, &settings),
    };

    if api_metrics().get_stats().total_requests > 0 {
        api_metrics().log_stats();
    }
    shutdown_telemetry();
    result
}

fn run(command: Commands, settings: &PosCheckoutConfig) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new;
    match command {
        Commands::NormalizePhone { phone } => NormalizePhoneCommand::new(phone).execute(),
        Commands::Config {
            action: ConfigAction::Show,
        } => ShowConfigCommand.execute(settings),
        Commands::Config {
            action: ConfigAction::Init { path, force },
        } => InitConfigCommand { path, force }.execute(),
        Commands::Quote {
            total,
            cart,
            discount,
            discount_type,
            cash,
        } => runtime()?.block_on(
            QuoteCommand {
                total,
                cart,
                discount,
                discount_type,
                cash,
            }
            .execute(),
        ),
        Commands::Customers {
            action: CustomerAction::Search { phone, limit },
        } => runtime()?.block_on(
            SearchCustomersCommand {
                phone,
                limit: limit.unwrap_or(settings.checkout.customer_search_limit),
            }
            .execute(settings),
        ),
        Commands::Customers {
            action: CustomerAction::Create { name, phone, email },
        } => runtime()?.block_on(CreateCustomerCommand { name, phone, email }.execute(settings)),
        Commands::Devices { customer } => runtime()?.block_on(
            DevicesCommand {
                customer_id: customer,
            }
            .execute(settings),
        ),
        Commands::Checkout(args) => {
            runtime()?.block_on(CheckoutCommand::new(args).execute(settings))
        }
    }
}
