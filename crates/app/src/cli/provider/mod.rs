use clap::{Args, Subcommand};

use atelier_app::{
    database::{self, Db},
    domain::providers::PgProvidersService,
    settings::DatabaseSettings,
};

mod absence;
mod create;
mod hours;
mod onboard;

#[derive(Debug, Args)]
pub(crate) struct ProviderCommand {
    #[command(flatten)]
    database: DatabaseSettings,

    #[command(subcommand)]
    command: ProviderSubcommand,
}

#[derive(Debug, Subcommand)]
enum ProviderSubcommand {
    /// Register a provider
    Create(create::CreateProviderArgs),
    /// Working hours
    Hours(hours::HoursCommand),
    /// Days off
    Absence(absence::AbsenceCommand),
    /// Attach the provider's connected gateway account
    Onboard(onboard::OnboardProviderArgs),
}

pub(crate) async fn run(command: ProviderCommand) -> Result<(), String> {
    let pool = database::connect(&command.database.database_url)
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

    let service = PgProvidersService::new(Db::new(pool));

    match command.command {
        ProviderSubcommand::Create(args) => create::run(&service, args).await,
        ProviderSubcommand::Hours(command) => hours::run(&service, command).await,
        ProviderSubcommand::Absence(command) => absence::run(&service, command).await,
        ProviderSubcommand::Onboard(args) => onboard::run(&service, args).await,
    }
}
