use clap::{Parser, Subcommand};

mod notifications;
mod provider;

#[derive(Debug, Parser)]
#[command(name = "atelier-app", about = "Atelier administration CLI", long_about = None)]
pub(crate) struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Manage providers, their working hours and absences
    Provider(provider::ProviderCommand),
    /// Scheduled notification batches
    Notifications(notifications::NotificationsCommand),
}

impl Cli {
    pub(crate) async fn run(self) -> Result<(), String> {
        match self.command {
            Commands::Provider(command) => provider::run(command).await,
            Commands::Notifications(command) => notifications::run(command).await,
        }
    }
}
