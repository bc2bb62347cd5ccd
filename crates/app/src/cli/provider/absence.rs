use clap::{Args, Subcommand};
use jiff::civil::Date;
use uuid::Uuid;

use atelier_app::domain::providers::{ProvidersService, data::NewAbsence};

#[derive(Debug, Args)]
pub(crate) struct AbsenceCommand {
    #[command(subcommand)]
    command: AbsenceSubcommand,
}

#[derive(Debug, Subcommand)]
enum AbsenceSubcommand {
    /// Block a whole day
    Add(AddAbsenceArgs),
}

#[derive(Debug, Args)]
struct AddAbsenceArgs {
    /// Provider UUID
    #[arg(long)]
    provider_uuid: Uuid,

    /// Day off (YYYY-MM-DD, studio time)
    #[arg(long)]
    date: Date,

    /// Optional note, e.g. "convention"
    #[arg(long)]
    reason: Option<String>,
}

pub(crate) async fn run(service: &dyn ProvidersService, command: AbsenceCommand) -> Result<(), String> {
    match command.command {
        AbsenceSubcommand::Add(args) => add(service, args).await,
    }
}

async fn add(service: &dyn ProvidersService, args: AddAbsenceArgs) -> Result<(), String> {
    let absence = service
        .add_absence(
            args.provider_uuid.into(),
            NewAbsence {
                date: args.date,
                reason: args.reason,
            },
        )
        .await
        .map_err(|error| format!("failed to add absence: {error}"))?;

    println!("absence_uuid: {}", absence.uuid);
    println!("date: {}", absence.date);

    Ok(())
}
