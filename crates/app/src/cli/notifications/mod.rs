use clap::{Args, Subcommand};
use jiff::Timestamp;

use atelier_app::{
    database::{self, Db},
    domain::notifications::{DispatchSummary, NotificationDispatcher},
    settings::{DatabaseSettings, MailSettings, StudioSettings},
};

#[derive(Debug, Args)]
pub(crate) struct NotificationsCommand {
    #[command(flatten)]
    database: DatabaseSettings,

    #[command(flatten)]
    studio: StudioSettings,

    #[command(flatten)]
    mail: MailSettings,

    /// Evaluate due messages as of this instant (RFC 3339) instead of now
    #[arg(long, global = true)]
    now: Option<Timestamp>,

    #[command(subcommand)]
    command: NotificationsSubcommand,
}

#[derive(Debug, Subcommand)]
enum NotificationsSubcommand {
    /// Remind clients of confirmed bookings starting tomorrow
    Reminders,
    /// Ask clients of completed sessions for a review
    Reviews,
}

pub(crate) async fn run(command: NotificationsCommand) -> Result<(), String> {
    let pool = database::connect(&command.database.database_url)
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

    let time_zone = command
        .studio
        .time_zone()
        .map_err(|error| format!("invalid studio settings: {error}"))?;

    let mailer = command
        .mail
        .mailer()
        .map_err(|error| format!("invalid mail settings: {error}"))?;

    let dispatcher = NotificationDispatcher::new(
        Db::new(pool),
        mailer,
        time_zone,
        command.studio.currency,
        command.mail.retry_delay(),
    );

    let now = command.now.unwrap_or_else(Timestamp::now);

    let summary = match command.command {
        NotificationsSubcommand::Reminders => dispatcher.send_due_reminders(now).await,
        NotificationsSubcommand::Reviews => dispatcher.send_due_review_requests(now).await,
    }
    .map_err(|error| format!("failed to dispatch notifications: {error}"))?;

    print_summary(summary);

    Ok(())
}

fn print_summary(summary: DispatchSummary) {
    println!("sent: {}", summary.sent);
    println!("failed: {}", summary.failed);
}
