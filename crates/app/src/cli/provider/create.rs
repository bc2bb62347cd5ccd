use clap::Args;
use uuid::Uuid;

use atelier_app::domain::providers::{ProvidersService, data::NewProvider};

#[derive(Debug, Args)]
pub(crate) struct CreateProviderArgs {
    /// Display name shown to clients
    #[arg(long)]
    name: String,

    /// Address booking alerts are sent to
    #[arg(long)]
    email: String,

    /// Minutes of setup before every booking
    #[arg(long, default_value_t = 0)]
    prep_minutes: u32,

    /// Minutes of cleanup after every booking
    #[arg(long, default_value_t = 0)]
    cleanup_minutes: u32,

    /// Extra idle minutes after cleanup
    #[arg(long, default_value_t = 0)]
    buffer_minutes: u32,

    /// Granularity candidate slot starts are generated at
    #[arg(long, default_value_t = 30)]
    slot_interval_minutes: u32,

    /// Optional provider UUID; generated when omitted
    #[arg(long)]
    provider_uuid: Option<Uuid>,
}

pub(crate) async fn run(service: &dyn ProvidersService, args: CreateProviderArgs) -> Result<(), String> {
    let provider = service
        .create_provider(NewProvider {
            uuid: args.provider_uuid.unwrap_or_else(Uuid::now_v7).into(),
            name: args.name,
            email: args.email,
            prep_minutes: args.prep_minutes,
            cleanup_minutes: args.cleanup_minutes,
            buffer_minutes: args.buffer_minutes,
            slot_interval_minutes: args.slot_interval_minutes,
        })
        .await
        .map_err(|error| format!("failed to create provider: {error}"))?;

    println!("provider_uuid: {}", provider.uuid);
    println!("provider_name: {}", provider.name);
    println!(
        "padding: prep {}m, cleanup {}m, buffer {}m",
        provider.prep_minutes, provider.cleanup_minutes, provider.buffer_minutes
    );
    println!("slot_interval: {}m", provider.slot_interval_minutes);

    Ok(())
}
