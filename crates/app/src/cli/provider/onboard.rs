use clap::Args;
use uuid::Uuid;

use atelier_app::domain::providers::{ProvidersService, data::GatewayAccount};

#[derive(Debug, Args)]
pub(crate) struct OnboardProviderArgs {
    /// Provider UUID
    #[arg(long)]
    provider_uuid: Uuid,

    /// Connected account id issued by the gateway
    #[arg(long)]
    account_id: String,

    /// Store the account without enabling online payments yet
    #[arg(long)]
    pending: bool,
}

pub(crate) async fn run(service: &dyn ProvidersService, args: OnboardProviderArgs) -> Result<(), String> {
    let provider = service
        .set_gateway_account(
            args.provider_uuid.into(),
            GatewayAccount {
                account_id: args.account_id,
                onboarded: !args.pending,
            },
        )
        .await
        .map_err(|error| format!("failed to onboard provider: {error}"))?;

    println!("provider_uuid: {}", provider.uuid);
    println!(
        "gateway_account: {}",
        provider.gateway_account_id.as_deref().unwrap_or_default()
    );
    println!("onboarded: {}", provider.gateway_onboarded);

    Ok(())
}
