//! Atelier JSON API Server

use std::process;

use salvo::{
    affix_state::inject,
    oapi::{
        OpenApi,
        security::{Http, HttpAuthScheme, SecurityScheme},
        swagger_ui::SwaggerUi,
    },
    prelude::*,
    trailing_slash::remove_slash,
};
use tracing::{error, info};

use atelier_app::{context::AppContext, rate_limit::RateLimiter};

use crate::{
    config::ServerConfig,
    observability::{Observability, metrics_handler, request_logging},
    state::{Secrets, State},
};

mod bookings;
mod config;
mod errors;
mod extensions;
mod healthcheck;
mod internal;
mod observability;
mod payments;
mod rate_limit;
mod router;
mod shutdown;
mod slots;
mod state;
#[cfg(test)]
mod test_helpers;
mod webhooks;

/// Atelier JSON API Server entry point
#[tokio::main]
pub async fn main() {
    if let Err(message) = run().await {
        #[expect(
            clippy::print_stderr,
            reason = "logging may not be initialized when startup fails"
        )]
        {
            eprintln!("{message}");
        }

        process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    // Load configuration from .env and CLI arguments
    let config = ServerConfig::load().map_err(|error| format!("Configuration error: {error}"))?;

    let observability = Observability::init(&config)
        .map_err(|error| format!("Failed to initialize observability: {error}"))?;

    let addr = config.socket_addr();
    let grace = config.server.shutdown_grace();

    let app = match AppContext::from_settings(
        &config.database.database_url,
        &config.studio,
        &config.mail,
        &config.gateway,
    )
    .await
    {
        Ok(app) => app,
        Err(init_error) => {
            error!("failed to initialize app context: {init_error}");
            observability.shutdown();

            return Err(format!("Failed to initialize app context: {init_error}"));
        }
    };

    let state = State::from_app_context(
        app,
        RateLimiter::new(config.rate_limit.limiter_config()),
        Secrets {
            webhook: config.gateway.gateway_webhook_secret.clone(),
            internal_token: config.internal.internal_api_token.clone(),
        },
        config.rate_limit.trusted_proxy_hops,
    );

    info!("Starting server on {addr}");

    // Bind server
    let listener = TcpListener::new(addr).bind().await;

    let router = Router::new()
        .hoop(CatchPanic::new())
        .hoop(remove_slash())
        .hoop(request_logging)
        .hoop(inject(state))
        .push(Router::with_path("healthcheck").get(healthcheck::handler))
        .push(Router::with_path("metrics").get(metrics_handler))
        .push(router::app_router());

    let doc = OpenApi::new("Atelier API", env!("CARGO_PKG_VERSION"))
        .add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        )
        .merge_router(&router);

    let router = router
        .push(doc.into_router("/api-doc/openapi.json"))
        .push(SwaggerUi::new("/api-doc/openapi.json").into_router("docs"));

    let server = Server::new(listener);

    let handle = server.handle();

    // Listen for shutdown signal
    tokio::spawn(async move {
        if let Err(error) = shutdown::listen(handle, grace).await {
            error!("failed to listen for shutdown signal: {error}");
        }
    });

    // Start serving requests
    server.serve(router).await;

    info!("Server stopped");

    observability.shutdown();

    Ok(())
}
