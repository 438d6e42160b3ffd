use actix_middleware::{ContextMiddleware, Logging};
use actix_web::{App, HttpServer};
use anyhow::Context;
use auth_guard::{GuardPipeline, LogNotificationSink};
use graphql_gateway::config::Config;
use graphql_gateway::{GatewayState, JwtTokenVerifier, PgPrincipalDirectory};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::prelude::*;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Structured JSON logging; span fields carry the correlation id
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,graphql_gateway=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_file(true)
                .with_target(true),
        )
        .init();

    info!("Starting GraphQL Gateway...");

    let config = Config::from_env().context("Failed to load configuration")?;

    let verifier =
        JwtTokenVerifier::from_config(&config.jwt).context("Failed to build token verifier")?;
    let directory = PgPrincipalDirectory::connect_lazy(&config.database)
        .context("Failed to configure principal directory pool")?;

    let context_middleware = ContextMiddleware::new(config.context.clone());
    let context = context_middleware.context_service();

    info!(
        storage = ?config.context.storage,
        identity_source = ?config.context.identity_source,
        "Request context configured"
    );

    let pipeline = GuardPipeline::builder(Arc::new(verifier), Arc::new(directory))
        .notifier(Arc::new(LogNotificationSink))
        .context(context.clone())
        .build();

    let state = GatewayState::new(pipeline, context, &config.graphql);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    info!("GraphQL Gateway starting on http://{}", bind_addr);

    HttpServer::new(move || {
        let state = state.clone();
        App::new()
            .wrap(Logging::new(state.context.clone()))
            .wrap(context_middleware.clone())
            .configure(move |cfg| state.configure(cfg))
    })
    .workers(config.server.workers)
    .bind(&bind_addr)?
    .run()
    .await?;

    Ok(())
}
