//! Development server for working on CMS clients without the real backend.
//!
//! Serves the in-memory fake backend on a fixed port and fills it with a small
//! demo dataset, created through the same REST services a client would use.
//!
//! Usage: cargo run -p dev-server
//!
//! DEV_SERVER_PORT selects the port (default 8080, which matches the default
//! CMS_API_URL).

use std::sync::Arc;

use actix_web::web;
use anyhow::Context;
use cms::{
    AuthStore, ChildStore, Config, EventStore, ProjectStore, Session,
    telemetry,
};
use jiff::civil::datetime;
use payloads::{AdoptionStatus, ProjectStatus, RecordId};
use rust_decimal::Decimal;
use test_helpers::{
    ADMIN_EMAIL, ADMIN_PASSWORD, backend::Backend, child_details_a,
    event_details_a, event_details_b, project_details_a,
};
use tracing::info;

const DEFAULT_PORT: u16 = 8080;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let subscriber = telemetry::get_subscriber("info".into());
    telemetry::init_subscriber(subscriber)?;

    let port = match std::env::var("DEV_SERVER_PORT") {
        Ok(port) => port
            .parse()
            .with_context(|| format!("invalid DEV_SERVER_PORT {port:?}"))?,
        Err(_) => DEFAULT_PORT,
    };

    let backend = web::Data::new(Backend::default());
    let admin = backend.add_account(ADMIN_EMAIL, ADMIN_PASSWORD);
    let (server, port) = test_helpers::backend::build(backend.clone(), port)?;
    let server = tokio::spawn(server);
    let address = format!("http://127.0.0.1:{port}");
    info!("fake CMS backend running on {address}");

    if let Err(e) = seed(&address, admin.id).await {
        telemetry::log_error(e.context("could not seed demo data"));
    }
    info!(
        events = backend.count("events"),
        projects = backend.count("projects"),
        children = backend.count("children"),
        "demo data ready"
    );
    info!("log in as {ADMIN_EMAIL} / {ADMIN_PASSWORD}");
    info!("press Ctrl+C to shut down");

    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        result = server => result??,
    }
    info!("shutting down");
    Ok(())
}

/// Log in as the admin and create a few records of every kind.
async fn seed(address: &str, sponsor: RecordId) -> anyhow::Result<()> {
    // timeout and session file still come from the environment
    let config = Config {
        api_url: address.to_string(),
        ..Config::from_env()?
    };
    let client = config.api_client()?;
    let session = Session::init(config.session_store(), client.token.clone())?;
    AuthStore::new(client.clone(), Arc::new(session))
        .login(ADMIN_EMAIL, ADMIN_PASSWORD)
        .await?;

    let events = EventStore::new(cms::EventService::new(client.clone()));
    events.create(&event_details_a()).await?;
    events.create(&event_details_b()).await?;
    let mut bazaar = event_details_a();
    bazaar.title = "Spring bazaar".into();
    bazaar.event_date = datetime(2024, 3, 9, 10, 0, 0, 0);
    bazaar.max_participants = None;
    events.create(&bazaar).await?;

    let projects = ProjectStore::new(cms::ProjectService::new(client.clone()));
    let roof = projects.create(&project_details_a()).await?;
    projects
        .service()
        .update_funds(roof.id, Decimal::new(7_250, 0))
        .await?;
    let mut library = project_details_a();
    library.title = "Community library".into();
    library.category = Some("culture".into());
    library.status = Some(ProjectStatus::Planning);
    library.funds_raised = None;
    projects.create(&library).await?;

    let children = ChildStore::new(cms::ChildService::new(client));
    let lucia = children.create(&child_details_a()).await?;
    children.service().assign_sponsor(lucia.id, sponsor).await?;
    let mut mateo = child_details_a();
    mateo.first_name = "Mateo".into();
    mateo.last_name = "Gómez".into();
    mateo.adoption_status = Some(AdoptionStatus::InProcess);
    children.create(&mateo).await?;

    Ok(())
}
