pub mod backend;
pub mod scripted;

use std::{sync::Arc, time::Duration};

use actix_web::web;
use cms::{
    AuthStore, ChildService, EventService, ProjectService, Session,
    session::MemorySessionStore, telemetry,
};
use jiff::civil::{date, datetime};
use payloads::{
    APIClient, AdoptionStatus, ProjectStatus,
    requests::{AdoptionChildRequest, EventRequest, ProjectRequest},
};
use rust_decimal::Decimal;
use tracing_log::LogTracer;
use tracing_subscriber::util::SubscriberInitExt;

use crate::backend::Backend;

pub const ADMIN_EMAIL: &str = "admin@fundacion.org";
pub const ADMIN_PASSWORD: &str = "correct horse";

pub struct TestApp {
    #[allow(unused)]
    pub port: u16,
    pub backend: web::Data<Backend>,
    pub client: APIClient,
    pub session: Arc<Session>,
}

impl TestApp {
    pub fn auth(&self) -> AuthStore {
        AuthStore::new(self.client.clone(), self.session.clone())
    }

    /// Log in as the seeded admin account.
    pub async fn login_admin(&self) -> anyhow::Result<()> {
        self.auth().login(ADMIN_EMAIL, ADMIN_PASSWORD).await?;
        Ok(())
    }

    pub fn events(&self) -> EventService {
        EventService::new(self.client.clone())
    }

    pub fn projects(&self) -> ProjectService {
        ProjectService::new(self.client.clone())
    }

    pub fn children(&self) -> ChildService {
        ChildService::new(self.client.clone())
    }

    /// A client sharing this app's login that gives up after `timeout`.
    pub fn client_with_timeout(&self, timeout: Duration) -> APIClient {
        APIClient {
            address: self.client.address.clone(),
            inner_client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap(),
            token: self.client.token.clone(),
        }
    }
}

pub async fn spawn_backend_on_port(port: u16) -> TestApp {
    let subscriber = telemetry::get_subscriber("error".into());
    let _ = LogTracer::init();
    let _ = subscriber.try_init();

    let backend = web::Data::new(Backend::default());
    backend.add_account(ADMIN_EMAIL, ADMIN_PASSWORD);

    let (server, port) = backend::build(backend.clone(), port).unwrap();
    tokio::spawn(server);

    let client = APIClient::new(
        format!("http://127.0.0.1:{port}"),
        reqwest::Client::new(),
    );
    let session = Session::init(
        Arc::new(MemorySessionStore::default()),
        client.token.clone(),
    )
    .unwrap();

    TestApp {
        port,
        backend,
        client,
        session: Arc::new(session),
    }
}

/// Use OS-assigned port for parallel testing.
pub async fn spawn_backend() -> TestApp {
    spawn_backend_on_port(0).await
}

pub fn event_details_a() -> EventRequest {
    EventRequest {
        title: "Gala".into(),
        description: "Annual fundraising dinner".into(),
        event_date: datetime(2030, 11, 20, 19, 30, 0, 0),
        location: Some("Casa de la Cultura".into()),
        image_url: None,
        max_participants: Some(120),
        is_active: Some(true),
    }
}

pub fn event_details_b() -> EventRequest {
    EventRequest {
        title: "Charity run".into(),
        description: "5k around the park".into(),
        event_date: datetime(2030, 4, 6, 8, 0, 0, 0),
        location: Some("Parque Central".into()),
        image_url: Some("https://img.example.org/run.jpg".into()),
        max_participants: None,
        is_active: Some(false),
    }
}

pub fn project_details_a() -> ProjectRequest {
    ProjectRequest {
        title: "School roof".into(),
        description: "Replace the roof of the rural school".into(),
        category: Some("education".into()),
        status: Some(ProjectStatus::InProgress),
        image_url: None,
        budget: Some(Decimal::new(10_000, 0)),
        funds_raised: Some(Decimal::new(2_500, 0)),
        start_date: Some(date(2025, 2, 1)),
        end_date: None,
        is_active: Some(true),
    }
}

pub fn child_details_a() -> AdoptionChildRequest {
    AdoptionChildRequest {
        first_name: "Lucía".into(),
        last_name: "Pérez".into(),
        birth_date: date(2016, 5, 14),
        gender: Some("F".into()),
        photo_url: None,
        bio: Some("Loves drawing".into()),
        special_needs: None,
        current_location: Some("Hogar San José".into()),
        adoption_status: Some(AdoptionStatus::Available),
        sponsor_id: None,
        is_active: Some(true),
    }
}
