//! A fake CMS backend served by actix-web.
//!
//! It speaks the same REST dialect as the real backend (envelopes, bearer
//! tokens, the `/api/cms/{kind}` routes) and keeps everything in memory.
//! Records are stored as JSON in their wire shape so that one set of handlers
//! serves events, projects and children.

use std::{
    collections::{BTreeMap, HashMap},
    net::TcpListener,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use actix_web::{
    App, HttpRequest, HttpResponse, HttpServer, delete, dev::Server, get,
    http::StatusCode, patch, post, put, web,
};
use jiff::{
    Unit, Zoned,
    civil::{Date, DateTime},
};
use payloads::{
    AdoptionStatus, ApiResponse, ProjectStatus,
    requests::{LoginRequest, RegisterRequest},
    responses::{LoginResponse, RegisterResponse, UserInfo},
};
use serde::Deserialize;
use serde_json::{Map, Value, json};

/// Timestamp stamped on every record the fake creates or changes.
pub const FIXED_NOW: &str = "2025-01-01T00:00:00";

const KINDS: [&str; 3] = ["events", "projects", "children"];

struct Account {
    user: UserInfo,
    password: String,
}

#[derive(Default)]
struct State {
    collections: HashMap<&'static str, BTreeMap<i64, Value>>,
    accounts: Vec<Account>,
    tokens: HashMap<String, i64>,
    next_id: i64,
    fail_next: Option<(u16, Option<String>)>,
    delay: Option<Duration>,
}

/// Shared state of a running fake backend.
#[derive(Default)]
pub struct Backend {
    state: Mutex<State>,
}

impl Backend {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an account that can log in.
    pub fn add_account(&self, email: &str, password: &str) -> UserInfo {
        let mut state = self.state();
        let user = UserInfo {
            id: state.allocate_id().into(),
            email: email.to_string(),
            first_name: None,
            last_name: None,
            role: Some("ADMIN".into()),
        };
        state.accounts.push(Account {
            user: user.clone(),
            password: password.to_string(),
        });
        user
    }

    /// The next `/cms` request answers with `status` and, if given, an error
    /// envelope carrying `message`; otherwise an empty body.
    pub fn fail_next(&self, status: u16, message: Option<&str>) {
        self.state().fail_next = Some((status, message.map(String::from)));
    }

    /// Delay every `/cms` response, e.g. to provoke client timeouts.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.state().delay = delay;
    }

    /// Raw stored record, as the fake would serialize it.
    pub fn record(&self, kind: &str, id: i64) -> Option<Value> {
        self.state()
            .collections
            .get(kind)
            .and_then(|records| records.get(&id))
            .cloned()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.state().collections.get(kind).map_or(0, BTreeMap::len)
    }

    /// Insert a record directly, bypassing validation. Returns its id.
    pub fn seed(&self, kind: &str, body: Value) -> Option<i64> {
        let kind = known_kind(kind)?;
        let mut state = self.state();
        let id = state.allocate_id();
        let record = materialize(kind, id, None, body);
        state.collections.entry(kind).or_default().insert(id, record);
        Some(id)
    }
}

impl State {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Build the server, but not await it.
///
/// Returns the server and the port it bound to; pass port 0 for an
/// OS-assigned one.
pub fn build(
    backend: web::Data<Backend>,
    port: u16,
) -> std::io::Result<(Server, u16)> {
    let listener = TcpListener::bind(format!("127.0.0.1:{port}"))?;
    let port = listener.local_addr()?.port();
    let server = HttpServer::new(move || {
        App::new()
            .service(
                web::scope("/api")
                    .service(login)
                    .service(register)
                    .service(search)
                    .service(list)
                    .service(create)
                    .service(get_record)
                    .service(update)
                    .service(delete_record)
                    .service(set_active)
                    .service(update_funds)
                    .service(update_status)
                    .service(assign_sponsor)
                    .service(remove_sponsor),
            )
            .app_data(backend.clone())
    })
    .workers(1)
    .listen(listener)?
    .run();
    Ok((server, port))
}

fn envelope_error(status: StatusCode, message: &str) -> HttpResponse {
    HttpResponse::build(status).json(ApiResponse::<()>::failure(message))
}

fn ok(data: Value) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::ok(data))
}

fn known_kind(kind: &str) -> Option<&'static str> {
    KINDS.into_iter().find(|known| *known == kind)
}

/// Checks shared by every `/cms` route: bearer token, scripted failure and
/// delay. Returns the response to send instead of handling the request.
async fn gate(
    req: &HttpRequest,
    backend: &Backend,
    kind: &str,
) -> Result<&'static str, HttpResponse> {
    let (failure, delay) = {
        let mut state = backend.state();
        (state.fail_next.take(), state.delay)
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    if let Some((status, message)) = failure {
        tracing::debug!(status, path = req.path(), "scripted failure");
        let status = StatusCode::from_u16(status)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return Err(match message {
            Some(message) => envelope_error(status, &message),
            None => HttpResponse::build(status).finish(),
        });
    }

    let token = req
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    let authorized = token
        .map(|token| backend.state().tokens.contains_key(token))
        .unwrap_or(false);
    if !authorized {
        return Err(envelope_error(StatusCode::UNAUTHORIZED, "Unauthorized"));
    }

    known_kind(kind).ok_or_else(|| {
        envelope_error(StatusCode::NOT_FOUND, "Unknown resource")
    })
}

#[post("/auth/login")]
async fn login(
    details: web::Json<LoginRequest>,
    backend: web::Data<Backend>,
) -> HttpResponse {
    let mut state = backend.state();
    let user = state
        .accounts
        .iter()
        .find(|a| {
            a.user.email == details.email && a.password == details.password
        })
        .map(|a| a.user.clone());
    let Some(user) = user else {
        tracing::debug!(email = %details.email, "login refused");
        return envelope_error(StatusCode::UNAUTHORIZED, "Invalid credentials");
    };
    let token = format!("token-{}-{}", user.id, state.tokens.len());
    state.tokens.insert(token.clone(), user.id.0);
    HttpResponse::Ok().json(LoginResponse {
        success: true,
        token: Some(token),
        user: Some(user),
        message: None,
    })
}

#[post("/auth/register")]
async fn register(
    details: web::Json<RegisterRequest>,
    backend: web::Data<Backend>,
) -> HttpResponse {
    let mut state = backend.state();
    if state.accounts.iter().any(|a| a.user.email == details.email) {
        return envelope_error(StatusCode::CONFLICT, "Email already registered");
    }
    let user = UserInfo {
        id: state.allocate_id().into(),
        email: details.email.clone(),
        first_name: Some(details.first_name.clone()),
        last_name: Some(details.last_name.clone()),
        role: Some("USER".into()),
    };
    state.accounts.push(Account {
        user: user.clone(),
        password: details.password.clone(),
    });
    HttpResponse::Ok().json(RegisterResponse {
        success: true,
        user: Some(user),
        message: Some("Registered".into()),
    })
}

#[get("/cms/{kind}")]
async fn list(
    req: HttpRequest,
    kind: web::Path<String>,
    query: web::Query<HashMap<String, String>>,
    backend: web::Data<Backend>,
) -> HttpResponse {
    let kind = match gate(&req, &backend, &kind).await {
        Ok(kind) => kind,
        Err(response) => return response,
    };
    let state = backend.state();
    let records: Vec<Value> = state
        .collections
        .get(kind)
        .into_iter()
        .flat_map(BTreeMap::values)
        .filter(|record| matches_filters(record, &query))
        .cloned()
        .collect();
    ok(Value::Array(records))
}

#[get("/cms/{kind}/search")]
async fn search(
    req: HttpRequest,
    kind: web::Path<String>,
    query: web::Query<HashMap<String, String>>,
    backend: web::Data<Backend>,
) -> HttpResponse {
    let kind = match gate(&req, &backend, &kind).await {
        Ok(kind) => kind,
        Err(response) => return response,
    };
    let (param, field) = if kind == "children" {
        ("name", "fullName")
    } else {
        ("title", "title")
    };
    let term = query.get(param).map(|t| t.to_lowercase()).unwrap_or_default();
    let state = backend.state();
    let records: Vec<Value> = state
        .collections
        .get(kind)
        .into_iter()
        .flat_map(BTreeMap::values)
        .filter(|record| {
            record[field]
                .as_str()
                .is_some_and(|value| value.to_lowercase().contains(&term))
        })
        .cloned()
        .collect();
    ok(Value::Array(records))
}

#[post("/cms/{kind}")]
async fn create(
    req: HttpRequest,
    kind: web::Path<String>,
    body: web::Json<Value>,
    backend: web::Data<Backend>,
) -> HttpResponse {
    let kind = match gate(&req, &backend, &kind).await {
        Ok(kind) => kind,
        Err(response) => return response,
    };
    if let Err(message) = validate(kind, &body) {
        return envelope_error(StatusCode::BAD_REQUEST, message);
    }
    let mut state = backend.state();
    let id = state.allocate_id();
    let record = materialize(kind, id, None, body.into_inner());
    state
        .collections
        .entry(kind)
        .or_default()
        .insert(id, record.clone());
    ok(record)
}

#[get("/cms/{kind}/{id}")]
async fn get_record(
    req: HttpRequest,
    path: web::Path<(String, i64)>,
    backend: web::Data<Backend>,
) -> HttpResponse {
    let (kind, id) = path.into_inner();
    let kind = match gate(&req, &backend, &kind).await {
        Ok(kind) => kind,
        Err(response) => return response,
    };
    match backend.record(kind, id) {
        Some(record) => ok(record),
        None => envelope_error(StatusCode::NOT_FOUND, "Record not found"),
    }
}

#[put("/cms/{kind}/{id}")]
async fn update(
    req: HttpRequest,
    path: web::Path<(String, i64)>,
    body: web::Json<Value>,
    backend: web::Data<Backend>,
) -> HttpResponse {
    let (kind, id) = path.into_inner();
    let kind = match gate(&req, &backend, &kind).await {
        Ok(kind) => kind,
        Err(response) => return response,
    };
    if let Err(message) = validate(kind, &body) {
        return envelope_error(StatusCode::BAD_REQUEST, message);
    }
    modify(&backend, kind, id, |record| merge(record, body.into_inner()))
}

#[delete("/cms/{kind}/{id}")]
async fn delete_record(
    req: HttpRequest,
    path: web::Path<(String, i64)>,
    backend: web::Data<Backend>,
) -> HttpResponse {
    let (kind, id) = path.into_inner();
    let kind = match gate(&req, &backend, &kind).await {
        Ok(kind) => kind,
        Err(response) => return response,
    };
    let removed = backend
        .state()
        .collections
        .get_mut(kind)
        .and_then(|records| records.remove(&id));
    match removed {
        Some(_) => HttpResponse::Ok().json(json!({ "success": true })),
        None => envelope_error(StatusCode::NOT_FOUND, "Record not found"),
    }
}

#[patch("/cms/{kind}/{id}/{toggle:activate|deactivate}")]
async fn set_active(
    req: HttpRequest,
    path: web::Path<(String, i64, String)>,
    backend: web::Data<Backend>,
) -> HttpResponse {
    let (kind, id, toggle) = path.into_inner();
    let kind = match gate(&req, &backend, &kind).await {
        Ok(kind) => kind,
        Err(response) => return response,
    };
    let active = toggle == "activate";
    let response = modify(&backend, kind, id, |record| {
        record.insert("isActive".into(), Value::Bool(active));
    });
    if response.status().is_success() {
        HttpResponse::Ok().json(json!({ "success": true }))
    } else {
        response
    }
}

#[derive(Deserialize)]
struct FundsBody {
    amount: f64,
}

#[patch("/cms/projects/{id}/funds")]
async fn update_funds(
    req: HttpRequest,
    id: web::Path<i64>,
    body: web::Json<FundsBody>,
    backend: web::Data<Backend>,
) -> HttpResponse {
    if let Err(response) = gate(&req, &backend, "projects").await {
        return response;
    }
    let amount = body.amount;
    modify(&backend, "projects", id.into_inner(), |record| {
        record.insert("fundsRaised".into(), json!(amount));
    })
}

#[derive(Deserialize)]
struct StatusBody {
    status: String,
}

#[patch("/cms/{kind}/{id}/status")]
async fn update_status(
    req: HttpRequest,
    path: web::Path<(String, i64)>,
    body: web::Json<StatusBody>,
    backend: web::Data<Backend>,
) -> HttpResponse {
    let (kind, id) = path.into_inner();
    let kind = match gate(&req, &backend, &kind).await {
        Ok(kind) => kind,
        Err(response) => return response,
    };
    let field = match kind {
        "projects" => "status",
        "children" => "adoptionStatus",
        _ => return envelope_error(StatusCode::NOT_FOUND, "Unknown resource"),
    };
    let status = body.into_inner().status;
    modify(&backend, kind, id, |record| {
        record.insert(field.into(), Value::String(status));
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SponsorBody {
    sponsor_id: i64,
}

#[post("/cms/children/{id}/sponsor")]
async fn assign_sponsor(
    req: HttpRequest,
    id: web::Path<i64>,
    body: web::Json<SponsorBody>,
    backend: web::Data<Backend>,
) -> HttpResponse {
    if let Err(response) = gate(&req, &backend, "children").await {
        return response;
    }
    let sponsor_id = body.sponsor_id;
    modify(&backend, "children", id.into_inner(), |record| {
        record.insert("sponsorId".into(), json!(sponsor_id));
        record.insert("sponsorAssignedAt".into(), json!(FIXED_NOW));
        record.insert(
            "adoptionStatus".into(),
            json!(AdoptionStatus::Sponsored.to_string()),
        );
    })
}

#[delete("/cms/children/{id}/sponsor")]
async fn remove_sponsor(
    req: HttpRequest,
    id: web::Path<i64>,
    backend: web::Data<Backend>,
) -> HttpResponse {
    if let Err(response) = gate(&req, &backend, "children").await {
        return response;
    }
    modify(&backend, "children", id.into_inner(), |record| {
        record.insert("sponsorId".into(), Value::Null);
        record.insert("sponsorAssignedAt".into(), Value::Null);
        record.insert(
            "adoptionStatus".into(),
            json!(AdoptionStatus::Available.to_string()),
        );
    })
}

/// Apply `change` to a stored record, recompute derived fields and answer
/// with the result.
fn modify(
    backend: &Backend,
    kind: &'static str,
    id: i64,
    change: impl FnOnce(&mut Map<String, Value>),
) -> HttpResponse {
    let mut state = backend.state();
    let Some(stored) = state
        .collections
        .get_mut(kind)
        .and_then(|records| records.get_mut(&id))
    else {
        return envelope_error(StatusCode::NOT_FOUND, "Record not found");
    };
    let mut fields = match stored.take() {
        Value::Object(fields) => fields,
        _ => Map::new(),
    };
    change(&mut fields);
    let created_at = fields.get("createdAt").cloned();
    *stored = materialize(kind, id, created_at, Value::Object(fields));
    ok(stored.clone())
}

fn merge(record: &mut Map<String, Value>, body: Value) {
    if let Value::Object(fields) = body {
        record.extend(fields);
    }
}

fn validate(kind: &str, body: &Value) -> Result<(), &'static str> {
    let present = |field: &str| {
        body.get(field)
            .and_then(Value::as_str)
            .is_some_and(|value| !value.trim().is_empty())
    };
    match kind {
        "events" if !present("title") => Err("Title is required"),
        "events" if !present("eventDate") => Err("Event date is required"),
        "projects" if !present("title") => Err("Title is required"),
        "children" if !present("firstName") || !present("lastName") => {
            Err("First and last name are required")
        }
        "children" if !present("birthDate") => Err("Birth date is required"),
        _ => Ok(()),
    }
}

fn matches_filters(record: &Value, query: &HashMap<String, String>) -> bool {
    query.iter().all(|(key, wanted)| match (key.as_str(), wanted.as_str()) {
        ("filter", "active") => record["isActive"] == Value::Bool(true),
        ("filter", "available") => {
            let available = AdoptionStatus::Available.to_string();
            record["adoptionStatus"] == json!(available)
        }
        ("filter", "upcoming") => record["isPastEvent"] == Value::Bool(false),
        ("filter", "past") => record["isPastEvent"] == Value::Bool(true),
        ("status", status) => {
            record["status"] == json!(status)
                || record["adoptionStatus"] == json!(status)
        }
        ("category", category) => record["category"] == json!(category),
        _ => true,
    })
}

/// Fill in the id, timestamps and the fields the real backend computes.
fn materialize(
    kind: &str,
    id: i64,
    created_at: Option<Value>,
    body: Value,
) -> Value {
    let mut record = match body {
        Value::Object(fields) => fields,
        _ => Map::new(),
    };
    record.insert("id".into(), json!(id));
    record.entry("isActive").or_insert(Value::Bool(true));
    record.insert(
        "createdAt".into(),
        created_at.unwrap_or_else(|| json!(FIXED_NOW)),
    );
    record.insert("updatedAt".into(), json!(FIXED_NOW));

    match kind {
        "events" => {
            let current = record
                .get("currentParticipants")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            let spots = record
                .get("maxParticipants")
                .and_then(Value::as_u64)
                .is_none_or(|max| current < max);
            let is_past = record
                .get("eventDate")
                .and_then(Value::as_str)
                .and_then(|date| date.parse::<DateTime>().ok())
                .is_some_and(|date| date < Zoned::now().datetime());
            record.insert("currentParticipants".into(), json!(current));
            record.insert("hasAvailableSpots".into(), json!(spots));
            record.insert("isPastEvent".into(), json!(is_past));
        }
        "projects" => {
            let status = record
                .get("status")
                .cloned()
                .and_then(|status| serde_json::from_value(status).ok())
                .unwrap_or(ProjectStatus::Planning);
            let budget = record.get("budget").and_then(Value::as_f64);
            let raised = record
                .get("fundsRaised")
                .and_then(Value::as_f64)
                .unwrap_or(0.0);
            let percentage = match budget {
                Some(budget) if budget > 0.0 => raised / budget * 100.0,
                _ => 0.0,
            };
            record.insert("status".into(), json!(status.to_string()));
            record.insert(
                "statusDisplayName".into(),
                json!(status.display_name()),
            );
            record.insert("fundsRaised".into(), json!(raised));
            record.insert("fundingPercentage".into(), json!(percentage));
            record.insert(
                "isFunded".into(),
                json!(budget.is_some_and(|budget| {
                    budget > 0.0 && raised >= budget
                })),
            );
        }
        "children" => {
            let name = |field: &str| {
                record.get(field).and_then(Value::as_str).unwrap_or("")
            };
            let full_name =
                format!("{} {}", name("firstName"), name("lastName"))
                    .trim()
                    .to_string();
            let age = record
                .get("birthDate")
                .and_then(Value::as_str)
                .and_then(|date| date.parse::<Date>().ok())
                .and_then(|birth| {
                    birth.until((Unit::Year, Zoned::now().date())).ok()
                })
                .map_or(0, |span| span.get_years().max(0));
            let status = record
                .get("adoptionStatus")
                .cloned()
                .and_then(|status| serde_json::from_value(status).ok())
                .unwrap_or(AdoptionStatus::Available);
            let has_sponsor =
                record.get("sponsorId").is_some_and(|id| !id.is_null());
            record.insert("fullName".into(), json!(full_name));
            record.insert("age".into(), json!(age));
            record.insert("adoptionStatus".into(), json!(status.to_string()));
            record.insert(
                "adoptionStatusDisplayName".into(),
                json!(status.display_name()),
            );
            record.insert("hasSponsor".into(), json!(has_sponsor));
        }
        _ => {}
    }
    Value::Object(record)
}
