use std::sync::Arc;

use cms::{
    AuthError, AuthStore, ResourceService, Session, SessionStore,
    session::MemorySessionStore,
};
use payloads::{APIClient, requests::RegisterRequest};
use test_helpers::{ADMIN_EMAIL, ADMIN_PASSWORD, spawn_backend};

fn registration(email: &str) -> RegisterRequest {
    RegisterRequest {
        first_name: "Ana".into(),
        last_name: "Torres".into(),
        email: email.into(),
        password: "hunter22".into(),
        phone: None,
    }
}

#[tokio::test]
async fn login_establishes_session() -> anyhow::Result<()> {
    let app = spawn_backend().await;
    let auth = app.auth();
    assert!(!auth.is_authenticated());

    let user = auth.login(ADMIN_EMAIL, ADMIN_PASSWORD).await?;
    assert_eq!(user.email, ADMIN_EMAIL);
    assert!(auth.is_authenticated());
    assert_eq!(auth.user(), Some(user));
    assert_eq!(auth.error(), None);
    assert!(!auth.is_loading());

    // the shared token authorizes the resource services
    app.events().get_all(None).await?;

    Ok(())
}

#[tokio::test]
async fn empty_fields_are_refused_locally() {
    let app = spawn_backend().await;
    let auth = app.auth();

    let err = auth.login("", ADMIN_PASSWORD).await.unwrap_err();
    assert!(matches!(err, AuthError::MissingFields));
    assert_eq!(auth.error().as_deref(), Some("Please fill in all fields"));

    let err = auth.login(ADMIN_EMAIL, "").await.unwrap_err();
    assert!(matches!(err, AuthError::MissingFields));
    assert!(!auth.is_authenticated());
}

#[tokio::test]
async fn blank_email_is_left_to_the_server() {
    let app = spawn_backend().await;
    let auth = app.auth();

    let err = auth.login("   ", ADMIN_PASSWORD).await.unwrap_err();
    assert!(matches!(err, AuthError::Rejected(_)));
    assert_eq!(auth.error().as_deref(), Some("Invalid credentials"));
}

#[tokio::test]
async fn wrong_password_reports_server_message() {
    let app = spawn_backend().await;
    let auth = app.auth();

    let err = auth.login(ADMIN_EMAIL, "wrong").await.unwrap_err();
    assert!(matches!(err, AuthError::Rejected(_)));
    assert_eq!(auth.error().as_deref(), Some("Invalid credentials"));
    assert!(!auth.is_authenticated());
    assert_eq!(auth.user(), None);
}

#[tokio::test]
async fn failed_login_ends_previous_session() -> anyhow::Result<()> {
    let app = spawn_backend().await;
    let auth = app.auth();
    auth.login(ADMIN_EMAIL, ADMIN_PASSWORD).await?;

    assert!(auth.login(ADMIN_EMAIL, "wrong").await.is_err());
    assert!(!auth.is_authenticated());
    assert!(app.events().get_all(None).await.is_err());

    Ok(())
}

#[tokio::test]
async fn logout_clears_token() -> anyhow::Result<()> {
    let app = spawn_backend().await;
    let auth = app.auth();
    auth.login(ADMIN_EMAIL, ADMIN_PASSWORD).await?;

    auth.logout()?;
    assert!(!auth.is_authenticated());
    assert_eq!(auth.user(), None);
    assert!(app.events().get_all(None).await.is_err());

    Ok(())
}

#[tokio::test]
async fn register_does_not_log_in() -> anyhow::Result<()> {
    let app = spawn_backend().await;
    let auth = app.auth();

    let user = auth.register(&registration("ana@example.org")).await?;
    assert_eq!(user.email, "ana@example.org");
    assert_eq!(user.first_name.as_deref(), Some("Ana"));
    assert!(!auth.is_authenticated());

    // the new account can log in
    auth.login("ana@example.org", "hunter22").await?;
    assert!(auth.is_authenticated());

    Ok(())
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let app = spawn_backend().await;
    let auth = app.auth();

    let err = auth.register(&registration(ADMIN_EMAIL)).await.unwrap_err();
    assert!(matches!(err, AuthError::Rejected(_)));
    assert_eq!(auth.error().as_deref(), Some("Email already registered"));
}

#[tokio::test]
async fn session_survives_restart() -> anyhow::Result<()> {
    let app = spawn_backend().await;
    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::default());

    let first =
        APIClient::new(app.client.address.clone(), reqwest::Client::new());
    let session = Arc::new(Session::init(store.clone(), first.token.clone())?);
    AuthStore::new(first, session)
        .login(ADMIN_EMAIL, ADMIN_PASSWORD)
        .await?;

    // a fresh client picks the login up from the store
    let second =
        APIClient::new(app.client.address.clone(), reqwest::Client::new());
    let restored = Session::init(store.clone(), second.token.clone())?;
    assert!(restored.is_authenticated());
    assert_eq!(restored.user().map(|u| u.email).as_deref(), Some(ADMIN_EMAIL));
    cms::EventService::new(second).get_all(None).await?;

    restored.end()?;
    assert!(store.load()?.is_none());

    Ok(())
}
