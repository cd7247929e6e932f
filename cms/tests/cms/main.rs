mod auth;
mod children;
mod projects;
mod store;

use test_helpers::spawn_backend;

#[tokio::test]
async fn cms_routes_require_login() -> anyhow::Result<()> {
    let app = spawn_backend().await;
    let events = app.events();

    let err = cms::ResourceService::get_all(&events, None)
        .await
        .unwrap_err();
    assert!(matches!(err, cms::ServiceError::Unknown(Some(_))));

    app.login_admin().await?;
    assert!(cms::ResourceService::get_all(&events, None).await?.is_empty());

    Ok(())
}
