use cms::{ProjectStore, ResourceService, ServiceError};
use payloads::{
    ProjectStatus, RecordId,
    requests::{ProjectFilter, ProjectFilters},
};
use rust_decimal::Decimal;
use test_helpers::{project_details_a, spawn_backend};

#[tokio::test]
async fn create_project_computes_funding() -> anyhow::Result<()> {
    let app = spawn_backend().await;
    app.login_admin().await?;
    let store = ProjectStore::new(app.projects());

    let roof = store.create(&project_details_a()).await?;
    assert_eq!(roof.status, ProjectStatus::InProgress);
    assert_eq!(roof.status_display_name, "In progress");
    assert_eq!(roof.budget, Some(Decimal::new(10_000, 0)));
    assert_eq!(roof.funds_raised, Decimal::new(2_500, 0));
    assert_eq!(roof.funding_percentage, 25.0);
    assert!(!roof.is_funded);
    assert_eq!(store.items(), vec![roof]);

    Ok(())
}

#[tokio::test]
async fn project_without_budget_has_zero_percentage() -> anyhow::Result<()> {
    let app = spawn_backend().await;
    app.login_admin().await?;
    let projects = app.projects();

    let mut details = project_details_a();
    details.budget = None;
    details.status = None;
    let project = projects.create(&details).await?;
    assert_eq!(project.budget, None);
    assert_eq!(project.status, ProjectStatus::Planning);
    assert_eq!(project.funding_percentage, 0.0);
    assert!(!project.is_funded);

    Ok(())
}

#[tokio::test]
async fn update_funds_until_funded() -> anyhow::Result<()> {
    let app = spawn_backend().await;
    app.login_admin().await?;
    let projects = app.projects();
    let roof = projects.create(&project_details_a()).await?;

    let halfway = projects.update_funds(roof.id, Decimal::new(5_000, 0)).await?;
    assert_eq!(halfway.funding_percentage, 50.0);
    assert!(!halfway.is_funded);

    let funded = projects.update_funds(roof.id, Decimal::new(10_000, 0)).await?;
    assert!(funded.is_funded);
    assert_eq!(funded.title, roof.title);

    let err = projects
        .update_funds(RecordId(999), Decimal::ONE)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Unknown(_)));
    assert_eq!(err.to_string(), "Failed to update funds");

    Ok(())
}

#[tokio::test]
async fn update_status_and_filter_by_it() -> anyhow::Result<()> {
    let app = spawn_backend().await;
    app.login_admin().await?;
    let projects = app.projects();
    let roof = projects.create(&project_details_a()).await?;
    let mut well = project_details_a();
    well.title = "Water well".into();
    well.category = Some("health".into());
    let well = projects.create(&well).await?;

    let done = projects
        .update_status(roof.id, ProjectStatus::Completed)
        .await?;
    assert_eq!(done.status, ProjectStatus::Completed);
    assert_eq!(done.status_display_name, "Completed");

    let completed = projects
        .get_all(Some(&ProjectFilters {
            status: Some(ProjectStatus::Completed),
            ..Default::default()
        }))
        .await?;
    assert_eq!(
        completed.iter().map(|p| p.id).collect::<Vec<_>>(),
        vec![roof.id]
    );

    let health = projects
        .get_all(Some(&ProjectFilters {
            filter: Some(ProjectFilter::Active),
            category: Some("health".into()),
            ..Default::default()
        }))
        .await?;
    assert_eq!(health.iter().map(|p| p.id).collect::<Vec<_>>(), vec![well.id]);

    Ok(())
}

#[tokio::test]
async fn update_keeps_creation_time() -> anyhow::Result<()> {
    let app = spawn_backend().await;
    app.login_admin().await?;
    let store = ProjectStore::new(app.projects());
    let roof = store.create(&project_details_a()).await?;

    let mut details = project_details_a();
    details.description = "Roof and gutters".into();
    let updated = store.update(roof.id, &details).await?;
    assert_eq!(updated.created_at, roof.created_at);
    assert_eq!(updated.description, "Roof and gutters");
    assert_eq!(store.current_item(), Some(updated));

    Ok(())
}
