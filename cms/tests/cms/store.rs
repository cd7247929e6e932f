use cms::{Operation, ResourceStore};
use payloads::RecordId;
use test_helpers::scripted::{Record, ScriptedService, draft, record};

fn store_with(records: Vec<Record>) -> ResourceStore<ScriptedService> {
    ResourceStore::new(ScriptedService::new(records))
}

#[tokio::test]
async fn fetch_all_replaces_the_list_each_time() -> anyhow::Result<()> {
    let store = store_with(vec![
        record(1, "Gala"),
        record(2, "Run"),
        Record {
            is_active: false,
            ..record(3, "Fair")
        },
    ]);

    let all = store.fetch_all(None).await?;
    assert_eq!(all.len(), 3);
    assert_eq!(store.items(), all);

    let active = store.fetch_all(Some(&"active".to_string())).await?;
    assert_eq!(active.len(), 2);
    assert_eq!(store.items(), active);
    assert!(store.find(RecordId(3)).is_none());
    assert_eq!(
        store.service().calls(),
        vec!["get_all()", "get_all(active)"]
    );

    Ok(())
}

#[tokio::test]
async fn fetch_by_id_leaves_list_alone() -> anyhow::Result<()> {
    let store = store_with(vec![record(1, "Gala"), record(2, "Run")]);
    store.fetch_all(None).await?;
    let before = store.items();

    let item = store.fetch_by_id(RecordId(2)).await?;
    assert_eq!(item.title, "Run");
    assert_eq!(store.current_item(), Some(item));
    assert_eq!(store.items(), before);

    // a list refresh keeps the current item
    store.fetch_all(None).await?;
    assert_eq!(store.current_item().map(|r| r.id), Some(RecordId(2)));

    Ok(())
}

#[tokio::test]
async fn create_prepends_created_item() -> anyhow::Result<()> {
    let store =
        ResourceStore::new(ScriptedService::new(vec![]).with_next_id(7));

    let created = store.create(&draft("Gala")).await?;
    assert_eq!(created, record(7, "Gala"));
    assert_eq!(store.items(), vec![record(7, "Gala")]);

    let second = store.create(&draft("Run")).await?;
    assert_eq!(store.items()[0].id, second.id);
    assert_eq!(store.len(), 2);

    Ok(())
}

#[tokio::test]
async fn update_replaces_in_place() -> anyhow::Result<()> {
    let store = store_with(vec![
        record(1, "Gala"),
        record(2, "Run"),
        record(3, "Fair"),
    ]);
    store.fetch_all(None).await?;

    let updated = store.update(RecordId(2), &draft("Night run")).await?;
    let titles: Vec<_> = store.items().into_iter().map(|r| r.title).collect();
    assert_eq!(titles, vec!["Gala", "Night run", "Fair"]);
    assert_eq!(store.current_item(), Some(updated));

    Ok(())
}

#[tokio::test]
async fn update_of_unlisted_id_only_sets_current() -> anyhow::Result<()> {
    let store = store_with(vec![record(1, "Gala")]);
    store.fetch_all(None).await?;
    let before = store.items();

    let updated = store.update(RecordId(42), &draft("Elsewhere")).await?;
    assert_eq!(store.items(), before);
    assert_eq!(store.current_item(), Some(updated));
    assert_eq!(store.error(), None);

    Ok(())
}

#[tokio::test]
async fn remove_drops_only_the_matching_item() -> anyhow::Result<()> {
    let store = store_with(vec![record(1, "Gala"), record(2, "Run")]);
    store.fetch_all(None).await?;

    store.remove(RecordId(1)).await?;
    assert_eq!(store.items(), vec![record(2, "Run")]);

    // absent ids are not an error
    store.remove(RecordId(99)).await?;
    assert_eq!(store.len(), 1);

    Ok(())
}

#[tokio::test]
async fn failure_sets_error_and_keeps_list() -> anyhow::Result<()> {
    let store = store_with(vec![record(1, "Gala")]);
    store.fetch_all(None).await?;

    store.service().fail_next(Some("network down"));
    let err = store.fetch_all(None).await.unwrap_err();
    assert_eq!(err.to_string(), "network down");
    assert_eq!(store.error().as_deref(), Some("network down"));
    assert!(!store.is_loading());
    assert_eq!(store.items(), vec![record(1, "Gala")]);

    // the next success clears it
    store.fetch_by_id(RecordId(1)).await?;
    assert_eq!(store.error(), None);

    Ok(())
}

#[tokio::test]
async fn failure_without_message_uses_operation_fallback() {
    let store = store_with(vec![record(1, "Gala")]);
    let service = store.service();

    let cases = [
        Operation::FetchAll,
        Operation::FetchById,
        Operation::Create,
        Operation::Update,
        Operation::Remove,
    ];
    for operation in cases {
        service.fail_next(None);
        let failed = match operation {
            Operation::FetchAll => store.fetch_all(None).await.is_err(),
            Operation::FetchById => {
                store.fetch_by_id(RecordId(1)).await.is_err()
            }
            Operation::Create => store.create(&draft("x")).await.is_err(),
            Operation::Update => {
                store.update(RecordId(1), &draft("x")).await.is_err()
            }
            Operation::Remove => store.remove(RecordId(1)).await.is_err(),
            _ => unreachable!(),
        };
        assert!(failed);
        assert_eq!(
            store.error().as_deref(),
            Some(operation.fallback_message())
        );
        assert!(!store.is_loading());
    }
}

#[tokio::test]
async fn empty_message_counts_as_missing() {
    let store = store_with(vec![]);
    store.service().fail_next(Some(""));
    assert!(store.create(&draft("x")).await.is_err());
    assert_eq!(store.error().as_deref(), Some("Failed to create record"));
}

#[tokio::test]
async fn clear_error_and_set_current_item() -> anyhow::Result<()> {
    let store = store_with(vec![record(1, "Gala")]);
    store.service().fail_next(Some("boom"));
    assert!(store.fetch_all(None).await.is_err());
    assert!(store.error().is_some());

    store.clear_error();
    assert_eq!(store.error(), None);

    store.set_current_item(Some(record(5, "Picked")));
    assert_eq!(store.snapshot().current_item, Some(record(5, "Picked")));
    store.set_current_item(None);
    assert_eq!(store.current_item(), None);

    Ok(())
}

#[tokio::test]
async fn activation_is_a_no_op_without_the_capability() -> anyhow::Result<()> {
    let store = store_with(vec![record(1, "Gala")]);
    store.fetch_all(None).await?;
    store.fetch_by_id(RecordId(1)).await?;
    store.service().fail_next(Some("stale"));
    let _ = store.fetch_all(None).await;
    let before = store.snapshot();

    store.activate(RecordId(1)).await?;
    store.deactivate(RecordId(1)).await?;

    assert_eq!(store.snapshot(), before);
    assert_eq!(
        store.service().calls(),
        vec!["get_all()", "get_by_id(1)", "get_all()"]
    );

    Ok(())
}

#[tokio::test]
async fn activation_refetches_the_whole_list() -> anyhow::Result<()> {
    let service = ScriptedService::new(vec![
        record(1, "Gala"),
        Record {
            is_active: false,
            ..record(2, "Run")
        },
    ])
    .with_activation();
    let store = ResourceStore::new(service);
    store.fetch_all(Some(&"active".to_string())).await?;
    assert_eq!(store.len(), 1);

    store.activate(RecordId(2)).await?;
    // the reload is unfiltered
    assert_eq!(store.len(), 2);
    assert!(store.items().iter().all(|r| r.is_active));

    store.deactivate(RecordId(1)).await?;
    assert_eq!(store.find(RecordId(1)).map(|r| r.is_active), Some(false));
    assert_eq!(
        store.service().calls(),
        vec![
            "get_all(active)",
            "activate(2)",
            "get_all()",
            "deactivate(1)",
            "get_all()",
        ]
    );

    Ok(())
}

#[tokio::test]
async fn activation_failure_reports_and_skips_reload() {
    let store = ResourceStore::new(
        ScriptedService::new(vec![record(1, "Gala")]).with_activation(),
    );

    store.service().fail_next(None);
    assert!(store.deactivate(RecordId(1)).await.is_err());
    assert_eq!(store.error().as_deref(), Some("Failed to deactivate record"));
    assert!(!store.is_loading());
    assert_eq!(store.service().calls(), vec!["deactivate(1)"]);

    store.service().fail_next(Some("Record is locked"));
    assert!(store.activate(RecordId(1)).await.is_err());
    assert_eq!(store.error().as_deref(), Some("Record is locked"));
}

#[tokio::test]
async fn loading_is_set_while_in_flight() {
    let store = store_with(vec![record(1, "Gala")]);
    let release = store.service().hold_next();

    let observe = async {
        assert!(store.is_loading());
        release.send(()).unwrap();
    };
    let (result, ()) = tokio::join!(store.fetch_all(None), observe);

    assert!(result.is_ok());
    assert!(!store.is_loading());
}

#[tokio::test]
async fn overlapping_operations_share_one_flag_and_error_slot() {
    let store = store_with(vec![record(1, "Gala"), record(2, "Run")]);
    // the first call fails once released; the second succeeds immediately
    store.service().fail_next(Some("network down"));
    let release = store.service().hold_next();

    let slow = store.fetch_all(None);
    let fast = async {
        store.remove(RecordId(2)).await.unwrap();
        // the slow fetch is still in flight, yet the shared flag reads idle
        assert!(!store.is_loading());
        assert_eq!(store.error(), None);
        release.send(()).unwrap();
    };
    let (slow_result, ()) = tokio::join!(slow, fast);

    assert!(slow_result.is_err());
    assert_eq!(store.error().as_deref(), Some("network down"));
    assert!(!store.is_loading());
}
