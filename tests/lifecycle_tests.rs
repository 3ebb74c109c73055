//! End-to-end lifecycle scenarios: generation through approval to
//! publication, against an in-memory store and mock capabilities.

mod common;

use std::sync::Arc;

use notegate::approval::ApprovalReconciler;
use notegate::config::NotegateConfig;
use notegate::generation::GenerationScheduler;
use notegate::item::{ItemState, PublishRecord};
use notegate::orchestrator::Orchestrator;
use notegate::publish::PublishDispatcher;
use notegate::store::{ItemFilter, QueueStore};

use common::{draft, MockGenerator, MockPublisher, MockSurface};

fn test_config() -> NotegateConfig {
    let mut config = NotegateConfig::default();
    config.generation.keywords = vec!["ai".to_string()];
    config
}

#[tokio::test]
async fn external_approval_drives_item_to_published() {
    let config = test_config();
    let store = Arc::new(QueueStore::in_memory().await);
    let generator = Arc::new(MockGenerator::returning(vec![draft("morning post")]));
    let surface = MockSurface::new();
    let publisher = MockPublisher::succeeding("n123", "https://x/n123");

    let scheduler =
        GenerationScheduler::new(store.clone(), generator, config.generation.clone());
    let reconciler = ApprovalReconciler::new(store.clone(), surface.clone());
    let dispatcher = PublishDispatcher::new(store.clone(), publisher, surface.clone(), 3);

    // Item created pending review.
    let run = scheduler.generate_now().await.unwrap();
    assert_eq!(run.created.len(), 1);
    let id = run.created[0].clone();
    assert_eq!(store.get(&id).await.unwrap().state, ItemState::PendingReview);

    // First cycle mirrors the record out.
    let report = reconciler.run_cycle().await;
    assert_eq!(report.pushed, vec![id.clone()]);
    let external_ref = store.get(&id).await.unwrap().external_ref.unwrap();

    // Reviewer approves on the surface; the pull maps it to an event.
    surface.set_status(&external_ref, "approved");
    let report = reconciler.run_cycle().await;
    assert_eq!(report.approved, vec![id.clone()]);
    let item = store.get(&id).await.unwrap();
    assert_eq!(item.state, ItemState::Approved);
    assert!(item.approved_at.is_some());

    // Dispatcher publishes and records the receipt.
    let report = dispatcher.run_sweep().await;
    assert_eq!(report.published, vec![id.clone()]);
    let item = store.get(&id).await.unwrap();
    assert_eq!(item.state, ItemState::Published);
    assert!(item.published_at.is_some());
    match item.publish_result {
        Some(PublishRecord::Succeeded {
            ref remote_id,
            ref share_url,
        }) => {
            assert_eq!(remote_id, "n123");
            assert_eq!(share_url, "https://x/n123");
        }
        other => panic!("expected success record, got {other:?}"),
    }

    // Outcome mirrored to the surface.
    let outcomes = surface.recorded_outcomes();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].0, external_ref);
}

#[tokio::test]
async fn manual_and_external_approval_reconcile_to_one_approval() {
    let config = test_config();
    let store = Arc::new(QueueStore::in_memory().await);
    let generator = Arc::new(MockGenerator::returning(vec![draft("contested post")]));
    let surface = MockSurface::new();

    let scheduler =
        GenerationScheduler::new(store.clone(), generator, config.generation.clone());
    let reconciler = ApprovalReconciler::new(store.clone(), surface.clone());

    let id = scheduler.generate_now().await.unwrap().created.remove(0);
    reconciler.run_cycle().await;
    let external_ref = store.get(&id).await.unwrap().external_ref.unwrap();

    // Manual approval lands first.
    let manually_approved = store
        .atomic_transition(&id, &notegate::item::ItemEvent::Approve)
        .await
        .unwrap();

    // External approval arrives later; whichever came first wins and the
    // duplicate is a no-op — but the item left PendingReview, so the pull
    // no longer considers it.
    surface.set_status(&external_ref, "approved");
    let report = reconciler.run_cycle().await;
    assert!(report.approved.is_empty());
    assert!(report.failures.is_empty());

    let item = store.get(&id).await.unwrap();
    assert_eq!(item.state, ItemState::Approved);
    assert_eq!(item.approved_at, manually_approved.approved_at);
}

#[tokio::test]
async fn orchestrator_facade_wires_the_full_path() {
    let config = test_config();
    let store = Arc::new(QueueStore::in_memory().await);
    let generator = Arc::new(MockGenerator::returning(vec![draft("facade post")]));
    let surface = MockSurface::new();
    let publisher = MockPublisher::succeeding("n9", "https://x/n9");

    let orchestrator = Orchestrator::new(&config, store, generator, surface.clone(), publisher);
    orchestrator.startup_recovery().await.unwrap();

    let run = orchestrator.generate_now().await.unwrap();
    let id = run.created[0].clone();

    orchestrator.reconcile_now().await;
    let external_ref = orchestrator
        .get_item(&id)
        .await
        .unwrap()
        .external_ref
        .unwrap();
    surface.set_status(&external_ref, "approved");
    orchestrator.reconcile_now().await;
    let report = orchestrator.dispatch_now().await;
    assert_eq!(report.published, vec![id.clone()]);

    let summary = orchestrator.status().await;
    assert_eq!(summary.published, 1);
    assert_eq!(summary.total(), 1);

    let published = orchestrator
        .list_items(&ItemFilter::all().with_state(ItemState::Published))
        .await;
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].id, id);
}

#[tokio::test]
async fn rejected_items_stay_visible_for_audit() {
    let config = test_config();
    let store = Arc::new(QueueStore::in_memory().await);
    let generator = Arc::new(MockGenerator::returning(vec![draft("rejected post")]));
    let surface = MockSurface::new();
    let publisher = MockPublisher::succeeding("n1", "https://x/n1");

    let orchestrator = Orchestrator::new(&config, store, generator, surface, publisher);
    let id = orchestrator.generate_now().await.unwrap().created.remove(0);
    orchestrator.reject(&id).await.unwrap();

    // Not eligible for dispatch, still queryable.
    let report = orchestrator.dispatch_now().await;
    assert_eq!(report.attempted(), 0);
    let rejected = orchestrator
        .list_items(&ItemFilter::all().with_state(ItemState::Rejected))
        .await;
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].id, id);
}
