mod common;

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use common::{dark_mode_input, StubClient};
use pretty_assertions::assert_eq;
use tasks_generator::controller::PlanController;
use tasks_generator::export::DirectorySink;
use tasks_generator::models::{PlanId, PlanSummary};
use tasks_generator::recent::RecentPlansFeed;

fn summaries(count: u64) -> Vec<PlanSummary> {
    (1..=count)
        .rev()
        .map(|id| PlanSummary {
            id: PlanId::from(id),
            goal: format!("Plan {}", id),
            created_at: Utc.with_ymd_and_hms(2024, 5, id as u32, 9, 0, 0).unwrap(),
        })
        .collect()
}

#[tokio::test]
async fn test_load_requests_limit_and_truncates() {
    let stub = StubClient::new();
    stub.state().recent = summaries(7);
    let mut feed = RecentPlansFeed::default();

    feed.load(&stub).await;

    assert_eq!(stub.calls(), vec!["recent:5"]);
    assert!(feed.is_loaded());
    assert!(!feed.is_stale());
    assert_eq!(feed.plans().len(), 5);
    assert_eq!(feed.plans()[0].id, PlanId::from(7));
    assert_eq!(feed.error(), None);
}

#[tokio::test]
async fn test_empty_listing() {
    let stub = StubClient::new();
    let mut feed = RecentPlansFeed::new(3);

    feed.load(&stub).await;

    assert!(feed.is_loaded());
    assert!(feed.plans().is_empty());
}

#[tokio::test]
async fn test_failed_load_keeps_previous_listing() {
    let stub = StubClient::new();
    stub.state().recent = summaries(2);
    let mut feed = RecentPlansFeed::default();
    feed.load(&stub).await;

    stub.fail("recent_plans", Some("database is locked"));
    feed.mark_stale();
    feed.load(&stub).await;

    assert_eq!(feed.error(), Some("Failed to load recent plans"));
    assert_eq!(feed.plans(), &summaries(2)[..]);
    assert!(feed.is_stale());

    stub.recover("recent_plans");
    assert!(feed.refresh_if_stale(&stub).await);
    assert_eq!(feed.error(), None);
}

#[tokio::test]
async fn test_generate_triggers_refresh() {
    let stub = Arc::new(StubClient::new());
    let controller = PlanController::new(
        stub.clone(),
        Arc::new(DirectorySink::new(std::env::temp_dir())),
    );
    let mut events = controller.subscribe();
    let mut feed = RecentPlansFeed::default();

    feed.load(stub.as_ref()).await;
    assert!(!feed.refresh_if_stale(stub.as_ref()).await);

    controller.generate(&dark_mode_input()).await.unwrap();
    while let Ok(event) = events.try_recv() {
        feed.handle_event(&event);
    }

    assert!(feed.is_stale());
    assert!(feed.refresh_if_stale(stub.as_ref()).await);
    assert_eq!(
        stub.calls(),
        vec!["recent:5", "generate:Add dark mode", "recent:5"]
    );
}
