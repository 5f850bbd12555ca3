mod common;

use anyhow::Result;
use chronik_core::Aggregate;
use common::{app, World};

#[tokio::test]
async fn saved_history_replays_in_order() -> Result<()> {
    let app = app().await;

    let mut world = World::create();
    let id = world.id();
    world.make_it_so("dinosaurs");
    world.make_it_so("trucks");
    world.make_it_so("internet");
    app.save(&mut world).await?;

    let loaded: World = app.repository().get(id).await?;
    assert_eq!(loaded.history, vec!["dinosaurs", "trucks", "internet"]);
    assert_eq!(loaded.version(), 4);
    Ok(())
}

#[tokio::test]
async fn version_bounded_reads_stop_at_the_bound() -> Result<()> {
    let app = app().await;

    let mut world = World::create();
    let id = world.id();
    world.make_it_so("dinosaurs");
    world.make_it_so("trucks");
    world.make_it_so("internet");
    app.save(&mut world).await?;

    let repository = app.repository::<World>();

    let at_one = repository.get_at(id, Some(1)).await?;
    assert_eq!(at_one.version(), 1);
    assert!(at_one.history.is_empty());

    let at_three = repository.get_at(id, Some(3)).await?;
    assert_eq!(at_three.history, vec!["dinosaurs", "trucks"]);

    // A bound past the head clamps to the head instead of failing.
    let clamped = repository.get_at(id, Some(99)).await?;
    assert_eq!(clamped.version(), 4);
    assert_eq!(clamped.history.len(), 3);
    Ok(())
}

#[tokio::test]
async fn replay_is_deterministic() -> Result<()> {
    let app = app().await;

    let mut world = World::create();
    let id = world.id();
    world.make_it_so("dinosaurs");
    world.make_it_so("trucks");
    app.save(&mut world).await?;

    let repository = app.repository::<World>();
    let first = repository.get(id).await?;
    let second = repository.get(id).await?;
    assert_eq!(first.history, second.history);
    assert_eq!(first.version(), second.version());
    Ok(())
}

#[tokio::test]
async fn missing_aggregate_is_not_found() {
    let app = app().await;
    let err = app
        .repository::<World>()
        .get(uuid::Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, chronik_core::StoreError::AggregateNotFound(_)));
}

#[tokio::test]
async fn stale_writer_conflicts_and_commits_nothing() -> Result<()> {
    let app = app().await;

    let mut world = World::create();
    let id = world.id();
    world.make_it_so("dinosaurs");
    world.make_it_so("trucks");
    world.make_it_so("internet");
    app.save(&mut world).await?;

    let repository = app.repository::<World>();
    let mut first: World = repository.get(id).await?;
    let mut second: World = repository.get(id).await?;

    let recorder = app.event_store().recorder().clone();
    let before = recorder.max_notification_id().await?;

    first.make_it_so("future");
    app.save(&mut first).await?;

    second.make_it_so("past");
    let err = app.save(&mut second).await.unwrap_err();
    assert!(err.is_conflict());

    // Exactly one new notification: the winner's.
    assert_eq!(recorder.max_notification_id().await?, before + 1);

    let reloaded: World = repository.get(id).await?;
    assert_eq!(reloaded.version(), 5);
    assert_eq!(reloaded.history.last().map(String::as_str), Some("future"));
    Ok(())
}
