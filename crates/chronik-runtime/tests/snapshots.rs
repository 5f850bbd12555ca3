mod common;

use anyhow::Result;
use chronik_core::{Aggregate, StoreError};
use chronik_runtime::{Repository, Settings};
use common::{app_with, World};

fn snapshotting() -> Settings {
    Settings {
        snapshotting_enabled: true,
        ..Settings::default()
    }
}

#[tokio::test]
async fn replay_resumes_from_the_snapshot() -> Result<()> {
    let app = app_with(snapshotting()).await;

    let mut world = World::create();
    let id = world.id();
    for i in 0..5 {
        world.make_it_so(&format!("thing-{i}"));
    }
    app.save(&mut world).await?;

    let captured = app.take_snapshot::<World>(id, None).await?;
    assert_eq!(captured, 6);

    let mut world: World = app.repository().get(id).await?;
    world.make_it_so("after-snapshot");
    app.save(&mut world).await?;

    let loaded: World = app.repository().get(id).await?;
    assert_eq!(loaded.version(), 7);
    assert_eq!(loaded.history.len(), 6);
    assert_eq!(
        loaded.history.last().map(String::as_str),
        Some("after-snapshot")
    );
    Ok(())
}

#[tokio::test]
async fn snapshots_do_not_change_what_replay_returns() -> Result<()> {
    let app = app_with(snapshotting()).await;

    let mut world = World::create();
    let id = world.id();
    world.make_it_so("dinosaurs");
    world.make_it_so("trucks");
    world.make_it_so("internet");
    app.save(&mut world).await?;
    app.take_snapshot::<World>(id, Some(3)).await?;

    // Same stores, snapshot fast-path disabled.
    let plain: Repository<World> = Repository::new(app.event_store().clone(), None);

    for version in [None, Some(2), Some(3), Some(4), Some(99)] {
        let with_snapshots = app.repository::<World>().get_at(id, version).await?;
        let without = plain.get_at(id, version).await?;
        assert_eq!(with_snapshots.history, without.history, "at {version:?}");
        assert_eq!(with_snapshots.version(), without.version(), "at {version:?}");
    }
    Ok(())
}

#[tokio::test]
async fn bounded_snapshot_captures_the_bounded_state() -> Result<()> {
    let app = app_with(snapshotting()).await;

    let mut world = World::create();
    let id = world.id();
    world.make_it_so("dinosaurs");
    world.make_it_so("trucks");
    app.save(&mut world).await?;

    let captured = app.take_snapshot::<World>(id, Some(2)).await?;
    assert_eq!(captured, 2);

    let at_two: World = app.repository().get_at(id, Some(2)).await?;
    assert_eq!(at_two.history, vec!["dinosaurs"]);
    assert_eq!(at_two.version(), 2);
    Ok(())
}

#[tokio::test]
async fn repeating_a_snapshot_is_benign() -> Result<()> {
    let app = app_with(snapshotting()).await;

    let mut world = World::create();
    let id = world.id();
    world.make_it_so("dinosaurs");
    app.save(&mut world).await?;

    assert_eq!(app.take_snapshot::<World>(id, None).await?, 2);
    assert_eq!(app.take_snapshot::<World>(id, None).await?, 2);
    Ok(())
}

#[tokio::test]
async fn taking_snapshots_requires_the_store() {
    let app = app_with(Settings::default()).await;

    let err = app
        .take_snapshot::<World>(uuid::Uuid::new_v4(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Persistence(_)));
}
