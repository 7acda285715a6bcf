mod common;

use std::collections::HashMap;

use aggro::stats::model::Archetype;
use aggro::stats::types::{DamageType, StatType};
use aggro::status::effect::{StatusCategory, StatusKind};
use aggro::status::model::Status;
use aggro::store::ActorStore;
use chrono::{Duration, Utc};

use common::Harness;

fn in_secs(secs: i64) -> chrono::DateTime<Utc> {
    Utc::now() + Duration::seconds(secs)
}

#[tokio::test]
async fn non_stacking_reapply_keeps_a_single_entry() {
    let h = Harness::new();
    h.stats.initialize("actor1", Archetype::Player).await.unwrap();

    h.status
        .add_statuses("actor1", vec![Status::burning(in_secs(5), "actor2", 40.0)])
        .await
        .unwrap();
    h.status
        .add_statuses("actor1", vec![Status::burning(in_secs(60), "actor2", 40.0)])
        .await
        .unwrap();

    let status = h.status.actor_status("actor1").await.unwrap();
    assert_eq!(status.statuses.len(), 1);
    // The refresh carries the later expiration
    assert!(status.statuses[0].expiration.unwrap() > in_secs(30));
}

#[tokio::test]
async fn stacking_instances_expire_on_their_own_schedules() {
    let h = Harness::new();
    h.stats.initialize("actor1", Archetype::Player).await.unwrap();

    h.status
        .add_statuses(
            "actor1",
            vec![
                Status::bleeding(in_secs(1), "actor2", 10.0),
                Status::bleeding(in_secs(600), "actor3", 10.0),
            ],
        )
        .await
        .unwrap();
    let status = h.status.actor_status("actor1").await.unwrap();
    assert_eq!(status.statuses.len(), 2);

    // Tick past the first expiration only
    h.status.tick(Utc::now() + Duration::seconds(30)).await;
    let status = h.status.actor_status("actor1").await.unwrap();
    assert_eq!(status.statuses.len(), 1);
    assert_eq!(status.statuses[0].origin, "actor3");
}

#[tokio::test]
async fn damage_over_time_kills_and_attaches_dead() {
    let h = Harness::new();
    h.stats.initialize("actor1", Archetype::Player).await.unwrap();

    // Stacking DoT of magnitude 40 per tick against 100 starting HP
    h.status
        .add_statuses("actor1", vec![Status::bleeding(in_secs(3600), "actor2", 40.0)])
        .await
        .unwrap();

    for _ in 0..3 {
        h.status.tick(Utc::now()).await;
        }

    let stats = h.stats.stats_for("actor1").await.unwrap();
    assert!(stats.derived(StatType::CurrentHp).abs() < f64::EPSILON);
    assert!(h.status.is_dead("actor1").await.unwrap());

    // Dead actors no longer regenerate
    let before = h.stats.stats_for("actor1").await.unwrap();
    h.status.tick(Utc::now()).await;
    let after = h.stats.stats_for("actor1").await.unwrap();
    assert!(
        (after.derived(StatType::CurrentHp) - before.derived(StatType::CurrentHp)).abs()
            < f64::EPSILON
    );
}

#[tokio::test]
async fn expirations_run_before_damage_application() {
    let h = Harness::new();
    h.stats.initialize("actor1", Archetype::Player).await.unwrap();

    // Already lapsed when the tick runs: must deal no damage at all
    h.status
        .add_statuses("actor1", vec![Status::bleeding(in_secs(-1), "actor2", 40.0)])
        .await
        .unwrap();

    h.status.tick(Utc::now()).await;

    // No damage may land; regen can only have topped the pool up
    let stats = h.stats.stats_for("actor1").await.unwrap();
    assert!(stats.derived(StatType::CurrentHp) >= 100.0);
    assert!(h.status.actor_status("actor1").await.unwrap().statuses.is_empty());
}

#[tokio::test]
async fn fortified_buff_mitigates_damage_and_lapses() {
    let h = Harness::new();
    h.stats.initialize("actor1", Archetype::Player).await.unwrap();

    h.status
        .add_statuses(
            "actor1",
            vec![Status::fortified(
                in_secs(2),
                "actor1",
                HashMap::from([(StatType::PhyReduction, 0.5)]),
            )],
        )
        .await
        .unwrap();

    let diff = h
        .status
        .deal_damage(
            "actor1",
            &HashMap::from([(DamageType::Physical, 40.0)]),
            "mob-1",
        )
        .await
        .unwrap();
    assert!((diff[&StatType::CurrentHp] - 80.0).abs() < f64::EPSILON);

    // After the buff lapses the reduction collapses back to zero
    h.status.tick(Utc::now() + Duration::seconds(30)).await;
    let stats = h.stats.stats_for("actor1").await.unwrap();
    assert!(stats.derived(StatType::PhyReduction).abs() < f64::EPSILON);
}

#[tokio::test]
async fn lethal_direct_damage_attaches_dead() {
    let h = Harness::new();
    h.stats.initialize("actor1", Archetype::Player).await.unwrap();

    h.status
        .deal_damage(
            "actor1",
            &HashMap::from([(DamageType::Physical, 150.0)]),
            "mob-1",
        )
        .await
        .unwrap();

    assert!(h.status.is_dead("actor1").await.unwrap());
}

#[tokio::test]
async fn cure_removes_only_named_categories() {
    let h = Harness::new();
    h.stats.initialize("actor1", Archetype::Player).await.unwrap();

    h.status
        .add_statuses(
            "actor1",
            vec![
                Status::bleeding(in_secs(600), "actor2", 10.0),
                Status::burning(in_secs(600), "actor2", 10.0),
            ],
        )
        .await
        .unwrap();

    h.status
        .cure("actor1", &[StatusCategory::Burning])
        .await
        .unwrap();

    let status = h.status.actor_status("actor1").await.unwrap();
    assert_eq!(status.statuses.len(), 1);
    assert_eq!(status.statuses[0].category(), StatusCategory::Bleeding);
}

#[tokio::test]
async fn malformed_effect_is_isolated_to_its_actor() {
    let h = Harness::new();
    h.stats.initialize("broken", Archetype::Player).await.unwrap();
    h.stats.initialize("healthy", Archetype::Player).await.unwrap();

    // Corrupt catalog payload: burning that names no MAGICAL magnitude
    let broken = Status::new(
        StatusKind::Burning {
            derived_effects: HashMap::new(),
        },
        "actor2",
        Some(in_secs(600)),
    );
    h.status.add_statuses("broken", vec![broken]).await.unwrap();
    h.status
        .add_statuses("healthy", vec![Status::bleeding(in_secs(600), "actor2", 40.0)])
        .await
        .unwrap();

    h.status.tick(Utc::now()).await;

    // The broken actor's tick failed fast: no damage was applied
    let broken_stats = h.stats.stats_for("broken").await.unwrap();
    assert!((broken_stats.derived(StatType::CurrentHp) - 100.0).abs() < f64::EPSILON);

    // The healthy actor still processed normally in the same batch
    let healthy_stats = h.stats.stats_for("healthy").await.unwrap();
    assert!(healthy_stats.derived(StatType::CurrentHp) < 100.0);
}

#[tokio::test]
async fn status_applied_before_stats_is_tolerated() {
    let h = Harness::new();
    h.status
        .add_statuses("ghost", vec![Status::bleeding(in_secs(600), "actor2", 40.0)])
        .await
        .unwrap();

    // Tick must not error even though the actor has no stats document
    h.status.tick(Utc::now()).await;

    let status = h
        .store
        .find_actor_status("ghost")
        .await
        .unwrap();
    assert_eq!(status.statuses.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn tick_loop_expires_statuses_in_the_background() {
    let h = Harness::new();
    h.stats.initialize("actor1", Archetype::Player).await.unwrap();
    h.status
        .add_statuses(
            "actor1",
            vec![Status::fortified(
                Utc::now() + Duration::milliseconds(50),
                "actor1",
                HashMap::from([(StatType::Def, 10.0)]),
            )],
        )
        .await
        .unwrap();

    let handle = h.status.spawn_tick_loop(std::time::Duration::from_millis(25));
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    h.status.shutdown();
    handle.await.unwrap();

    let status = h.status.actor_status("actor1").await.unwrap();
    assert!(status.statuses.is_empty());
    assert_eq!(h.status.active_actor_count(), 0);
}
