mod common;

use chrono::{Duration, Utc};
use std::sync::Arc;

use gymlog::error::AppError;
use gymlog::models::{NewWorkout, WorkoutSetLink};
use gymlog::repositories::{RecordRepository, WorkoutRepository};
use gymlog::session::{MemorySessionStore, SessionSet, WorkoutSession};

#[tokio::test]
async fn create_workout_validates_time_order() {
    let pool = common::setup_test_db();
    let repo = WorkoutRepository::new(pool.clone());

    let now = Utc::now();
    let err = repo
        .create_workout(
            "u1",
            NewWorkout {
                rating: Some(5),
                notes: None,
                start_time: now,
                end_time: now - Duration::minutes(10),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn workouts_list_newest_first_and_are_user_scoped() {
    let pool = common::setup_test_db();
    let repo = WorkoutRepository::new(pool.clone());

    let now = Utc::now();
    let mk = |days_ago: i64| NewWorkout {
        rating: Some(7),
        notes: None,
        start_time: now - Duration::days(days_ago),
        end_time: now - Duration::days(days_ago) + Duration::hours(1),
    };
    let old = repo.create_workout("u1", mk(30)).await.unwrap();
    let recent = repo.create_workout("u1", mk(29)).await.unwrap();
    repo.create_workout("u2", mk(28)).await.unwrap();

    let listed = repo.list_for_user("u1").await.unwrap();
    let u1_recent_pos = listed.iter().position(|w| w.id == recent.id).unwrap();
    let u1_old_pos = listed.iter().position(|w| w.id == old.id).unwrap();
    assert!(u1_recent_pos < u1_old_pos);
    assert!(listed.iter().all(|w| w.user_id == "u1"));

    let found = repo.find_by_id(&old.id, "u1").await.unwrap().unwrap();
    assert_eq!(found.rating, Some(7));
    assert!(repo.find_by_id(&old.id, "u2").await.unwrap().is_none());
}

#[tokio::test]
async fn link_sets_rejects_empty_batches_and_is_transactional() {
    let pool = common::setup_test_db();
    let workouts = WorkoutRepository::new(pool.clone());
    let records = RecordRepository::new(pool.clone());

    let err = workouts.link_sets(&[]).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let exercise = common::create_test_exercise(&pool, "u1", "Bench Press").await;
    let record = records.create_record(&exercise.id, None).await.unwrap();
    let sets = records
        .add_sets(&record.id, &[common::set(5, 135.0)])
        .await
        .unwrap();

    let now = Utc::now();
    let workout = workouts
        .create_workout(
            "u1",
            NewWorkout {
                rating: Some(8),
                notes: None,
                start_time: now - Duration::hours(1),
                end_time: now,
            },
        )
        .await
        .unwrap();

    // One valid link plus one violating the set FK: nothing must land
    let err = workouts
        .link_sets(&[
            WorkoutSetLink {
                workout_id: workout.id.clone(),
                set_record_id: sets[0].id.clone(),
            },
            WorkoutSetLink {
                workout_id: workout.id.clone(),
                set_record_id: "no-such-set".to_string(),
            },
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Database(_)));
    assert!(workouts.linked_set_ids(&workout.id).await.unwrap().is_empty());

    workouts
        .link_sets(&[WorkoutSetLink {
            workout_id: workout.id.clone(),
            set_record_id: sets[0].id.clone(),
        }])
        .await
        .unwrap();
    assert_eq!(
        workouts.linked_set_ids(&workout.id).await.unwrap(),
        vec![sets[0].id.clone()]
    );
}

// Full flow against real storage: start, submit the same exercise twice,
// end, and verify the created workout and its two links.
#[tokio::test]
async fn session_end_to_end_against_storage() {
    let pool = common::setup_test_db();
    let workouts = WorkoutRepository::new(pool.clone());
    let records = RecordRepository::new(pool.clone());

    let bench = common::create_test_exercise(&pool, "u1", "Bench Press").await;
    let record = records.create_record(&bench.id, None).await.unwrap();
    let first = records
        .add_sets(&record.id, &[common::set(5, 135.0)])
        .await
        .unwrap();
    let second = records
        .add_sets(&record.id, &[common::set(5, 140.0)])
        .await
        .unwrap();

    let session = WorkoutSession::new(
        "u1",
        Arc::new(workouts.clone()),
        Arc::new(MemorySessionStore::new()),
    );

    session.start().unwrap();
    let t0 = session.start_time().unwrap();
    session
        .add_exercise(
            &bench.id,
            vec![SessionSet {
                set_record_id: Some(first[0].id.clone()),
                reps: 5,
                weight: Some(135.0),
            }],
        )
        .unwrap();
    session
        .add_exercise(
            &bench.id,
            vec![SessionSet {
                set_record_id: Some(second[0].id.clone()),
                reps: 5,
                weight: Some(140.0),
            }],
        )
        .unwrap();

    let report = session.end(8, Some("felt good".to_string())).await.unwrap();
    assert_eq!(report.linked_sets, 2);
    assert_eq!(report.skipped_sets, 0);

    let workout = workouts
        .find_by_id(&report.workout_id, "u1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(workout.rating, Some(8));
    assert_eq!(workout.notes.as_deref(), Some("felt good"));
    // Stored timestamps round-trip at datetime precision
    assert!((workout.start_time - t0).num_seconds().abs() <= 1);
    assert!(workout.end_time >= workout.start_time);

    let mut linked = workouts.linked_set_ids(&report.workout_id).await.unwrap();
    linked.sort();
    let mut expected = vec![first[0].id.clone(), second[0].id.clone()];
    expected.sort();
    assert_eq!(linked, expected);

    assert!(!session.started());
    assert!(session.exercises().is_empty());
}
