use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use gymlog::error::{AppError, Result, SessionError};
use gymlog::models::{NewWorkout, WorkoutSetLink};
use gymlog::session::{
    MemorySessionStore, SessionSet, SessionStore, WorkoutSession, WorkoutWriter,
};

#[derive(Default)]
struct MockWriter {
    fail_create: AtomicBool,
    fail_link: AtomicBool,
    delay: Option<Duration>,
    created: Mutex<Vec<NewWorkout>>,
    link_batches: Mutex<Vec<Vec<WorkoutSetLink>>>,
}

impl MockWriter {
    fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    fn creates(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    fn link_batches(&self) -> Vec<Vec<WorkoutSetLink>> {
        self.link_batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkoutWriter for MockWriter {
    async fn create_workout(&self, _user_id: &str, workout: NewWorkout) -> Result<String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(AppError::Internal("create refused".to_string()));
        }
        self.created.lock().unwrap().push(workout);
        Ok("w-1".to_string())
    }

    async fn link_sets(&self, links: Vec<WorkoutSetLink>) -> Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_link.load(Ordering::SeqCst) {
            return Err(AppError::Internal("link refused".to_string()));
        }
        self.link_batches.lock().unwrap().push(links);
        Ok(())
    }
}

fn persisted_set(id: &str, reps: i32, weight: f64) -> SessionSet {
    SessionSet {
        set_record_id: Some(id.to_string()),
        reps,
        weight: Some(weight),
    }
}

fn unpersisted_set(reps: i32) -> SessionSet {
    SessionSet {
        set_record_id: None,
        reps,
        weight: None,
    }
}

fn session_with(writer: Arc<MockWriter>) -> WorkoutSession {
    WorkoutSession::new("u1", writer, Arc::new(MemorySessionStore::new()))
}

#[tokio::test]
async fn start_resets_any_prior_state() {
    let session = session_with(Arc::new(MockWriter::default()));

    session.start().unwrap();
    session
        .add_exercise("bench", vec![persisted_set("s1", 5, 135.0)])
        .unwrap();
    assert_eq!(session.exercises().len(), 1);

    // Starting again discards the leftover list
    session.start().unwrap();
    assert!(session.started());
    assert!(session.exercises().is_empty());
    assert!(session.start_time().is_some());
}

#[tokio::test]
async fn add_exercise_before_start_is_a_rejected_no_op() {
    let session = session_with(Arc::new(MockWriter::default()));

    let err = session
        .add_exercise("bench", vec![persisted_set("s1", 5, 135.0)])
        .unwrap_err();
    assert!(matches!(err, SessionError::NotStarted));
    assert!(!session.started());
    assert!(session.exercises().is_empty());
}

#[tokio::test]
async fn sets_for_same_exercise_append_in_order() {
    let session = session_with(Arc::new(MockWriter::default()));
    session.start().unwrap();

    session
        .add_exercise("bench", vec![persisted_set("s1", 5, 135.0)])
        .unwrap();
    session
        .add_exercise("bench", vec![persisted_set("s2", 5, 140.0)])
        .unwrap();

    let exercises = session.exercises();
    assert_eq!(exercises.len(), 1);
    assert_eq!(exercises[0].exercise_id, "bench");
    assert_eq!(
        exercises[0]
            .sets
            .iter()
            .map(|s| s.set_record_id.clone().unwrap())
            .collect::<Vec<_>>(),
        vec!["s1", "s2"]
    );
}

#[tokio::test]
async fn distinct_exercises_keep_insertion_order() {
    let session = session_with(Arc::new(MockWriter::default()));
    session.start().unwrap();

    session
        .add_exercise("bench", vec![persisted_set("s1", 5, 135.0)])
        .unwrap();
    session
        .add_exercise("squat", vec![persisted_set("s2", 5, 185.0)])
        .unwrap();

    let ids: Vec<String> = session
        .exercises()
        .into_iter()
        .map(|e| e.exercise_id)
        .collect();
    assert_eq!(ids, vec!["bench", "squat"]);
}

#[tokio::test]
async fn add_exercise_validates_sets() {
    let session = session_with(Arc::new(MockWriter::default()));
    session.start().unwrap();

    assert!(matches!(
        session.add_exercise("bench", vec![]),
        Err(SessionError::InvalidSets(_))
    ));
    assert!(matches!(
        session.add_exercise("bench", vec![persisted_set("s1", 0, 100.0)]),
        Err(SessionError::InvalidSets(_))
    ));
    assert!(matches!(
        session.add_exercise("bench", vec![persisted_set("s1", 5, -1.0)]),
        Err(SessionError::InvalidSets(_))
    ));
    assert!(session.exercises().is_empty());
}

#[tokio::test]
async fn end_without_start_makes_no_remote_calls() {
    let writer = Arc::new(MockWriter::default());
    let session = session_with(writer.clone());

    let err = session.end(8, None).await.unwrap_err();
    assert!(matches!(err, SessionError::NotActive));
    assert_eq!(writer.creates(), 0);
    assert!(writer.link_batches().is_empty());
}

#[tokio::test]
async fn create_failure_preserves_session_for_retry() {
    let writer = Arc::new(MockWriter::default());
    writer.fail_create.store(true, Ordering::SeqCst);
    let session = session_with(writer.clone());

    session.start().unwrap();
    let start_time = session.start_time();
    session
        .add_exercise("bench", vec![persisted_set("s1", 5, 135.0)])
        .unwrap();

    let err = session.end(8, None).await.unwrap_err();
    assert!(matches!(err, SessionError::CreateWorkout(_)));
    assert!(!err.is_timeout());

    // Everything still in place, so the caller can retry
    assert!(session.started());
    assert_eq!(session.start_time(), start_time);
    assert_eq!(session.exercises().len(), 1);
    assert!(writer.link_batches().is_empty());

    // Retry succeeds once the backend recovers
    writer.fail_create.store(false, Ordering::SeqCst);
    let report = session.end(8, None).await.unwrap();
    assert_eq!(report.workout_id, "w-1");
    assert!(!session.started());
}

#[tokio::test]
async fn link_failure_is_a_distinct_partial_outcome_and_resets() {
    let writer = Arc::new(MockWriter::default());
    writer.fail_link.store(true, Ordering::SeqCst);
    let session = session_with(writer.clone());

    session.start().unwrap();
    session
        .add_exercise("bench", vec![persisted_set("s1", 5, 135.0)])
        .unwrap();

    let err = session.end(8, None).await.unwrap_err();
    match &err {
        SessionError::PartialLink { workout_id, .. } => assert_eq!(workout_id, "w-1"),
        other => panic!("expected PartialLink, got {other:?}"),
    }

    // The workout row was created, but the session did not stay wedged
    assert_eq!(writer.creates(), 1);
    assert!(!session.started());
    assert!(session.exercises().is_empty());
}

#[tokio::test]
async fn abort_resets_without_remote_calls() {
    let writer = Arc::new(MockWriter::default());
    let session = session_with(writer.clone());

    session.start().unwrap();
    session
        .add_exercise("bench", vec![persisted_set("s1", 5, 135.0)])
        .unwrap();

    session.abort().unwrap();

    assert!(!session.started());
    assert!(session.start_time().is_none());
    assert!(session.exercises().is_empty());
    assert_eq!(writer.creates(), 0);
    assert!(writer.link_batches().is_empty());
}

#[tokio::test]
async fn full_scenario_links_all_sets_of_merged_exercise() {
    let writer = Arc::new(MockWriter::default());
    let session = session_with(writer.clone());

    session.start().unwrap();
    let t0 = session.start_time().unwrap();
    session
        .add_exercise("bench-press", vec![persisted_set("s1", 5, 135.0)])
        .unwrap();
    session
        .add_exercise("bench-press", vec![persisted_set("s2", 5, 140.0)])
        .unwrap();

    let report = session.end(8, Some("felt good".to_string())).await.unwrap();
    assert_eq!(report.workout_id, "w-1");
    assert_eq!(report.linked_sets, 2);
    assert_eq!(report.skipped_sets, 0);

    let created = writer.created.lock().unwrap().clone();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].start_time, t0);
    assert_eq!(created[0].rating, Some(8));
    assert_eq!(created[0].notes.as_deref(), Some("felt good"));
    assert!(created[0].end_time >= t0);

    let batches = writer.link_batches();
    assert_eq!(batches.len(), 1);
    let ids: Vec<&str> = batches[0].iter().map(|l| l.set_record_id.as_str()).collect();
    assert_eq!(ids, vec!["s1", "s2"]);
    assert!(batches[0].iter().all(|l| l.workout_id == "w-1"));

    assert!(!session.started());
    assert!(session.start_time().is_none());
    assert!(session.exercises().is_empty());
}

#[tokio::test]
async fn unpersisted_sets_are_skipped_not_fatal() {
    let writer = Arc::new(MockWriter::default());
    let session = session_with(writer.clone());

    session.start().unwrap();
    session
        .add_exercise(
            "bench",
            vec![persisted_set("s1", 5, 135.0), unpersisted_set(5)],
        )
        .unwrap();

    let report = session.end(7, None).await.unwrap();
    assert_eq!(report.linked_sets, 1);
    assert_eq!(report.skipped_sets, 1);

    let batches = writer.link_batches();
    assert_eq!(batches[0].len(), 1);
    assert_eq!(batches[0][0].set_record_id, "s1");
}

#[tokio::test]
async fn session_with_no_exercises_skips_the_link_call() {
    let writer = Arc::new(MockWriter::default());
    let session = session_with(writer.clone());

    session.start().unwrap();
    let report = session.end(5, None).await.unwrap();

    assert_eq!(report.linked_sets, 0);
    assert_eq!(writer.creates(), 1);
    assert!(writer.link_batches().is_empty());
    assert!(!session.started());
}

#[tokio::test]
async fn overlapping_calls_are_rejected_busy() {
    let writer = Arc::new(MockWriter::with_delay(Duration::from_millis(100)));
    let session = Arc::new(session_with(writer.clone()));

    session.start().unwrap();
    session
        .add_exercise("bench", vec![persisted_set("s1", 5, 135.0)])
        .unwrap();

    let ending = {
        let session = session.clone();
        tokio::spawn(async move { session.end(8, None).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(matches!(session.start(), Err(SessionError::Busy)));
    assert!(matches!(session.abort(), Err(SessionError::Busy)));
    assert!(matches!(
        session.add_exercise("squat", vec![persisted_set("s2", 5, 185.0)]),
        Err(SessionError::Busy)
    ));
    assert!(matches!(
        session.end(8, None).await,
        Err(SessionError::Busy)
    ));

    let report = ending.await.unwrap().unwrap();
    assert_eq!(report.workout_id, "w-1");

    // The flag clears once the in-flight end finishes
    session.start().unwrap();
}

#[tokio::test]
async fn slow_create_surfaces_as_timeout_and_preserves_state() {
    let writer = Arc::new(MockWriter::with_delay(Duration::from_millis(200)));
    let session = session_with(writer.clone());

    session.start().unwrap();
    session
        .add_exercise("bench", vec![persisted_set("s1", 5, 135.0)])
        .unwrap();

    let err = session
        .end_with_timeout(8, None, Duration::from_millis(10))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::CreateWorkout(AppError::Timeout(_))));
    assert!(err.is_timeout());
    assert!(session.started());
    assert_eq!(session.exercises().len(), 1);
}

#[tokio::test]
async fn restores_in_progress_session_from_store() {
    let writer = Arc::new(MockWriter::default());
    let store = Arc::new(MemorySessionStore::new());

    {
        let session = WorkoutSession::new("u1", writer.clone(), store.clone());
        session.start().unwrap();
        session
            .add_exercise("bench", vec![persisted_set("s1", 5, 135.0)])
            .unwrap();
    }

    // A new manager over the same store picks the session back up
    let restored = WorkoutSession::new("u1", writer.clone(), store.clone());
    assert!(restored.started());
    assert!(restored.start_time().is_some());
    assert_eq!(restored.exercises().len(), 1);

    // After an abort nothing is left to restore
    restored.abort().unwrap();
    let fresh = WorkoutSession::new("u1", writer, store);
    assert!(!fresh.started());
    assert!(fresh.exercises().is_empty());
}

#[tokio::test]
async fn idle_snapshot_is_not_restored() {
    let writer = Arc::new(MockWriter::default());
    let store = Arc::new(MemorySessionStore::new());
    store
        .save(&gymlog::session::SessionSnapshot::default())
        .unwrap();

    let session = WorkoutSession::new("u1", writer, store);
    assert!(!session.started());
}

#[tokio::test]
async fn elapsed_display_reads_hh_mm_ss() {
    let session = session_with(Arc::new(MockWriter::default()));
    assert_eq!(session.elapsed_display(), "00:00:00");
    assert!(session.elapsed().is_none());

    session.start().unwrap();
    let display = session.elapsed_display();
    assert_eq!(display.len(), 8);
    assert!(display.starts_with("00:00:"));
}
