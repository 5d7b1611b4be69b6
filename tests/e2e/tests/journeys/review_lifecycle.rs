//! Journey: the full life of a card
//!
//! Create -> learn through the short-term steps -> graduate -> mature ->
//! lapse -> relearn -> recover, with the review log and stats checked at
//! each stage. Exercises only the public API, against a real SQLite file.

use chrono::Duration;
use jimaku_core::{Rating, State, StorageError};
use jimaku_e2e_tests::harness::TestDatabaseManager;
use jimaku_e2e_tests::mocks::{session_start, ReviewScript};

#[test]
fn card_learns_graduates_lapses_and_recovers() {
    let db = TestDatabaseManager::new_temp();

    let record = db.storage.create_card(Some("n5-vocab")).unwrap();
    let now = session_start();
    assert_eq!(record.card.state, State::New);
    assert!(record.card.is_due(now));

    // Learning step 0 (1 minute)
    let (step0, log0) = db.storage.review_card(&record.id, Rating::Good, now).unwrap();
    assert_eq!(step0.card.state, State::Learning);
    assert_eq!(step0.card.due, now + Duration::minutes(1));
    assert_eq!(log0.log.state, State::New);

    // Learning step 1 (10 minutes)
    let t1 = step0.card.due + Duration::seconds(30);
    let (step1, _) = db.storage.review_card(&record.id, Rating::Good, t1).unwrap();
    assert_eq!(step1.card.state, State::Learning);
    assert_eq!(step1.card.due, t1 + Duration::minutes(10));

    // Graduation
    let t2 = step1.card.due + Duration::seconds(30);
    let (graduated, _) = db.storage.review_card(&record.id, Rating::Good, t2).unwrap();
    assert_eq!(graduated.card.state, State::Review);
    assert!(graduated.card.due >= t2 + Duration::days(1));
    assert_eq!(graduated.card.lapses, 0);

    // Mature for a few successful reviews
    let mut now = graduated.card.due + Duration::hours(2);
    let mut stability = graduated.card.stability;
    for _ in 0..3 {
        let (updated, _) = db.storage.review_card(&record.id, Rating::Good, now).unwrap();
        assert_eq!(updated.card.state, State::Review);
        assert!(updated.card.stability > stability);
        stability = updated.card.stability;
        now = updated.card.due + Duration::hours(2);
    }

    // The lapse
    let (lapsed, lapse_log) = db.storage.review_card(&record.id, Rating::Again, now).unwrap();
    assert_eq!(lapsed.card.state, State::Relearning);
    assert_eq!(lapsed.card.lapses, 1);
    assert!(lapsed.card.stability < stability);
    assert_eq!(lapse_log.log.state, State::Review);
    assert_eq!(lapse_log.log.rating, Rating::Again);
    // Default relearning step: 10 minutes
    assert_eq!(lapsed.card.due, now + Duration::minutes(10));

    // Recovery: Good on the single relearning step re-graduates
    let t3 = lapsed.card.due + Duration::seconds(30);
    let (recovered, _) = db.storage.review_card(&record.id, Rating::Good, t3).unwrap();
    assert_eq!(recovered.card.state, State::Review);
    assert_eq!(recovered.card.lapses, 1);

    // The log tells the whole story, oldest first
    let logs = db.storage.review_logs(&record.id).unwrap();
    assert_eq!(logs.len(), 8);
    assert_eq!(logs[0].log.state, State::New);
    assert_eq!(logs.last().unwrap().log.state, State::Relearning);
    assert!(logs.windows(2).all(|w| w[0].log.review_time <= w[1].log.review_time));
    assert_eq!(logs.iter().filter(|l| l.log.rating == Rating::Again).count(), 1);
}

#[test]
fn easy_fast_tracks_a_new_card() {
    let db = TestDatabaseManager::new_temp();

    let record = db.storage.create_card(None).unwrap();
    let now = session_start();
    let (updated, _) = db.storage.review_card(&record.id, Rating::Easy, now).unwrap();

    assert_eq!(updated.card.state, State::Review);
    assert!(updated.card.due >= now + Duration::days(1));

    // An Easy graduation interval beats the Good path's first interval
    let good_card = db.storage.create_card(None).unwrap();
    let good = ReviewScript::diligent(3).replay(&db.storage, &good_card.id).0;
    assert!(updated.card.scheduled_days >= good.card.scheduled_days);
}

#[test]
fn manual_rating_logs_without_rescheduling() {
    let db = TestDatabaseManager::new_temp();

    let record = db.storage.create_card(None).unwrap();
    let now = session_start();
    let (updated, log) = db.storage.review_card(&record.id, Rating::Manual, now).unwrap();

    assert_eq!(updated.card.state, State::New);
    assert_eq!(updated.card.reps, 0);
    assert_eq!(updated.card.due, record.card.due);
    assert_eq!(log.log.rating, Rating::Manual);

    let logs = db.storage.review_logs(&record.id).unwrap();
    assert_eq!(logs.len(), 1);
}

#[test]
fn stats_track_a_session() {
    let db = TestDatabaseManager::new_temp();

    let ids = db.seed_cards(10, Some("session"));
    let now = session_start();
    let stats = db.storage.stats(now).unwrap();
    assert_eq!(stats.total_cards, 10);
    assert_eq!(stats.new_cards, 10);
    assert_eq!(stats.due_cards, 10);
    assert_eq!(stats.reviewed_today, 0);

    for id in ids.iter().take(4) {
        db.storage.review_card(id, Rating::Good, now).unwrap();
    }
    db.storage.review_card(&ids[4], Rating::Easy, now).unwrap();

    let stats = db.storage.stats(now + Duration::seconds(1)).unwrap();
    assert_eq!(stats.new_cards, 5);
    assert_eq!(stats.learning_cards, 4);
    assert_eq!(stats.review_cards, 1);
    assert_eq!(stats.reviewed_today, 5);

    assert_eq!(db.storage.cards_reviewed_on(now.date_naive()).unwrap(), 5);
}

#[test]
fn due_queue_serves_punctual_learner() {
    let db = TestDatabaseManager::new_temp();
    db.seed_cards(6, Some("queue"));
    let now = session_start();

    let due = db.storage.due_cards(now, 100).unwrap();
    assert_eq!(due.len(), 6);

    // Review everything; nothing is due until the first step elapses
    for record in &due {
        db.storage.review_card(&record.id, Rating::Good, now).unwrap();
    }
    assert!(db.storage.due_cards(now + Duration::seconds(5), 100).unwrap().is_empty());

    let after_step = db.storage.due_cards(now + Duration::minutes(2), 100).unwrap();
    assert_eq!(after_step.len(), 6);
}

#[test]
fn deleting_a_card_removes_its_history() {
    let db = TestDatabaseManager::new_temp();
    let now = session_start();

    let record = db.storage.create_card(Some("doomed")).unwrap();
    db.storage.review_card(&record.id, Rating::Good, now).unwrap();

    db.storage.delete_card(&record.id).unwrap();
    assert!(db.storage.get_card(&record.id).unwrap().is_none());
    assert!(db.storage.review_logs(&record.id).unwrap().is_empty());

    assert!(matches!(
        db.storage.review_card(&record.id, Rating::Good, now),
        Err(StorageError::NotFound(_))
    ));
}

#[test]
fn history_survives_reopen() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = tmp.path().join("reopen.db");

    let id = {
        let db = TestDatabaseManager::new_at_path(path.clone());
        let record = db.storage.create_card(Some("persist")).unwrap();
        ReviewScript::forgetful(6).replay(&db.storage, &record.id);
        record.id
    };

    let db = TestDatabaseManager::new_at_path(path);
    let record = db.storage.get_card(&id).unwrap().unwrap();
    assert_eq!(record.deck_id.as_deref(), Some("persist"));
    assert_eq!(record.card.reps, 6);

    let logs = db.storage.review_logs(&id).unwrap();
    assert_eq!(logs.len(), 6);
}
