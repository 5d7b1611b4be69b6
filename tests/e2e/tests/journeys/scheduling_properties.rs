//! Journey: scheduling behavior over long simulated histories
//!
//! Property-style checks of the scheduler through the storage API:
//! interval growth, fuzz bounds, determinism, retention-target effects and
//! forgetful-learner dynamics.

use chrono::{Duration, Utc};
use jimaku_core::{FSRSParameters, Rating, State};
use jimaku_e2e_tests::harness::TestDatabaseManager;
use jimaku_e2e_tests::mocks::{session_start, ReviewScript, TestDataFactory};

#[test]
fn diligent_learner_sees_growing_intervals() {
    let db = TestDatabaseManager::new_temp();
    let record = db.storage.create_card(None).unwrap();
    ReviewScript::diligent(3).replay(&db.storage, &record.id);

    let mut now = db.storage.get_card(&record.id).unwrap().unwrap().card.due + Duration::hours(1);
    let mut last_interval = 0.0;
    for _ in 0..8 {
        let (updated, _) = db.storage.review_card(&record.id, Rating::Good, now).unwrap();
        assert_eq!(updated.card.state, State::Review);
        assert!(
            updated.card.scheduled_days >= last_interval,
            "interval shrank on success: {} -> {}",
            last_interval,
            updated.card.scheduled_days
        );
        last_interval = updated.card.scheduled_days;
        now = updated.card.due + Duration::hours(1);
    }
    assert!(last_interval > 10.0);
}

#[test]
fn forgetful_learner_stays_on_short_intervals() {
    let db = TestDatabaseManager::new_temp();

    let diligent = db.storage.create_card(None).unwrap();
    let (diligent_final, _) = ReviewScript::diligent(12).replay(&db.storage, &diligent.id);

    let forgetful = db.storage.create_card(None).unwrap();
    let (forgetful_final, _) = ReviewScript::forgetful(12).replay(&db.storage, &forgetful.id);

    assert!(forgetful_final.card.lapses > 0);
    assert!(forgetful_final.card.stability < diligent_final.card.stability);
    assert!(forgetful_final.card.difficulty > diligent_final.card.difficulty);
}

#[test]
fn higher_retention_target_means_shorter_intervals() {
    let strict = TestDatabaseManager::new_with_params(FSRSParameters {
        request_retention: 0.97,
        ..Default::default()
    });
    let relaxed = TestDatabaseManager::new_with_params(FSRSParameters {
        request_retention: 0.80,
        ..Default::default()
    });

    let a = strict.storage.create_card(None).unwrap();
    let (strict_final, _) = ReviewScript::diligent(6).replay(&strict.storage, &a.id);

    let b = relaxed.storage.create_card(None).unwrap();
    let (relaxed_final, _) = ReviewScript::diligent(6).replay(&relaxed.storage, &b.id);

    assert!(strict_final.card.scheduled_days < relaxed_final.card.scheduled_days);
}

#[test]
fn maximum_interval_caps_scheduling() {
    let db = TestDatabaseManager::new_with_params(FSRSParameters {
        maximum_interval: 30,
        ..Default::default()
    });

    let record = db.storage.create_card(None).unwrap();
    let mut now = session_start();
    for _ in 0..20 {
        let (updated, _) = db.storage.review_card(&record.id, Rating::Easy, now).unwrap();
        assert!(updated.card.scheduled_days <= 30.0);
        now = updated.card.due + Duration::hours(1);
    }
}

#[test]
fn fuzzed_histories_are_deterministic_and_bounded() {
    let make_store = || {
        TestDatabaseManager::new_with_params(FSRSParameters {
            enable_fuzz: true,
            maximum_interval: 365,
            ..Default::default()
        })
    };
    let first = make_store();
    let second = make_store();

    // Same script, same clock: bit-identical scheduling in both stores
    let script = ReviewScript::diligent(8);

    let a = first.storage.create_card(None).unwrap();
    let (fa, _) = script.replay(&first.storage, &a.id);

    let b = second.storage.create_card(None).unwrap();
    let (fb, _) = script.replay(&second.storage, &b.id);

    assert_eq!(fa.card, fb.card);

    // And every fuzzed interval stayed within the hard bounds
    for log in first.storage.review_logs(&a.id).unwrap().iter().skip(1) {
        assert!(log.log.scheduled_days >= 0.0);
        assert!(log.log.scheduled_days <= 365.0);
    }
    assert!(fa.card.scheduled_days >= 1.0);
    assert!(fa.card.scheduled_days <= 365.0);
}

#[test]
fn preview_matches_committed_review() {
    let db = TestDatabaseManager::new_temp();
    let record = db.storage.create_card(None).unwrap();
    ReviewScript::diligent(4).replay(&db.storage, &record.id);

    let now = db.storage.get_card(&record.id).unwrap().unwrap().card.due + Duration::hours(3);
    let preview = db.storage.preview_review(&record.id, now).unwrap();
    let (committed, _) = db.storage.review_card(&record.id, Rating::Hard, now).unwrap();

    assert_eq!(preview.hard.card, committed.card);
}

#[test]
fn decks_schedule_independently() {
    let db = TestDatabaseManager::new_temp();
    let vocab = TestDataFactory::create_deck(&db.storage, "vocab", 5);
    let grammar = TestDataFactory::create_deck(&db.storage, "grammar", 3);

    let now = session_start();
    for id in &vocab {
        db.storage.review_card(id, Rating::Good, now).unwrap();
    }

    assert_eq!(db.storage.cards_for_deck("vocab").unwrap().len(), 5);
    assert_eq!(db.storage.cards_for_deck("grammar").unwrap().len(), 3);

    for record in db.storage.cards_for_deck("grammar").unwrap() {
        assert_eq!(record.card.state, State::New);
    }
    for record in db.storage.cards_for_deck("vocab").unwrap() {
        assert_eq!(record.card.state, State::Learning);
    }
}

#[test]
fn mixed_scenario_stats_are_consistent() {
    let db = TestDatabaseManager::new_temp();
    let scenario = TestDataFactory::create_retention_scenario(&db.storage);
    assert_eq!(scenario.card_ids.len(), 4);

    let stats = db.storage.stats(Utc::now()).unwrap();
    assert_eq!(stats.total_cards, 4);
    assert_eq!(stats.new_cards, 1);
    assert_eq!(
        stats.new_cards + stats.learning_cards + stats.review_cards,
        stats.total_cards
    );
}
