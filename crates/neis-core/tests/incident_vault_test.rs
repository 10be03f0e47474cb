//! Integration test: incident store encryption at rest.
//!
//! Verifies that:
//! 1. Sensitive fields are stored as ciphertext and read back as plaintext.
//! 2. Re-saving an untouched record does not double-encrypt.
//! 3. A store without a key refuses to save encrypted incidents.
//! 4. One bad field or record does not hide the others.
//! 5. Ownership rules apply to get / update / delete.

use neis_core::{
    looks_encrypted, EncryptionKey, IncidentAnalysis, IncidentRecord, IncidentStore, IncidentSubmission,
    IncidentUpdate, Requester, SchoolLevel, StoreError, DECRYPTION_FAILED,
};

/// Deterministic test key (32 bytes). NOT for production.
fn test_key() -> EncryptionKey {
    let mut key = [0u8; 32];
    for (i, b) in key.iter_mut().enumerate() {
        *b = (i as u8).wrapping_mul(7).wrapping_add(42);
    }
    EncryptionKey::from_bytes(key)
}

fn analysis() -> IncidentAnalysis {
    IncidentAnalysis {
        who: Some("김철수(A, 밀침), 이영희(B, 공 뺏음)".into()),
        when: Some("3월 5일 점심시간".into()),
        place: Some("운동장".into()),
        what: Some("공 문제로 다툼".into()),
        incident_type: Some("또래 갈등".into()),
        ..Default::default()
    }
}

fn submission(teacher: &str, student: &str) -> IncidentSubmission {
    IncidentSubmission {
        teacher_id: teacher.into(),
        student_id: Some(student.into()),
        raw_text: "점심시간에 철수가 영희를 밀쳤다고 함".into(),
        ..Default::default()
    }
}

#[test]
fn submit_stores_ciphertext_and_reads_plaintext() {
    let dir = tempfile::tempdir().unwrap();
    let store = IncidentStore::open_with_key(dir.path(), Some(test_key())).unwrap();
    let owner = Requester::teacher("t1");

    let outcome = store
        .submit(submission("t1", "s1"), analysis(), SchoolLevel::Elementary)
        .expect("submit should succeed");
    assert_eq!(outcome.template.id, "elementary_peer_conflict");
    assert!(outcome.neis_record.contains("김철수"));

    let stored = store.get(&outcome.incident_id, &owner).unwrap().unwrap();
    assert!(looks_encrypted(stored.raw_data()), "rawData must be ciphertext at rest");
    assert!(looks_encrypted(stored.teacher_note()), "teacherNote must be ciphertext at rest");
    assert!(!stored.raw_data().contains("철수"));
    assert_eq!(stored.incident_type, "또래 갈등");

    let view = store.get_decrypted(&outcome.incident_id, &owner).unwrap().unwrap();
    assert_eq!(view.raw_data, "점심시간에 철수가 영희를 밀쳤다고 함");
    assert_eq!(view.teacher_note, outcome.neis_record);

    let embedded = stored
        .ai_analysis
        .as_ref()
        .and_then(|a| a.structured())
        .expect("structured analysis");
    assert!(embedded.extra.contains_key("guidanceSteps"));
    assert_eq!(
        embedded.extra.get("neisRecord").and_then(|v| v.as_str()),
        Some(outcome.neis_record.as_str())
    );
}

#[test]
fn data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let id = {
        let store = IncidentStore::open_with_key(dir.path(), Some(test_key())).unwrap();
        let id = store
            .submit(submission("t1", "s1"), analysis(), SchoolLevel::All)
            .unwrap()
            .incident_id;
        store.flush().unwrap();
        id
    };
    let store = IncidentStore::open_with_key(dir.path(), Some(test_key())).unwrap();
    let view = store.get_decrypted(&id, &Requester::teacher("t1")).unwrap().unwrap();
    assert_eq!(view.raw_data, "점심시간에 철수가 영희를 밀쳤다고 함");
}

#[test]
fn resave_without_changes_keeps_ciphertext() {
    let dir = tempfile::tempdir().unwrap();
    let store = IncidentStore::open_with_key(dir.path(), Some(test_key())).unwrap();
    let owner = Requester::teacher("t1");
    let id = store
        .submit(submission("t1", "s1"), analysis(), SchoolLevel::All)
        .unwrap()
        .incident_id;

    let mut record = store.get(&id, &owner).unwrap().unwrap();
    let before = (record.raw_data().to_string(), record.teacher_note().to_string());
    store.save(&mut record).unwrap();
    let after = store.get(&id, &owner).unwrap().unwrap();
    assert_eq!(after.raw_data(), before.0);
    assert_eq!(after.teacher_note(), before.1);
}

#[test]
fn missing_key_blocks_submission() {
    let dir = tempfile::tempdir().unwrap();
    let store = IncidentStore::open_with_key(dir.path(), None).unwrap();
    let err = store
        .submit(submission("t1", "s1"), analysis(), SchoolLevel::All)
        .unwrap_err();
    assert!(matches!(err, StoreError::Config(_)), "expected config error, got {err:?}");
    assert!(store.list_for_teacher("t1").unwrap().is_empty(), "nothing may be written");
}

#[test]
fn unencrypted_record_saves_without_key() {
    let dir = tempfile::tempdir().unwrap();
    let store = IncidentStore::open_with_key(dir.path(), None).unwrap();
    let mut record = IncidentRecord::new("t1", "s1", "기타", "원문", "기록");
    record.is_encrypted = false;
    store.save(&mut record).unwrap();
    let view = store.list_decrypted_for_teacher("t1").unwrap();
    assert_eq!(view[0].raw_data, "원문");
}

#[test]
fn one_bad_record_does_not_hide_others() {
    let dir = tempfile::tempdir().unwrap();
    let store = IncidentStore::open_with_key(dir.path(), Some(test_key())).unwrap();
    store
        .submit(submission("t1", "s1"), analysis(), SchoolLevel::All)
        .unwrap();

    // A record whose teacherNote has the ciphertext shape but cannot be decrypted.
    let mut broken = IncidentRecord::new("t1", "s1", "기타", "정상 원문", "");
    store.save(&mut broken).unwrap();
    let mut loaded = store.get(&broken.id, &Requester::teacher("t1")).unwrap().unwrap();
    loaded.set_teacher_note(format!("{}:ff", "0".repeat(32)));
    store.save(&mut loaded).unwrap();

    let views = store.list_decrypted_for_teacher("t1").unwrap();
    assert_eq!(views.len(), 2);
    let bad = views.iter().find(|v| v.id == broken.id).unwrap();
    assert_eq!(bad.teacher_note, DECRYPTION_FAILED);
    assert_eq!(bad.raw_data, "정상 원문");
    let good = views.iter().find(|v| v.id != broken.id).unwrap();
    assert!(!good.has_failed_field());
}

#[test]
fn legacy_plaintext_is_returned_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let store = IncidentStore::open_with_key(dir.path(), Some(test_key())).unwrap();

    // Written before encryption was enabled.
    let mut legacy = IncidentRecord::new("t1", "s1", "기타", "예전 원문", "예전 기록");
    legacy.is_encrypted = false;
    store.save(&mut legacy).unwrap();
    let mut loaded = store.get(&legacy.id, &Requester::teacher("t1")).unwrap().unwrap();
    loaded.is_encrypted = true;
    store.save(&mut loaded).unwrap();

    let view = store.get_decrypted(&legacy.id, &Requester::teacher("t1")).unwrap().unwrap();
    assert_eq!(view.raw_data, "예전 원문");
    assert_eq!(view.teacher_note, "예전 기록");
}

#[test]
fn update_reencrypts_content() {
    let dir = tempfile::tempdir().unwrap();
    let store = IncidentStore::open_with_key(dir.path(), Some(test_key())).unwrap();
    let owner = Requester::teacher("t1");
    let id = store
        .submit(submission("t1", "s1"), analysis(), SchoolLevel::All)
        .unwrap()
        .incident_id;
    let raw_before = store.get(&id, &owner).unwrap().unwrap().raw_data().to_string();

    let view = store
        .update(
            &id,
            &owner,
            IncidentUpdate {
                content: Some("교사가 수정한 기록".into()),
                incident_type: Some("생활지도".into()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(view.teacher_note, "교사가 수정한 기록");
    assert_eq!(view.incident_type, "생활지도");

    let stored = store.get(&id, &owner).unwrap().unwrap();
    assert!(looks_encrypted(stored.teacher_note()));
    assert_eq!(stored.raw_data(), raw_before, "untouched field keeps its ciphertext");
}

#[test]
fn ownership_is_enforced() {
    let dir = tempfile::tempdir().unwrap();
    let store = IncidentStore::open_with_key(dir.path(), Some(test_key())).unwrap();
    let id = store
        .submit(submission("t1", "s1"), analysis(), SchoolLevel::All)
        .unwrap()
        .incident_id;

    let stranger = Requester::teacher("t2");
    assert!(store.get(&id, &stranger).unwrap().is_none());
    assert!(matches!(
        store.update(&id, &stranger, IncidentUpdate::default()),
        Err(StoreError::NotFound(_))
    ));
    assert!(!store.delete(&id, &stranger).unwrap());

    let admin = Requester::admin("root");
    assert!(store.get(&id, &admin).unwrap().is_some());
    assert!(store.delete(&id, &admin).unwrap());
    assert!(store.get(&id, &Requester::teacher("t1")).unwrap().is_none());
}

#[test]
fn listings_are_newest_first_and_scoped() {
    let dir = tempfile::tempdir().unwrap();
    let store = IncidentStore::open_with_key(dir.path(), Some(test_key()))
        .unwrap()
        .with_history_limit(2);
    let base = chrono::Utc::now();
    for days in [3i64, 1, 2] {
        let mut s = submission("t1", "s1");
        s.incident_date = Some(base - chrono::Duration::days(days));
        store.submit(s, analysis(), SchoolLevel::All).unwrap();
    }
    store
        .submit(submission("t1", "s2"), analysis(), SchoolLevel::All)
        .unwrap();
    store
        .submit(submission("t2", "s1"), analysis(), SchoolLevel::All)
        .unwrap();

    let s1 = store.list_for_student("t1", "s1").unwrap();
    assert_eq!(s1.len(), 2, "capped at the history limit");
    assert!(s1[0].incident_date > s1[1].incident_date);
    assert_eq!(s1[0].incident_date, base - chrono::Duration::days(1));

    let all = store.list_for_teacher("t1").unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(|r| r.teacher_id == "t1"));
}

#[test]
fn submission_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let store = IncidentStore::open_with_key(dir.path(), Some(test_key())).unwrap();
    let outcome = store
        .submit(
            IncidentSubmission {
                teacher_id: "t1".into(),
                raw_text: "내용".into(),
                ..Default::default()
            },
            IncidentAnalysis::default(),
            SchoolLevel::All,
        )
        .unwrap();
    assert_eq!(outcome.template.id, "default");
    let stored = store.get(&outcome.incident_id, &Requester::teacher("t1")).unwrap().unwrap();
    assert_eq!(stored.student_id, "unknown");
    assert_eq!(stored.incident_type, "기타");
}

#[test]
fn student_patterns_over_history() {
    let dir = tempfile::tempdir().unwrap();
    let store = IncidentStore::open_with_key(dir.path(), Some(test_key())).unwrap();
    assert!(store.student_patterns("t1", "s1").unwrap().is_none());

    for _ in 0..3 {
        store
            .submit(submission("t1", "s1"), analysis(), SchoolLevel::All)
            .unwrap();
    }
    let report = store.student_patterns("t1", "s1").unwrap().unwrap();
    assert_eq!(report.total_incidents, 3);
    assert!(report
        .insights
        .iter()
        .any(|i| i.pattern == "운동장에서 3회 반복됨"));
}
