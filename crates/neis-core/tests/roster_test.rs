//! Integration test: roster registration, promotion, deletion, and attendance mileage.

use chrono::NaiveDate;
use neis_core::{AttendanceStatus, NewStudent, Promotion, Requester, RosterStore, StoreError};

fn open() -> (tempfile::TempDir, RosterStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = RosterStore::open_path(dir.path()).unwrap();
    (dir, store)
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

#[test]
fn student_numbers_are_unique_per_teacher() {
    let (_dir, store) = open();
    let s = store.add_student("t1", NewStudent::new(" 김철수 ", "10101")).unwrap();
    assert_eq!(s.name, "김철수");
    assert_eq!(s.mileage, 0);

    assert!(matches!(
        store.add_student("t1", NewStudent::new("이영희", "10101")),
        Err(StoreError::Duplicate(_))
    ));
    // Another teacher may reuse the number.
    assert!(store.add_student("t2", NewStudent::new("이영희", "10101")).is_ok());
    assert!(matches!(
        store.add_student("t1", NewStudent::new("", "10102")),
        Err(StoreError::Invalid(_))
    ));
}

#[test]
fn bulk_add_counts_skips() {
    let (_dir, store) = open();
    store.add_student("t1", NewStudent::new("김철수", "1")).unwrap();
    let summary = store
        .bulk_add(
            "t1",
            vec![
                NewStudent::new("김철수", "1"),
                NewStudent::new("이영희", "2"),
                NewStudent::new("박민수", "3"),
                NewStudent::new("중복", "3"),
            ],
        )
        .unwrap();
    assert_eq!(summary.added, 2);
    assert_eq!(summary.skipped, 2);
}

#[test]
fn listing_is_scoped_and_sorted() {
    let (_dir, store) = open();
    store.add_student("t1", NewStudent::new("하늘", "1")).unwrap();
    store.add_student("t1", NewStudent::new("가람", "2")).unwrap();
    store.add_student("t2", NewStudent::new("나래", "1")).unwrap();

    let own = store.list_students(&Requester::teacher("t1")).unwrap();
    let names: Vec<_> = own.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["가람", "하늘"]);

    let all = store.list_students(&Requester::admin("root")).unwrap();
    let pairs: Vec<_> = all.iter().map(|s| (s.teacher_id.as_str(), s.name.as_str())).collect();
    assert_eq!(pairs, [("t1", "가람"), ("t1", "하늘"), ("t2", "나래")]);
}

#[test]
fn update_checks_duplicates_and_ownership() {
    let (_dir, store) = open();
    let a = store.add_student("t1", NewStudent::new("김철수", "1")).unwrap();
    store.add_student("t1", NewStudent::new("이영희", "2")).unwrap();

    assert!(matches!(
        store.update_student("t1", &a.id, NewStudent::new("김철수", "2")),
        Err(StoreError::Duplicate(_))
    ));
    assert!(matches!(
        store.update_student("t2", &a.id, NewStudent::new("김철수", "9")),
        Err(StoreError::NotFound(_))
    ));
    let renamed = store.update_student("t1", &a.id, NewStudent::new("김철수2", "1")).unwrap();
    assert_eq!(renamed.name, "김철수2");
}

#[test]
fn attendance_mileage_follows_present_transitions() {
    let (_dir, store) = open();
    let s = store.add_student("t1", NewStudent::new("김철수", "1")).unwrap();

    let mark = store.mark_attendance("t1", &s.id, day(4), AttendanceStatus::Present).unwrap();
    assert_eq!(mark.current_mileage, 1);
    let mark = store.mark_attendance("t1", &s.id, day(4), AttendanceStatus::Present).unwrap();
    assert_eq!(mark.current_mileage, 1, "re-marking PRESENT is a no-op");
    let mark = store.mark_attendance("t1", &s.id, day(4), AttendanceStatus::Late).unwrap();
    assert_eq!(mark.current_mileage, 0);
    let mark = store.mark_attendance("t1", &s.id, day(5), AttendanceStatus::Absent).unwrap();
    assert_eq!(mark.current_mileage, 0);

    let history = store.attendance_history(&s.id).unwrap();
    assert_eq!(history.len(), 2, "one row per student per day");
    assert_eq!(history[0].date, day(4));
    assert_eq!(history[0].status, AttendanceStatus::Late);
    assert_eq!(history[1].date, day(5));
}

#[test]
fn mileage_never_goes_negative() {
    let (_dir, store) = open();
    let s = store.add_student("t1", NewStudent::new("김철수", "1")).unwrap();
    store.mark_attendance("t1", &s.id, day(4), AttendanceStatus::Present).unwrap();
    store.mark_attendance("t1", &s.id, day(5), AttendanceStatus::Present).unwrap();
    store.mark_attendance("t1", &s.id, day(4), AttendanceStatus::Absent).unwrap();
    let mark = store.mark_attendance("t1", &s.id, day(5), AttendanceStatus::Absent).unwrap();
    assert_eq!(mark.current_mileage, 0);
    assert_eq!(store.get_student(&s.id).unwrap().unwrap().mileage, 0);
}

#[test]
fn attendance_for_unknown_student_fails() {
    let (_dir, store) = open();
    assert!(matches!(
        store.mark_attendance("t1", "missing", day(1), AttendanceStatus::Present),
        Err(StoreError::NotFound(_))
    ));
}

#[test]
fn delete_cascades_attendance() {
    let (_dir, store) = open();
    let a = store.add_student("t1", NewStudent::new("김철수", "1")).unwrap();
    let b = store.add_student("t1", NewStudent::new("이영희", "2")).unwrap();
    store.mark_attendance("t1", &a.id, day(4), AttendanceStatus::Present).unwrap();
    store.mark_attendance("t1", &b.id, day(4), AttendanceStatus::Present).unwrap();

    assert!(matches!(store.delete_student("t2", &a.id), Err(StoreError::NotFound(_))));
    store.delete_student("t1", &a.id).unwrap();
    assert!(store.get_student(&a.id).unwrap().is_none());
    assert!(store.attendance_history(&a.id).unwrap().is_empty());
    assert_eq!(store.attendance_history(&b.id).unwrap().len(), 1);
}

#[test]
fn bulk_delete_respects_ownership() {
    let (_dir, store) = open();
    let a = store.add_student("t1", NewStudent::new("김철수", "1")).unwrap();
    let b = store.add_student("t2", NewStudent::new("이영희", "1")).unwrap();
    store.mark_attendance("t2", &b.id, day(4), AttendanceStatus::Present).unwrap();

    let ids = vec![a.id.clone(), b.id.clone()];
    assert_eq!(store.bulk_delete(&Requester::teacher("t1"), &ids).unwrap(), 1);
    assert!(store.get_student(&b.id).unwrap().is_some());
    assert_eq!(store.attendance_history(&b.id).unwrap().len(), 1);

    assert_eq!(store.bulk_delete(&Requester::admin("root"), &ids).unwrap(), 1);
    assert!(store.attendance_history(&b.id).unwrap().is_empty());
    assert!(store.bulk_delete(&Requester::admin("root"), &[]).is_err());
}

#[test]
fn bulk_promote_counts_outcomes() {
    let (_dir, store) = open();
    let a = store.add_student("t1", NewStudent::new("김철수", "10101")).unwrap();
    let b = store.add_student("t1", NewStudent::new("이영희", "10102")).unwrap();
    let c = store.add_student("t1", NewStudent::new("박민수", "10103")).unwrap();
    let other = store.add_student("t2", NewStudent::new("최지우", "10101")).unwrap();

    let promotions = vec![
        Promotion { id: a.id.clone(), new_student_number: "20101".into() },
        Promotion { id: b.id.clone(), new_student_number: "10102".into() },
        Promotion { id: c.id.clone(), new_student_number: "20101".into() },
        Promotion { id: other.id.clone(), new_student_number: "20999".into() },
        Promotion { id: "missing".into(), new_student_number: "1".into() },
    ];
    let summary = store.bulk_promote(&Requester::teacher("t1"), &promotions).unwrap();
    assert_eq!(summary.success, 1);
    assert_eq!(summary.unchanged, 1);
    assert_eq!(summary.failed, 3);

    assert_eq!(store.get_student(&a.id).unwrap().unwrap().student_number, "20101");
    assert_eq!(store.get_student(&c.id).unwrap().unwrap().student_number, "10103");
    assert_eq!(store.get_student(&other.id).unwrap().unwrap().student_number, "10101");
}
