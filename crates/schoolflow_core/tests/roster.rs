use rusqlite::Connection;
use schoolflow_core::db::open_db_in_memory;
use schoolflow_core::{
    CreatedStudent, NewStudentInput, PageRequest, Role, RosterRepository, RosterService,
    RosterServiceError, SqliteRosterRepository, StudentPatch,
};
use uuid::Uuid;

fn service(conn: &Connection) -> RosterService<SqliteRosterRepository<'_>> {
    RosterService::new(SqliteRosterRepository::try_new(conn).unwrap())
}

fn new_student(name: &str, email: &str, roll_number: &str) -> NewStudentInput {
    NewStudentInput {
        name: Some(name.to_string()),
        email: Some(email.to_string()),
        roll_number: Some(roll_number.to_string()),
    }
}

fn create(roster: &RosterService<SqliteRosterRepository<'_>>, name: &str) -> CreatedStudent {
    let slug = name.to_lowercase();
    roster
        .create_student(&new_student(
            name,
            &format!("{slug}@schoolflow.test"),
            &format!("ROLL-{slug}"),
        ))
        .unwrap()
}

#[test]
fn create_student_provisions_a_student_account() {
    let conn = open_db_in_memory().unwrap();
    let roster = service(&conn);

    let created = create(&roster, "Asha");
    assert_eq!(created.user.role, Role::Student);
    assert_eq!(created.user.email, created.student.email);
    assert_eq!(created.student.user_id, created.user.id);

    let loaded = SqliteRosterRepository::try_new(&conn)
        .unwrap()
        .get_student(created.student.id)
        .unwrap();
    assert_eq!(loaded, Some(created.student.clone()));
    assert_eq!(
        roster.student_for_user(created.user.id).unwrap(),
        created.student
    );
}

#[test]
fn create_student_requires_every_field() {
    let conn = open_db_in_memory().unwrap();
    let roster = service(&conn);

    let mut input = new_student("Asha", "asha@schoolflow.test", "ROLL-1");
    input.roll_number = Some("  ".to_string());
    let err = roster.create_student(&input).unwrap_err();
    assert!(matches!(err, RosterServiceError::MissingField("rollNumber")));

    input.name = None;
    let err = roster.create_student(&input).unwrap_err();
    assert!(matches!(err, RosterServiceError::MissingField("name")));
}

#[test]
fn duplicate_email_and_roll_number_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let roster = service(&conn);
    create(&roster, "Asha");

    let err = roster
        .create_student(&new_student("Other", "asha@schoolflow.test", "ROLL-9"))
        .unwrap_err();
    assert!(matches!(err, RosterServiceError::EmailInUse(_)));

    let err = roster
        .create_student(&new_student("Other", "other@schoolflow.test", "ROLL-asha"))
        .unwrap_err();
    assert!(matches!(err, RosterServiceError::RollNumberInUse(_)));

    let page = roster.list_students(PageRequest::default()).unwrap();
    assert_eq!(page.total, 1);
}

#[test]
fn update_merges_and_mirrors_email_to_account() {
    let conn = open_db_in_memory().unwrap();
    let roster = service(&conn);
    let created = create(&roster, "Asha");

    let updated = roster
        .update_student(
            &created.student.id.to_string(),
            &StudentPatch {
                name: Some("Asha K".to_string()),
                email: Some("asha.k@schoolflow.test".to_string()),
                roll_number: Some(String::new()),
            },
        )
        .unwrap();
    assert_eq!(updated.name, "Asha K");
    assert_eq!(updated.roll_number, created.student.roll_number);
    assert_eq!(updated.email, "asha.k@schoolflow.test");

    let repo = SqliteRosterRepository::try_new(&conn).unwrap();
    let account = repo
        .find_user_by_email("asha.k@schoolflow.test")
        .unwrap()
        .unwrap();
    assert_eq!(account.id, created.user.id);
    assert!(repo
        .find_user_by_email("asha@schoolflow.test")
        .unwrap()
        .is_none());
}

#[test]
fn update_rejects_values_owned_by_another_student() {
    let conn = open_db_in_memory().unwrap();
    let roster = service(&conn);
    let asha = create(&roster, "Asha");
    create(&roster, "Bilal");
    let id = asha.student.id.to_string();

    let err = roster
        .update_student(
            &id,
            &StudentPatch {
                email: Some("bilal@schoolflow.test".to_string()),
                ..StudentPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, RosterServiceError::EmailInUse(_)));

    let err = roster
        .update_student(
            &id,
            &StudentPatch {
                roll_number: Some("ROLL-bilal".to_string()),
                ..StudentPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, RosterServiceError::RollNumberInUse(_)));

    let unchanged = roster
        .update_student(
            &id,
            &StudentPatch {
                email: Some("asha@schoolflow.test".to_string()),
                roll_number: Some("ROLL-asha".to_string()),
                ..StudentPatch::default()
            },
        )
        .unwrap();
    assert_eq!(unchanged, asha.student);
}

#[test]
fn unknown_or_malformed_ids_are_not_found() {
    let conn = open_db_in_memory().unwrap();
    let roster = service(&conn);

    for id in [Uuid::new_v4().to_string(), "abc".to_string()] {
        let err = roster
            .update_student(&id, &StudentPatch::default())
            .unwrap_err();
        assert!(matches!(err, RosterServiceError::StudentNotFound(_)));
        let err = roster.delete_student(&id).unwrap_err();
        assert!(matches!(err, RosterServiceError::StudentNotFound(_)));
    }

    let err = roster.student_for_user(Uuid::new_v4()).unwrap_err();
    assert!(matches!(err, RosterServiceError::ProfileNotFound(_)));
}

#[test]
fn delete_removes_student_and_account() {
    let conn = open_db_in_memory().unwrap();
    let roster = service(&conn);
    let created = create(&roster, "Asha");

    roster
        .delete_student(&created.student.id.to_string())
        .unwrap();

    let repo = SqliteRosterRepository::try_new(&conn).unwrap();
    assert!(repo.get_student(created.student.id).unwrap().is_none());
    let users: i64 = conn
        .query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(users, 0);
}

#[test]
fn roster_writes_join_an_open_transaction() {
    let conn = open_db_in_memory().unwrap();

    let tx = conn.unchecked_transaction().unwrap();
    let created = create(&service(&tx), "Asha");
    let renamed = service(&tx)
        .update_student(
            &created.student.id.to_string(),
            &StudentPatch {
                name: Some("Asha K".to_string()),
                ..StudentPatch::default()
            },
        )
        .unwrap();
    assert_eq!(renamed.name, "Asha K");
    let doomed = create(&service(&tx), "Bilal");
    service(&tx)
        .delete_student(&doomed.student.id.to_string())
        .unwrap();
    tx.commit().unwrap();

    let page = service(&conn).list_students(PageRequest::default()).unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.records[0].student.name, "Asha K");

    let tx = conn.unchecked_transaction().unwrap();
    create(&service(&tx), "Chen");
    tx.rollback().unwrap();
    let page = service(&conn).list_students(PageRequest::default()).unwrap();
    assert_eq!(page.total, 1);
}

#[test]
fn listing_is_ordered_by_name_and_paged() {
    let conn = open_db_in_memory().unwrap();
    let roster = service(&conn);
    for name in ["Chen", "Asha", "Dara", "Bilal"] {
        create(&roster, name);
    }

    let first = roster
        .list_students(PageRequest::new(Some(1), Some(3)))
        .unwrap();
    let names: Vec<&str> = first
        .records
        .iter()
        .map(|row| row.student.name.as_str())
        .collect();
    assert_eq!(names, ["Asha", "Bilal", "Chen"]);
    assert_eq!(first.total, 4);
    assert_eq!(first.total_pages, 2);
    assert!(first
        .records
        .iter()
        .all(|row| row.user.id == row.student.user_id && row.user.role == Role::Student));

    let second = roster
        .list_students(PageRequest::new(Some(2), Some(3)))
        .unwrap();
    assert_eq!(second.records.len(), 1);
    assert_eq!(second.records[0].student.name, "Dara");
}

#[test]
fn subjects_are_listed_by_name() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRosterRepository::try_new(&conn).unwrap();
    for name in ["MATHS", "ADA", "DBMS"] {
        repo.create_subject(&schoolflow_core::Subject {
            id: Uuid::new_v4(),
            name: name.to_string(),
            code: name.to_string(),
        })
        .unwrap();
    }

    let names: Vec<String> = RosterService::new(repo)
        .list_subjects()
        .unwrap()
        .into_iter()
        .map(|subject| subject.name)
        .collect();
    assert_eq!(names, ["ADA", "DBMS", "MATHS"]);
}
