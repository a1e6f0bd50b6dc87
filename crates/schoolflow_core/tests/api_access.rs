use chrono::{FixedOffset, NaiveDate};
use schoolflow_core::db::open_db_in_memory;
use schoolflow_core::{
    seed_demo_data, AttendancePatch, CreateAttendanceInput, NewStudentInput, PageRequest,
    Principal, SchoolApi, StudentPatch,
};
use uuid::Uuid;

// 2024-01-10T12:00:00Z, a Wednesday.
const WEDNESDAY_NOON_MS: i64 = 1_704_888_000_000;

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

fn admin() -> Principal {
    Principal::admin("admin")
}

fn enrol(api: &SchoolApi<'_>, name: &str) -> schoolflow_core::CreatedStudent {
    let slug = name.to_lowercase();
    api.students_create(
        &admin(),
        &NewStudentInput {
            name: Some(name.to_string()),
            email: Some(format!("{slug}@schoolflow.test")),
            roll_number: Some(format!("ROLL-{slug}")),
        },
    )
    .unwrap()
}

#[test]
fn admin_endpoints_reject_students_with_403() {
    let conn = open_db_in_memory().unwrap();
    let api = SchoolApi::new(&conn, utc());
    let student = Principal::student(Uuid::new_v4().to_string());

    let err = api
        .attendance_list_all(&student, PageRequest::default())
        .unwrap_err();
    assert_eq!(err.status, 403);
    assert_eq!(err.message, "forbidden: admin only");

    let err = api
        .attendance_create(&student, &CreateAttendanceInput::default())
        .unwrap_err();
    assert_eq!(err.status, 403);
    assert_eq!(api.subjects_list(&student).unwrap_err().status, 403);
}

#[test]
fn student_endpoints_reject_admins_with_403() {
    let conn = open_db_in_memory().unwrap();
    let api = SchoolApi::new(&conn, utc());

    let err = api.my_attendance(&admin()).unwrap_err();
    assert_eq!(err.status, 403);
    assert_eq!(err.message, "forbidden: students only");
    let err = api
        .my_timetable_today(&admin(), WEDNESDAY_NOON_MS)
        .unwrap_err();
    assert_eq!(err.status, 403);
}

#[test]
fn attendance_errors_map_to_status_codes() {
    let conn = open_db_in_memory().unwrap();
    let api = SchoolApi::new(&conn, utc());
    seed_demo_data(&conn, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(), utc()).unwrap();

    let err = api
        .attendance_create(&admin(), &CreateAttendanceInput::default())
        .unwrap_err();
    assert_eq!((err.status, err.code), (400, "missing_field"));

    let err = api
        .attendance_update(&admin(), "nope", &AttendancePatch::default())
        .unwrap_err();
    assert_eq!((err.status, err.code), (404, "not_found"));
    assert_eq!(err.message, "Record not found");

    let err = api.attendance_delete(&admin(), "nope").unwrap_err();
    assert_eq!(err.status, 404);

    // Seeded days already hold one row per pair; three more fill the cap.
    let page = api
        .attendance_list_all(&admin(), PageRequest::new(Some(1), Some(1)))
        .unwrap();
    let newest = &page.records[0].record;
    let input = |minute: u32| CreateAttendanceInput {
        student_id: Some(newest.student_id.to_string()),
        subject_id: Some(newest.subject_id.to_string()),
        date: Some(format!("2024-01-10T10:{minute:02}:00Z")),
        status: Some("ABSENT".to_string()),
    };
    for minute in 0..3 {
        api.attendance_create(&admin(), &input(minute)).unwrap();
    }
    let err = api.attendance_create(&admin(), &input(30)).unwrap_err();
    assert_eq!((err.status, err.code), (400, "limit_exceeded"));
    assert!(err.message.contains("maximum 4"));
}

#[test]
fn admin_can_manage_roster_and_attendance_end_to_end() {
    let conn = open_db_in_memory().unwrap();
    let api = SchoolApi::new(&conn, utc());
    seed_demo_data(&conn, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(), utc()).unwrap();

    let created = enrol(&api, "Asha");
    let subject = api.subjects_list(&admin()).unwrap().remove(0);
    assert_eq!(subject.name, "ADA");

    let record = api
        .attendance_create(
            &admin(),
            &CreateAttendanceInput {
                student_id: Some(created.student.id.to_string()),
                subject_id: Some(subject.id.to_string()),
                date: Some("2024-01-10T09:00:00Z".to_string()),
                status: Some("PRESENT".to_string()),
            },
        )
        .unwrap();

    let detail = api
        .attendance_update(
            &admin(),
            &record.id.to_string(),
            &AttendancePatch {
                status: Some("ABSENT".to_string()),
                ..AttendancePatch::default()
            },
        )
        .unwrap();
    assert_eq!(detail.subject, subject);
    assert_eq!(detail.student.as_ref().map(|s| s.id), Some(created.student.id));

    let listed = api
        .attendance_list_by_student(&admin(), &created.student.id.to_string())
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert!(api
        .attendance_list_by_student(&admin(), "not-a-uuid")
        .unwrap()
        .is_empty());

    let err = api
        .students_update(
            &admin(),
            &created.student.id.to_string(),
            &StudentPatch {
                email: Some("student1@schoolflow.com".to_string()),
                ..StudentPatch::default()
            },
        )
        .unwrap_err();
    assert_eq!((err.status, err.code), (400, "email_in_use"));

    api.attendance_delete(&admin(), &record.id.to_string())
        .unwrap();
    api.students_delete(&admin(), &created.student.id.to_string())
        .unwrap();
    let err = api
        .students_delete(&admin(), &created.student.id.to_string())
        .unwrap_err();
    assert_eq!(err.status, 404);
    assert_eq!(err.message, "Student not found");
}

#[test]
fn student_sees_own_attendance_only() {
    let conn = open_db_in_memory().unwrap();
    let api = SchoolApi::new(&conn, utc());
    seed_demo_data(&conn, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(), utc()).unwrap();

    let students = api
        .students_list(&admin(), PageRequest::new(Some(1), Some(1)))
        .unwrap();
    let owner = &students.records[0];
    let principal = Principal::student(owner.user.id.to_string());

    let mine = api.my_attendance(&principal).unwrap();
    assert_eq!(mine.student.id, owner.student.id);
    // 20 days x 4 subjects
    assert_eq!(mine.records.len(), 80);
    assert!(mine
        .records
        .iter()
        .all(|detail| detail.record.student_id == owner.student.id));

    let stranger = Principal::student(Uuid::new_v4().to_string());
    let err = api.my_attendance(&stranger).unwrap_err();
    assert_eq!(err.status, 404);
    assert_eq!(err.message, "Student profile not found");
}

#[test]
fn todays_timetable_follows_the_weekday() {
    let conn = open_db_in_memory().unwrap();
    let api = SchoolApi::new(&conn, utc());
    seed_demo_data(&conn, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(), utc()).unwrap();
    let principal = Principal::student(Uuid::new_v4().to_string());

    let wednesday = api
        .my_timetable_today(&principal, WEDNESDAY_NOON_MS)
        .unwrap();
    assert_eq!(wednesday.len(), 4);
    assert_eq!(wednesday[0].start_time, "9:00 AM");
    assert_eq!(wednesday[3].start_time, "2:00 PM");
    assert!(wednesday
        .windows(2)
        .all(|pair| pair[0].start_minute <= pair[1].start_minute));

    // Sunday 2024-01-14 has no classes.
    let sunday_ms = WEDNESDAY_NOON_MS + 4 * 86_400_000;
    assert!(api
        .my_timetable_today(&principal, sunday_ms)
        .unwrap()
        .is_empty());
}

#[test]
fn api_errors_serialize_with_error_message() {
    let conn = open_db_in_memory().unwrap();
    let api = SchoolApi::new(&conn, utc());

    let err = api.my_attendance(&admin()).unwrap_err();
    let json = serde_json::to_value(&err).unwrap();
    assert_eq!(json["error"], "forbidden: students only");
    assert_eq!(json["code"], "forbidden");
    assert!(json.get("status").is_none());
}
