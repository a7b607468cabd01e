use bson::oid::ObjectId;
use bson::{doc, Document};
use chrono::{NaiveDate, Utc};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::Database;
use rocket::http::Status;
use serde::Deserialize;
use utoipa::ToSchema;

use super::{Attendance, AttendanceStatus, ATTENDANCE_COLLECTION_NAME};
use crate::data::class::db::problem::not_enrolled;
use crate::data::class::Class;
use crate::data::{collect, filter, parse_id};
use crate::resp::problem::{problems, Problem};

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceData {
    pub student_id: String,
    pub class_id: String,
    #[schema(value_type = String, format = Date)]
    pub session_date: NaiveDate,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub note: Option<String>,
}

impl AttendanceData {
    pub fn into_attendance(self, marked_by: ObjectId) -> Result<Attendance, Problem> {
        Ok(Attendance {
            id: None,
            student_id: parse_id("studentId", &self.student_id)?,
            class_id: parse_id("classId", &self.class_id)?,
            session_date: self.session_date,
            status: self.status,
            marked_by,
            note: self.note,
            created_at: None,
            updated_at: None,
        })
    }
}

/// Checks that `record` describes a session the student can attend in `class`.
pub fn check_session(class: &Class, record: &Attendance) -> Result<(), Problem> {
    if !class.is_enrolled(record.student_id) {
        return Err(not_enrolled(record.student_id));
    }

    if class.is_cancelled(record.session_date) {
        return Err(problems::conflict(
            "Session was cancelled.",
            format!("The class doesn't meet on {}.", record.session_date),
        ));
    }

    if record.status != AttendanceStatus::Makeup && !class.meets_on(record.session_date) {
        return Err(problems::bad_request(
            "No session on that date.",
            format!(
                "The class has no session on {} ({}).",
                record.session_date,
                record.session_date.format("%A")
            ),
        ));
    }

    Ok(())
}

fn session_key(student_id: ObjectId, class_id: ObjectId, date: NaiveDate) -> Document {
    doc! {
        "studentId": student_id,
        "classId": class_id,
        "sessionDate": date.format("%Y-%m-%d").to_string(),
    }
}

fn mark_update(record: &Attendance) -> Document {
    let now = Utc::now().to_rfc3339();
    doc! {
        "$set": {
            "status": record.status,
            "markedBy": record.marked_by,
            "note": record.note.clone(),
            "updatedAt": now.clone(),
        },
        "$setOnInsert": { "createdAt": now },
    }
}

#[allow(async_fn_in_trait)]
pub trait AttendanceDbExt {
    /// Inserts or overwrites the record for the record's (student, class, date).
    async fn mark_attendance(&self, record: Attendance) -> Result<Attendance, Problem>;

    async fn list_attendance(
        &self,
        class_id: Option<ObjectId>,
        student_id: Option<ObjectId>,
    ) -> Result<Vec<Attendance>, Problem>;
}

impl AttendanceDbExt for Database {
    async fn mark_attendance(&self, record: Attendance) -> Result<Attendance, Problem> {
        let marked = self
            .collection::<Attendance>(ATTENDANCE_COLLECTION_NAME)
            .find_one_and_update(
                session_key(record.student_id, record.class_id, record.session_date),
                mark_update(&record),
                FindOneAndUpdateOptions::builder()
                    .upsert(true)
                    .return_document(ReturnDocument::After)
                    .build(),
            )
            .await?
            .ok_or_else(|| {
                Problem::new_untyped(Status::InternalServerError, "Attendance wasn't stored.")
            })?;

        tracing::info!(
            "Marked {} as {} on {}",
            marked.student_id,
            marked.status.as_str(),
            marked.session_date
        );
        Ok(marked)
    }

    async fn list_attendance(
        &self,
        class_id: Option<ObjectId>,
        student_id: Option<ObjectId>,
    ) -> Result<Vec<Attendance>, Problem> {
        let query = filter::with_optional(doc! {}, "classId", class_id);
        let query = filter::with_optional(query, "studentId", student_id);

        let cursor = self
            .collection::<Attendance>(ATTENDANCE_COLLECTION_NAME)
            .find(
                query,
                FindOptions::builder()
                    .sort(doc! { "sessionDate": -1 })
                    .build(),
            )
            .await?;

        collect(cursor).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::class::ClassSession;

    fn class(student: ObjectId) -> Class {
        Class {
            id: Some(ObjectId::new()),
            name: "Thứ Năm".to_string(),
            course_id: ObjectId::new(),
            teacher_id: None,
            sessions: vec![ClassSession {
                day_of_week: 4,
                start_time: "19:00".to_string(),
                end_time: "20:30".to_string(),
            }],
            enrolled_students: vec![student],
            cancelled_dates: vec![NaiveDate::from_ymd_opt(2024, 10, 24).unwrap()],
            start_date: NaiveDate::from_ymd_opt(2024, 9, 5),
            session_cycle: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn record(student: ObjectId, class: &Class, date: NaiveDate, status: AttendanceStatus) -> Attendance {
        AttendanceData {
            student_id: student.to_hex(),
            class_id: class.id.unwrap().to_hex(),
            session_date: date,
            status,
            note: None,
        }
        .into_attendance(ObjectId::new())
        .unwrap()
    }

    #[test]
    fn sessions_are_checked_against_the_class() {
        let student = ObjectId::new();
        let class = class(student);
        let thursday = NaiveDate::from_ymd_opt(2024, 10, 17).unwrap();
        let friday = NaiveDate::from_ymd_opt(2024, 10, 18).unwrap();
        let cancelled = NaiveDate::from_ymd_opt(2024, 10, 24).unwrap();

        assert!(check_session(&class, &record(student, &class, thursday, AttendanceStatus::Present)).is_ok());
        assert!(check_session(&class, &record(student, &class, friday, AttendanceStatus::Present)).is_err());
        assert!(check_session(&class, &record(student, &class, friday, AttendanceStatus::Makeup)).is_ok());

        let err = check_session(&class, &record(student, &class, cancelled, AttendanceStatus::Absent))
            .unwrap_err();
        assert_eq!(err.status, Status::Conflict);

        let stranger = ObjectId::new();
        let err = check_session(&class, &record(stranger, &class, thursday, AttendanceStatus::Present))
            .unwrap_err();
        assert_eq!(err.status, Status::BadRequest);
        assert_eq!(err.body["studentId"], stranger.to_hex());
    }

    #[test]
    fn marking_upserts_by_session_key() {
        let student = ObjectId::new();
        let class = class(student);
        let date = NaiveDate::from_ymd_opt(2024, 10, 17).unwrap();
        let record = record(student, &class, date, AttendanceStatus::Excused);

        let key = session_key(record.student_id, record.class_id, record.session_date);
        assert_eq!(key.get_str("sessionDate").unwrap(), "2024-10-17");

        let update = mark_update(&record);
        assert_eq!(update.get_document("$set").unwrap().get_str("status").unwrap(), "excused");
        assert!(update.get_document("$setOnInsert").unwrap().contains_key("createdAt"));
    }
}
