use bson::oid::ObjectId;
use bson::{doc, Document};
use chrono::{NaiveDate, Utc};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::Database;
use serde::Deserialize;
use utoipa::ToSchema;

use super::{Class, ClassSession, CLASS_COLLECTION_NAME};
use crate::data::{collect, filter, inserted_id, parse_id};
use crate::resp::problem::{problems, Problem};

pub mod problem {
    use crate::resp::problem::Problem;
    use rocket::http::Status;

    #[inline]
    pub fn not_found(id: impl ToString) -> Problem {
        Problem::new_untyped(Status::NotFound, "Class doesn't exist.")
            .insert_str("id", id)
            .to_owned()
    }

    #[inline]
    pub fn class_full(capacity: u32) -> Problem {
        Problem::new_untyped(Status::Conflict, "Class is full.")
            .insert("capacity", capacity)
            .to_owned()
    }

    #[inline]
    pub fn not_enrolled(student_id: impl ToString) -> Problem {
        Problem::new_untyped(Status::BadRequest, "Student isn't enrolled in the class.")
            .insert_str("studentId", student_id)
            .to_owned()
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassData {
    pub name: String,
    pub course_id: String,
    #[serde(default)]
    pub teacher_id: Option<String>,
    #[serde(default)]
    pub sessions: Vec<ClassSession>,
    #[serde(default)]
    #[schema(value_type = Option<String>, format = Date)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub session_cycle: Option<i64>,
}

impl ClassData {
    pub fn into_class(self) -> Result<Class, Problem> {
        if self.name.trim().is_empty() {
            return Err(problems::bad_request("Bad class.", "Class name can't be empty."));
        }
        for session in &self.sessions {
            session.validate()?;
        }
        if matches!(self.session_cycle, Some(cycle) if cycle < 1) {
            return Err(problems::bad_request(
                "Bad class.",
                "Session cycle must be at least 1.",
            ));
        }

        let now = Utc::now();
        Ok(Class {
            id: None,
            name: self.name,
            course_id: parse_id("courseId", &self.course_id)?,
            teacher_id: self
                .teacher_id
                .as_deref()
                .map(|it| parse_id("teacherId", it))
                .transpose()?,
            sessions: self.sessions,
            enrolled_students: vec![],
            cancelled_dates: vec![],
            start_date: self.start_date,
            session_cycle: self.session_cycle,
            created_at: Some(now),
            updated_at: Some(now),
        })
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrollData {
    pub student_id: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CancellationData {
    #[schema(value_type = String, format = Date)]
    pub date: NaiveDate,
}

/// `$set` for the schedule fields of `class`, leaving the roster and cancellations alone.
fn schedule_update(class: &Class) -> Result<Document, Problem> {
    Ok(doc! {
        "$set": {
            "name": class.name.clone(),
            "courseId": class.course_id,
            "teacherId": class.teacher_id,
            "sessions": bson::to_bson(&class.sessions)?,
            "startDate": bson::to_bson(&class.start_date)?,
            "sessionCycle": class.session_cycle,
            "updatedAt": Utc::now().to_rfc3339(),
        }
    })
}

fn after_update() -> FindOneAndUpdateOptions {
    FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build()
}

#[allow(async_fn_in_trait)]
pub trait ClassDbExt {
    async fn create_class(&self, class: Class) -> Result<Class, Problem>;

    async fn get_class(&self, id: ObjectId) -> Result<Option<Class>, Problem>;

    /// Classes of `course_id` (all courses when `None`), limited to those `student_id` is enrolled in.
    async fn list_classes(
        &self,
        course_id: Option<ObjectId>,
        student_id: Option<ObjectId>,
    ) -> Result<Vec<Class>, Problem>;

    async fn update_class_schedule(&self, id: ObjectId, class: &Class) -> Result<Option<Class>, Problem>;

    /// Adds `student_id` to the roster unless it already holds `capacity` students.
    async fn enroll_student(
        &self,
        class: Class,
        student_id: ObjectId,
        capacity: u32,
    ) -> Result<Class, Problem>;

    async fn remove_student(&self, id: ObjectId, student_id: ObjectId) -> Result<Option<Class>, Problem>;

    async fn cancel_session(&self, id: ObjectId, date: NaiveDate) -> Result<Option<Class>, Problem>;
}

impl ClassDbExt for Database {
    async fn create_class(&self, mut class: Class) -> Result<Class, Problem> {
        let result = self
            .collection::<Class>(CLASS_COLLECTION_NAME)
            .insert_one(&class, None)
            .await?;
        class.id = inserted_id(&result);

        tracing::info!("Created class '{}'", class.name);
        Ok(class)
    }

    async fn get_class(&self, id: ObjectId) -> Result<Option<Class>, Problem> {
        self.collection(CLASS_COLLECTION_NAME)
            .find_one(filter::by_id(id), None)
            .await
            .map_err(Problem::from)
    }

    async fn list_classes(
        &self,
        course_id: Option<ObjectId>,
        student_id: Option<ObjectId>,
    ) -> Result<Vec<Class>, Problem> {
        let query = filter::with_optional(doc! {}, "courseId", course_id);
        let query = filter::with_optional(query, "enrolledStudents", student_id);

        let cursor = self
            .collection::<Class>(CLASS_COLLECTION_NAME)
            .find(query, FindOptions::builder().sort(doc! { "name": 1 }).build())
            .await?;

        collect(cursor).await
    }

    async fn update_class_schedule(&self, id: ObjectId, class: &Class) -> Result<Option<Class>, Problem> {
        self.collection::<Class>(CLASS_COLLECTION_NAME)
            .find_one_and_update(filter::by_id(id), schedule_update(class)?, after_update())
            .await
            .map_err(Problem::from)
    }

    async fn enroll_student(
        &self,
        class: Class,
        student_id: ObjectId,
        capacity: u32,
    ) -> Result<Class, Problem> {
        if class.is_enrolled(student_id) {
            return Ok(class);
        }
        if class.enrolled_students.len() >= capacity as usize {
            return Err(problem::class_full(capacity));
        }
        let id = class.id.ok_or_else(|| problem::not_found("none"))?;

        let updated = self
            .collection::<Class>(CLASS_COLLECTION_NAME)
            .find_one_and_update(
                filter::by_id(id),
                doc! {
                    "$addToSet": { "enrolledStudents": student_id },
                    "$set": { "updatedAt": Utc::now().to_rfc3339() },
                },
                after_update(),
            )
            .await?
            .ok_or_else(|| problem::not_found(id))?;

        tracing::info!("Enrolled {} in class '{}'", student_id, updated.name);
        Ok(updated)
    }

    async fn remove_student(&self, id: ObjectId, student_id: ObjectId) -> Result<Option<Class>, Problem> {
        self.collection::<Class>(CLASS_COLLECTION_NAME)
            .find_one_and_update(
                filter::by_id(id),
                doc! {
                    "$pull": { "enrolledStudents": student_id },
                    "$set": { "updatedAt": Utc::now().to_rfc3339() },
                },
                after_update(),
            )
            .await
            .map_err(Problem::from)
    }

    async fn cancel_session(&self, id: ObjectId, date: NaiveDate) -> Result<Option<Class>, Problem> {
        self.collection::<Class>(CLASS_COLLECTION_NAME)
            .find_one_and_update(
                filter::by_id(id),
                doc! {
                    "$addToSet": { "cancelledDates": bson::to_bson(&date)? },
                    "$set": { "updatedAt": Utc::now().to_rfc3339() },
                },
                after_update(),
            )
            .await
            .map_err(Problem::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::http::Status;

    fn data() -> ClassData {
        ClassData {
            name: "Nhóm cuối tuần".to_string(),
            course_id: ObjectId::new().to_hex(),
            teacher_id: None,
            sessions: vec![ClassSession {
                day_of_week: 0,
                start_time: "09:00".to_string(),
                end_time: "11:00".to_string(),
            }],
            start_date: NaiveDate::from_ymd_opt(2024, 9, 1),
            session_cycle: Some(4),
        }
    }

    #[test]
    fn class_data_is_validated() {
        assert!(data().into_class().is_ok());

        let mut bad_course = data();
        bad_course.course_id = "course".to_string();
        let err = bad_course.into_class().unwrap_err();
        assert_eq!(err.status, Status::BadRequest);
        assert_eq!(err.body["field"], "courseId");

        let mut bad_cycle = data();
        bad_cycle.session_cycle = Some(0);
        assert!(bad_cycle.into_class().is_err());

        let mut bad_session = data();
        bad_session.sessions[0].end_time = "08:00".to_string();
        assert!(bad_session.into_class().is_err());
    }

    #[test]
    fn schedule_update_leaves_roster_alone() {
        let class = data().into_class().unwrap();
        let update = schedule_update(&class).unwrap();
        let set = update.get_document("$set").unwrap();

        assert_eq!(set.get_str("startDate").unwrap(), "2024-09-01");
        assert_eq!(set.get_i64("sessionCycle").unwrap(), 4);
        assert!(!set.contains_key("enrolledStudents"));
        assert!(!set.contains_key("cancelledDates"));
    }

    fn class_with(enrolled: Vec<ObjectId>) -> Class {
        let mut class = data().into_class().unwrap();
        class.id = Some(ObjectId::new());
        class.enrolled_students = enrolled;
        class
    }

    #[tokio::test]
    async fn enrolling_twice_keeps_the_roster() {
        let db = crate::route::test_util::database().await;
        let student = ObjectId::new();

        let class = db
            .enroll_student(class_with(vec![student]), student, 1)
            .await
            .unwrap();
        assert_eq!(class.enrolled_students, vec![student]);
    }

    #[tokio::test]
    async fn full_class_refuses_new_students() {
        let db = crate::route::test_util::database().await;

        let err = db
            .enroll_student(class_with(vec![ObjectId::new(), ObjectId::new()]), ObjectId::new(), 2)
            .await
            .unwrap_err();
        assert_eq!(err.status, Status::Conflict);
        assert_eq!(err.title, "Class is full.");
        assert_eq!(err.body["capacity"], 2);
    }

    #[test]
    fn enroll_data_uses_camel_case() {
        let id = ObjectId::new().to_hex();
        let data: EnrollData =
            serde_json::from_value(serde_json::json!({ "studentId": id })).unwrap();
        assert_eq!(data.student_id, id);
    }
}
