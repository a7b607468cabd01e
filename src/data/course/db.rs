use bson::oid::ObjectId;
use bson::{doc, Document};
use chrono::Utc;
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::Database;
use serde::Deserialize;
use utoipa::ToSchema;

use super::{Course, CourseFormat, CourseType, COURSE_COLLECTION_NAME};
use crate::data::{collect, filter, inserted_id};
use crate::resp::problem::Problem;

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseData {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub course_type: CourseType,
    pub format: CourseFormat,
    /// Defaults to the course type's capacity, or 10 for groups.
    #[serde(default)]
    pub max_students: Option<u32>,
    #[serde(default)]
    pub total_sessions: Option<u32>,
    #[serde(default)]
    pub price: Option<f64>,
}

const DEFAULT_GROUP_SIZE: u32 = 10;

impl CourseData {
    pub fn into_course(self) -> Result<Course, Problem> {
        let now = Utc::now();
        let course = Course {
            id: None,
            name: self.name,
            description: self.description,
            max_students: self
                .max_students
                .or_else(|| self.course_type.capacity())
                .unwrap_or(DEFAULT_GROUP_SIZE),
            course_type: self.course_type,
            format: self.format,
            total_sessions: self
                .total_sessions
                .unwrap_or(crate::session::DEFAULT_TOTAL_SESSIONS as u32),
            price: self.price,
            created_at: Some(now),
            updated_at: Some(now),
        };
        course.validate()?;
        Ok(course)
    }
}

fn course_update(course: &Course) -> Result<Document, Problem> {
    let mut set = bson::to_document(course)?;
    set.remove("createdAt");
    Ok(doc! { "$set": set })
}

#[allow(async_fn_in_trait)]
pub trait CourseDbExt {
    async fn create_course(&self, course: Course) -> Result<Course, Problem>;

    async fn get_course(&self, id: ObjectId) -> Result<Option<Course>, Problem>;

    async fn list_courses(&self) -> Result<Vec<Course>, Problem>;

    async fn replace_course(&self, id: ObjectId, course: Course) -> Result<Option<Course>, Problem>;
}

impl CourseDbExt for Database {
    async fn create_course(&self, mut course: Course) -> Result<Course, Problem> {
        let result = self
            .collection::<Course>(COURSE_COLLECTION_NAME)
            .insert_one(&course, None)
            .await?;
        course.id = inserted_id(&result);

        tracing::info!("Created course '{}'", course.name);
        Ok(course)
    }

    async fn get_course(&self, id: ObjectId) -> Result<Option<Course>, Problem> {
        self.collection(COURSE_COLLECTION_NAME)
            .find_one(filter::by_id(id), None)
            .await
            .map_err(Problem::from)
    }

    async fn list_courses(&self) -> Result<Vec<Course>, Problem> {
        let cursor = self
            .collection::<Course>(COURSE_COLLECTION_NAME)
            .find(doc! {}, FindOptions::builder().sort(doc! { "name": 1 }).build())
            .await?;

        collect(cursor).await
    }

    async fn replace_course(&self, id: ObjectId, course: Course) -> Result<Option<Course>, Problem> {
        self.collection::<Course>(COURSE_COLLECTION_NAME)
            .find_one_and_update(
                filter::by_id(id),
                course_update(&course)?,
                FindOneAndUpdateOptions::builder()
                    .return_document(ReturnDocument::After)
                    .build(),
            )
            .await
            .map_err(Problem::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(course_type: CourseType) -> CourseData {
        serde_json::from_value(serde_json::json!({
            "name": "Fingerstyle",
            "type": course_type,
            "format": "online",
        }))
        .unwrap()
    }

    #[test]
    fn roster_defaults_follow_course_type() {
        assert_eq!(data(CourseType::OneOnOne).into_course().unwrap().max_students, 1);
        assert_eq!(data(CourseType::OneOnTwo).into_course().unwrap().max_students, 2);
        assert_eq!(
            data(CourseType::Group).into_course().unwrap().max_students,
            DEFAULT_GROUP_SIZE
        );
        assert_eq!(data(CourseType::Group).into_course().unwrap().total_sessions, 12);
    }

    #[test]
    fn invalid_roster_is_rejected() {
        let mut data = data(CourseType::OneOnTwo);
        data.max_students = Some(4);
        assert!(data.into_course().is_err());
    }

    #[test]
    fn update_keeps_creation_time() {
        let course = data(CourseType::Group).into_course().unwrap();
        let update = course_update(&course).unwrap();
        let set = update.get_document("$set").unwrap();

        assert!(!set.contains_key("createdAt"));
        assert!(set.contains_key("updatedAt"));
        assert_eq!(set.get_str("name").unwrap(), "Fingerstyle");
    }
}
