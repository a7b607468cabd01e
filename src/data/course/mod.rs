use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::resp::problem::{problems, Problem};

pub mod db;

pub static COURSE_COLLECTION_NAME: &str = "courses";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum CourseType {
    #[serde(rename = "1-1")]
    OneOnOne,
    #[serde(rename = "1-2")]
    OneOnTwo,
    #[serde(rename = "group")]
    Group,
}

impl CourseType {
    /// Largest roster the course type allows, `None` for groups.
    pub fn capacity(self) -> Option<u32> {
        match self {
            CourseType::OneOnOne => Some(1),
            CourseType::OneOnTwo => Some(2),
            CourseType::Group => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CourseFormat {
    Online,
    Offline,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub id: Option<ObjectId>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub course_type: CourseType,
    pub format: CourseFormat,
    pub max_students: u32,
    pub total_sessions: u32,
    #[serde(default)]
    pub price: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Course {
    pub fn validate(&self) -> Result<(), Problem> {
        if self.name.trim().is_empty() {
            return Err(problems::bad_request("Bad course.", "Course name can't be empty."));
        }
        if self.max_students < 1 {
            return Err(problems::bad_request(
                "Bad course.",
                "A course needs room for at least one student.",
            ));
        }
        if let Some(capacity) = self.course_type.capacity() {
            let allowed = match self.course_type {
                CourseType::OneOnOne => self.max_students == capacity,
                _ => self.max_students <= capacity,
            };
            if !allowed {
                return Err(problems::bad_request(
                    "Bad course.",
                    format!(
                        "A course of this type can't take {} students.",
                        self.max_students
                    ),
                ));
            }
        }
        if self.total_sessions < 1 {
            return Err(problems::bad_request(
                "Bad course.",
                "A course needs at least one session.",
            ));
        }
        if matches!(self.price, Some(price) if price < 0.0) {
            return Err(problems::bad_request("Bad course.", "Price can't be negative."));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(course_type: CourseType, max_students: u32) -> Course {
        Course {
            id: None,
            name: "Guitar cơ bản".to_string(),
            description: None,
            course_type,
            format: CourseFormat::Offline,
            max_students,
            total_sessions: 12,
            price: Some(2_400_000.0),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn course_type_wire_names() {
        assert_eq!(serde_json::to_string(&CourseType::OneOnOne).unwrap(), "\"1-1\"");
        assert_eq!(serde_json::to_string(&CourseType::OneOnTwo).unwrap(), "\"1-2\"");
        assert_eq!(serde_json::to_string(&CourseType::Group).unwrap(), "\"group\"");
        assert_eq!(
            serde_json::from_str::<CourseFormat>("\"online\"").unwrap(),
            CourseFormat::Online
        );
    }

    #[test]
    fn course_document_uses_type_key() {
        let document = bson::to_document(&course(CourseType::Group, 8)).unwrap();
        assert_eq!(document.get_str("type").unwrap(), "group");
        assert_eq!(document.get_i64("maxStudents").unwrap_or_else(|_| {
            document.get_i32("maxStudents").unwrap() as i64
        }), 8);
        assert!(!document.contains_key("_id"));
    }

    #[test]
    fn roster_size_must_fit_course_type() {
        assert!(course(CourseType::OneOnOne, 1).validate().is_ok());
        assert!(course(CourseType::OneOnOne, 2).validate().is_err());
        assert!(course(CourseType::OneOnTwo, 2).validate().is_ok());
        assert!(course(CourseType::OneOnTwo, 1).validate().is_ok());
        assert!(course(CourseType::OneOnTwo, 3).validate().is_err());
        assert!(course(CourseType::Group, 10).validate().is_ok());
        assert!(course(CourseType::Group, 0).validate().is_err());
    }

    #[test]
    fn sessions_and_price_are_checked() {
        let mut c = course(CourseType::Group, 6);
        c.total_sessions = 0;
        assert!(c.validate().is_err());

        let mut c = course(CourseType::Group, 6);
        c.price = Some(-1.0);
        assert!(c.validate().is_err());
    }
}
