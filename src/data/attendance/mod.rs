use bson::oid::ObjectId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod db;

pub static ATTENDANCE_COLLECTION_NAME: &str = "attendance";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Excused,
    Makeup,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Excused => "excused",
            AttendanceStatus::Makeup => "makeup",
        }
    }
}

impl From<AttendanceStatus> for bson::Bson {
    fn from(status: AttendanceStatus) -> Self {
        bson::Bson::String(status.as_str().to_string())
    }
}

/// One student's presence at one session of a class.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub id: Option<ObjectId>,
    #[schema(value_type = String)]
    pub student_id: ObjectId,
    #[schema(value_type = String)]
    pub class_id: ObjectId,
    #[schema(value_type = String, format = Date)]
    pub session_date: NaiveDate,
    pub status: AttendanceStatus,
    #[schema(value_type = String)]
    pub marked_by: ObjectId,
    #[serde(default)]
    pub note: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_are_lowercase() {
        assert_eq!(
            serde_json::to_string(&AttendanceStatus::Excused).unwrap(),
            "\"excused\""
        );
        assert_eq!(
            bson::Bson::from(AttendanceStatus::Makeup),
            bson::Bson::String("makeup".to_string())
        );
        assert!(serde_json::from_str::<AttendanceStatus>("\"late\"").is_err());
    }
}
