use bson::oid::ObjectId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::data::attendance::{Attendance, AttendanceStatus};

pub mod db;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, FromFormField,
)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    #[field(value = "pending")]
    Pending,
    #[field(value = "approved")]
    Approved,
    #[field(value = "rejected")]
    Rejected,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }
}

impl From<RequestStatus> for bson::Bson {
    fn from(status: RequestStatus) -> Self {
        bson::Bson::String(status.as_str().to_string())
    }
}

/// Absence and makeup requests share a shape but live in separate collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Absence,
    Makeup,
}

impl RequestKind {
    pub fn collection(self) -> &'static str {
        match self {
            RequestKind::Absence => "absenceRequest",
            RequestKind::Makeup => "makeupRequest",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            RequestKind::Absence => "Absence request",
            RequestKind::Makeup => "Makeup request",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentRequest {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub id: Option<ObjectId>,
    #[schema(value_type = String)]
    pub student_id: ObjectId,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub enrollment_id: Option<ObjectId>,
    #[schema(value_type = String)]
    pub class_id: ObjectId,
    #[schema(value_type = String, format = Date)]
    pub session_date: NaiveDate,
    #[serde(default)]
    pub reason: Option<String>,
    pub status: RequestStatus,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub reviewed_by: Option<ObjectId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub makeup_class_id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = Date)]
    pub makeup_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl StudentRequest {
    /// Attendance an approved request of `kind` results in.
    ///
    /// Absences excuse the original session. Makeups are recorded on the makeup class and
    /// date, falling back to the original ones.
    pub fn approval_attendance(&self, kind: RequestKind, marked_by: ObjectId) -> Attendance {
        let (class_id, session_date, status) = match kind {
            RequestKind::Absence => (self.class_id, self.session_date, AttendanceStatus::Excused),
            RequestKind::Makeup => (
                self.makeup_class_id.unwrap_or(self.class_id),
                self.makeup_date.unwrap_or(self.session_date),
                AttendanceStatus::Makeup,
            ),
        };

        Attendance {
            id: None,
            student_id: self.student_id,
            class_id,
            session_date,
            status,
            marked_by,
            note: self.reason.clone(),
            created_at: None,
            updated_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> StudentRequest {
        StudentRequest {
            id: Some(ObjectId::new()),
            student_id: ObjectId::new(),
            enrollment_id: None,
            class_id: ObjectId::new(),
            session_date: NaiveDate::from_ymd_opt(2024, 11, 5).unwrap(),
            reason: Some("Ốm".to_string()),
            status: RequestStatus::Pending,
            reviewed_by: None,
            makeup_class_id: None,
            makeup_date: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn approved_absence_excuses_the_session() {
        let request = request();
        let teacher = ObjectId::new();
        let attendance = request.approval_attendance(RequestKind::Absence, teacher);

        assert_eq!(attendance.status, AttendanceStatus::Excused);
        assert_eq!(attendance.class_id, request.class_id);
        assert_eq!(attendance.session_date, request.session_date);
        assert_eq!(attendance.marked_by, teacher);
    }

    #[test]
    fn approved_makeup_uses_makeup_session() {
        let mut request = request();
        let makeup_class = ObjectId::new();
        let makeup_date = NaiveDate::from_ymd_opt(2024, 11, 9).unwrap();

        let fallback = request.approval_attendance(RequestKind::Makeup, ObjectId::new());
        assert_eq!(fallback.status, AttendanceStatus::Makeup);
        assert_eq!(fallback.class_id, request.class_id);

        request.makeup_class_id = Some(makeup_class);
        request.makeup_date = Some(makeup_date);
        let attendance = request.approval_attendance(RequestKind::Makeup, ObjectId::new());
        assert_eq!(attendance.class_id, makeup_class);
        assert_eq!(attendance.session_date, makeup_date);
    }

    #[test]
    fn absence_documents_omit_makeup_fields() {
        let document = bson::to_document(&request()).unwrap();

        assert_eq!(document.get_str("status").unwrap(), "pending");
        assert_eq!(document.get_str("sessionDate").unwrap(), "2024-11-05");
        assert!(!document.contains_key("makeupClassId"));
        assert_eq!(RequestKind::Makeup.collection(), "makeupRequest");
    }
}
