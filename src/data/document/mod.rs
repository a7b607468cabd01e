use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod db;

pub static DOCUMENT_COLLECTION_NAME: &str = "documents";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, FromFormField,
)]
pub enum DocumentCategory {
    #[serde(rename = "Bài tập")]
    #[field(value = "Bài tập")]
    Exercise,
    #[serde(rename = "Đề giữa kỳ")]
    #[field(value = "Đề giữa kỳ")]
    MidtermExam,
    #[serde(rename = "Đề cuối kỳ")]
    #[field(value = "Đề cuối kỳ")]
    FinalExam,
}

impl DocumentCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentCategory::Exercise => "Bài tập",
            DocumentCategory::MidtermExam => "Đề giữa kỳ",
            DocumentCategory::FinalExam => "Đề cuối kỳ",
        }
    }
}

impl From<DocumentCategory> for bson::Bson {
    fn from(category: DocumentCategory) -> Self {
        bson::Bson::String(category.as_str().to_string())
    }
}

/// Metadata of a file shared with one or more classes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub id: Option<ObjectId>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub file_url: String,
    pub file_name: String,
    #[serde(default)]
    pub file_size: Option<i64>,
    #[serde(default)]
    pub mime_type: Option<String>,
    pub category: DocumentCategory,
    #[serde(default)]
    #[schema(value_type = Vec<String>)]
    pub classes: Vec<ObjectId>,
    #[schema(value_type = String)]
    pub uploaded_by: ObjectId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Document {
    /// Whether any of `class_ids` has access to the document.
    pub fn shared_with_any(&self, class_ids: &[ObjectId]) -> bool {
        self.classes.iter().any(|it| class_ids.contains(it))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_use_vietnamese_labels() {
        assert_eq!(
            serde_json::to_string(&DocumentCategory::Exercise).unwrap(),
            "\"Bài tập\""
        );
        let category: DocumentCategory = serde_json::from_str("\"Đề cuối kỳ\"").unwrap();
        assert_eq!(category, DocumentCategory::FinalExam);
        assert!(serde_json::from_str::<DocumentCategory>("\"FinalExam\"").is_err());
    }

    #[test]
    fn sharing_checks_class_overlap() {
        let shared = ObjectId::new();
        let document = Document {
            id: None,
            title: "Hợp âm cơ bản".to_string(),
            description: None,
            file_url: "/uploads/hop-am.pdf".to_string(),
            file_name: "hop-am.pdf".to_string(),
            file_size: Some(48_213),
            mime_type: Some("application/pdf".to_string()),
            category: DocumentCategory::Exercise,
            classes: vec![shared],
            uploaded_by: ObjectId::new(),
            created_at: None,
            updated_at: None,
        };

        assert!(document.shared_with_any(&[ObjectId::new(), shared]));
        assert!(!document.shared_with_any(&[ObjectId::new()]));
        assert!(!document.shared_with_any(&[]));
    }
}
