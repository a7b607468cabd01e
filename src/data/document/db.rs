use bson::doc;
use bson::oid::ObjectId;
use chrono::Utc;
use mongodb::options::FindOptions;
use mongodb::Database;
use serde::Deserialize;
use utoipa::ToSchema;

use super::{Document, DocumentCategory, DOCUMENT_COLLECTION_NAME};
use crate::data::{collect, filter, inserted_id, parse_ids};
use crate::resp::problem::{problems, Problem};

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentData {
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
    pub classes: Vec<String>,
}

impl DocumentData {
    pub fn into_document(self, uploaded_by: ObjectId) -> Result<Document, Problem> {
        if self.title.trim().is_empty() {
            return Err(problems::bad_request("Bad document.", "Title can't be empty."));
        }
        if self.file_url.trim().is_empty() {
            return Err(problems::bad_request("Bad document.", "File URL can't be empty."));
        }
        if matches!(self.file_size, Some(size) if size < 0) {
            return Err(problems::bad_request("Bad document.", "File size can't be negative."));
        }

        let now = Utc::now();
        Ok(Document {
            id: None,
            classes: parse_ids("classes", &self.classes)?,
            title: self.title,
            description: self.description,
            file_url: self.file_url,
            file_name: self.file_name,
            file_size: self.file_size,
            mime_type: self.mime_type,
            category: self.category,
            uploaded_by,
            created_at: Some(now),
            updated_at: Some(now),
        })
    }
}

#[allow(async_fn_in_trait)]
pub trait DocumentDbExt {
    async fn create_document(&self, document: Document) -> Result<Document, Problem>;

    async fn get_document(&self, id: ObjectId) -> Result<Option<Document>, Problem>;

    /// Newest first. `visible_to` limits results to documents shared with one of the classes.
    async fn list_documents(
        &self,
        class_id: Option<ObjectId>,
        category: Option<DocumentCategory>,
        visible_to: Option<&[ObjectId]>,
    ) -> Result<Vec<Document>, Problem>;
}

impl DocumentDbExt for Database {
    async fn create_document(&self, mut document: Document) -> Result<Document, Problem> {
        let result = self
            .collection::<Document>(DOCUMENT_COLLECTION_NAME)
            .insert_one(&document, None)
            .await?;
        document.id = inserted_id(&result);

        tracing::info!(
            "Shared '{}' with {} classes",
            document.title,
            document.classes.len()
        );
        Ok(document)
    }

    async fn get_document(&self, id: ObjectId) -> Result<Option<Document>, Problem> {
        self.collection(DOCUMENT_COLLECTION_NAME)
            .find_one(filter::by_id(id), None)
            .await
            .map_err(Problem::from)
    }

    async fn list_documents(
        &self,
        class_id: Option<ObjectId>,
        category: Option<DocumentCategory>,
        visible_to: Option<&[ObjectId]>,
    ) -> Result<Vec<Document>, Problem> {
        let mut query = filter::with_optional(doc! {}, "category", category);
        match (class_id, visible_to) {
            (Some(class_id), Some(visible)) if !visible.contains(&class_id) => {
                return Ok(vec![]);
            }
            (Some(class_id), _) => {
                query.insert("classes", class_id);
            }
            (None, Some(visible)) => {
                query.insert("classes", doc! { "$in": visible.to_vec() });
            }
            (None, None) => {}
        }

        let cursor = self
            .collection::<Document>(DOCUMENT_COLLECTION_NAME)
            .find(
                query,
                FindOptions::builder().sort(doc! { "createdAt": -1 }).build(),
            )
            .await?;

        collect(cursor).await
    }
}
