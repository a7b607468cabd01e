use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;

use crate::data::class::db::ClassDbExt;
use crate::data::document::db::{DocumentData, DocumentDbExt};
use crate::data::document::{Document, DocumentCategory};
use crate::data::{parse_id, IdParam};
use crate::resp::json::ApiJson;
use crate::resp::jwt::AuthToken;
use crate::resp::problem::{problems, Problem};
use crate::resp::toast::{Toast, Toasted};

/// Ids of the classes a student is enrolled in, `None` for teachers who see everything.
async fn enrolled_classes(
    db: &Database,
    auth: &AuthToken,
) -> Result<Option<Vec<bson::oid::ObjectId>>, Problem> {
    if auth.is_teacher() {
        return Ok(None);
    }

    let classes = db.list_classes(None, Some(auth.user_id()?)).await?;
    Ok(Some(classes.into_iter().filter_map(|it| it.id).collect()))
}

#[utoipa::path(
    post,
    path = "/documents",
    tag = "documents",
    request_body = DocumentData,
    responses(
        (status = 200, description = "Registered document", body = Document),
        (status = 400, description = "Invalid document", body = Problem),
        (status = 403, description = "Caller isn't a teacher", body = Problem),
    )
)]
#[post("/documents", format = "json", data = "<data>")]
#[tracing::instrument(skip(db))]
pub async fn document_create(
    data: Json<DocumentData>,
    auth: AuthToken,
    db: &State<Database>,
) -> Result<Toasted<ApiJson<Document>>, Problem> {
    auth.require_teacher()?;

    let document = data.into_inner().into_document(auth.user_id()?)?;
    let document = db.create_document(document).await?;

    let toast = Toast::success(format!("Đã chia sẻ tài liệu {}.", document.title));
    Ok(Toasted::new(ApiJson(document), toast))
}

#[utoipa::path(
    get,
    path = "/documents",
    tag = "documents",
    params(
        ("classId" = Option<String>, Query, description = "Only documents shared with this class"),
        ("category" = Option<DocumentCategory>, Query, description = "Only documents of this category"),
    ),
    responses(
        (status = 200, description = "Documents visible to the caller, newest first", body = [Document]),
    )
)]
#[get("/documents?<classId>&<category>")]
#[tracing::instrument(skip(db))]
#[allow(non_snake_case)]
pub async fn document_list(
    classId: Option<String>,
    category: Option<DocumentCategory>,
    auth: AuthToken,
    db: &State<Database>,
) -> Result<ApiJson<Vec<Document>>, Problem> {
    let class_id = classId
        .as_deref()
        .map(|it| parse_id("classId", it))
        .transpose()?;
    let visible = enrolled_classes(db, &auth).await?;

    let documents = db
        .list_documents(class_id, category, visible.as_deref())
        .await?;
    Ok(ApiJson(documents))
}

#[utoipa::path(
    get,
    path = "/documents/{id}",
    tag = "documents",
    params(("id" = String, Path, description = "Document id")),
    responses(
        (status = 200, description = "Document", body = Document),
        (status = 403, description = "Document isn't shared with the student's classes", body = Problem),
        (status = 404, description = "No such document", body = Problem),
    )
)]
#[get("/documents/<id>")]
#[tracing::instrument(skip(db))]
pub async fn document_get(
    id: Result<IdParam, Problem>,
    auth: AuthToken,
    db: &State<Database>,
) -> Result<ApiJson<Document>, Problem> {
    let IdParam(id) = id?;
    let document = db
        .get_document(id)
        .await?
        .ok_or_else(|| problems::not_found("Document", id))?;

    if let Some(visible) = enrolled_classes(db, &auth).await? {
        if !document.shared_with_any(&visible) {
            return Err(problems::forbidden(
                "Document isn't shared with any of your classes.",
            ));
        }
    }
    Ok(ApiJson(document))
}
