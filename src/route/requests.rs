use bson::oid::ObjectId;
use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;

use crate::config::Config;
use crate::data::attendance::db::AttendanceDbExt;
use crate::data::class::db::problem as class_problem;
use crate::data::class::db::ClassDbExt;
use crate::data::request::db::{RequestData, RequestDbExt, ReviewData};
use crate::data::request::{RequestKind, RequestStatus, StudentRequest};
use crate::data::{parse_id, IdParam};
use crate::resp::json::ApiJson;
use crate::resp::jwt::AuthToken;
use crate::resp::problem::Problem;
use crate::resp::toast::{Toast, Toasted};

type RequestResult = Result<Toasted<ApiJson<StudentRequest>>, Problem>;

async fn apply_approval(
    db: &Database,
    kind: RequestKind,
    request: &StudentRequest,
    marked_by: ObjectId,
) -> Result<(), Problem> {
    db.mark_attendance(request.approval_attendance(kind, marked_by))
        .await
        .map(|_| ())
}

async fn file_request(
    kind: RequestKind,
    data: RequestData,
    auth: &AuthToken,
    db: &Database,
    config: &Config,
) -> RequestResult {
    let caller = auth.user_id()?;
    let student_id = match data.student_id.as_deref() {
        Some(id) => parse_id("studentId", id)?,
        None => caller,
    };
    auth.require_self_or_teacher(student_id)?;

    let status = if config.auto_approve_requests {
        RequestStatus::Approved
    } else {
        RequestStatus::Pending
    };
    let request = data.into_request(kind, student_id, status)?;

    let class = db
        .get_class(request.class_id)
        .await?
        .ok_or_else(|| class_problem::not_found(request.class_id))?;
    if !class.is_enrolled(student_id) {
        return Err(class_problem::not_enrolled(student_id));
    }
    if let Some(makeup_class) = request.makeup_class_id {
        db.get_class(makeup_class)
            .await?
            .ok_or_else(|| class_problem::not_found(makeup_class))?;
    }

    let request = db.create_request(kind, request).await?;
    if request.status == RequestStatus::Approved {
        apply_approval(db, kind, &request, caller).await?;
    }

    let toast = match request.status {
        RequestStatus::Approved => Toast::success("Yêu cầu đã được duyệt."),
        _ => Toast::success("Đã gửi yêu cầu."),
    };
    Ok(Toasted::new(ApiJson(request), toast))
}

async fn list_requests(
    kind: RequestKind,
    status: Option<RequestStatus>,
    class_id: Option<String>,
    auth: &AuthToken,
    db: &Database,
) -> Result<ApiJson<Vec<StudentRequest>>, Problem> {
    let class_id = class_id
        .as_deref()
        .map(|it| parse_id("classId", it))
        .transpose()?;
    let student_id = if auth.is_teacher() {
        None
    } else {
        Some(auth.user_id()?)
    };

    Ok(ApiJson(
        db.list_requests(kind, status, class_id, student_id).await?,
    ))
}

async fn review_request(
    kind: RequestKind,
    id: ObjectId,
    review: ReviewData,
    auth: &AuthToken,
    db: &Database,
) -> RequestResult {
    auth.require_teacher()?;
    review.validate()?;
    let reviewer = auth.user_id()?;

    let request = db.review_request(kind, id, review.status, reviewer).await?;
    if request.status == RequestStatus::Approved {
        apply_approval(db, kind, &request, reviewer).await?;
    }

    let toast = match request.status {
        RequestStatus::Approved => Toast::success("Đã duyệt yêu cầu."),
        _ => Toast::info("Đã từ chối yêu cầu."),
    };
    Ok(Toasted::new(ApiJson(request), toast))
}

#[utoipa::path(
    post,
    path = "/absence-requests",
    tag = "requests",
    request_body = RequestData,
    responses(
        (status = 200, description = "Filed request", body = StudentRequest),
        (status = 400, description = "Student isn't enrolled in the class", body = Problem),
        (status = 403, description = "Students can only file for themselves", body = Problem),
    )
)]
#[post("/absence-requests", format = "json", data = "<data>")]
#[tracing::instrument(skip(db, config))]
pub async fn absence_create(
    data: Json<RequestData>,
    auth: AuthToken,
    db: &State<Database>,
    config: &State<Config>,
) -> RequestResult {
    file_request(RequestKind::Absence, data.into_inner(), &auth, db, config).await
}

#[utoipa::path(
    get,
    path = "/absence-requests",
    tag = "requests",
    params(
        ("status" = Option<RequestStatus>, Query, description = "Only requests with this status"),
        ("classId" = Option<String>, Query, description = "Only requests for this class"),
    ),
    responses(
        (status = 200, description = "All requests for teachers, own requests for students", body = [StudentRequest]),
    )
)]
#[get("/absence-requests?<status>&<classId>")]
#[tracing::instrument(skip(db))]
#[allow(non_snake_case)]
pub async fn absence_list(
    status: Option<RequestStatus>,
    classId: Option<String>,
    auth: AuthToken,
    db: &State<Database>,
) -> Result<ApiJson<Vec<StudentRequest>>, Problem> {
    list_requests(RequestKind::Absence, status, classId, &auth, db).await
}

#[utoipa::path(
    put,
    path = "/absence-requests/{id}/status",
    tag = "requests",
    params(("id" = String, Path, description = "Request id")),
    request_body = ReviewData,
    responses(
        (status = 200, description = "Reviewed request; approval excuses the session", body = StudentRequest),
        (status = 403, description = "Caller isn't a teacher", body = Problem),
        (status = 404, description = "No such request", body = Problem),
        (status = 409, description = "Request was already reviewed", body = Problem),
    )
)]
#[put("/absence-requests/<id>/status", format = "json", data = "<review>")]
#[tracing::instrument(skip(db))]
pub async fn absence_review(
    id: Result<IdParam, Problem>,
    review: Json<ReviewData>,
    auth: AuthToken,
    db: &State<Database>,
) -> RequestResult {
    let IdParam(id) = id?;
    review_request(RequestKind::Absence, id, review.into_inner(), &auth, db).await
}

#[utoipa::path(
    post,
    path = "/makeup-requests",
    tag = "requests",
    request_body = RequestData,
    responses(
        (status = 200, description = "Filed request", body = StudentRequest),
        (status = 400, description = "Student isn't enrolled in the class", body = Problem),
        (status = 403, description = "Students can only file for themselves", body = Problem),
    )
)]
#[post("/makeup-requests", format = "json", data = "<data>")]
#[tracing::instrument(skip(db, config))]
pub async fn makeup_create(
    data: Json<RequestData>,
    auth: AuthToken,
    db: &State<Database>,
    config: &State<Config>,
) -> RequestResult {
    file_request(RequestKind::Makeup, data.into_inner(), &auth, db, config).await
}

#[utoipa::path(
    get,
    path = "/makeup-requests",
    tag = "requests",
    params(
        ("status" = Option<RequestStatus>, Query, description = "Only requests with this status"),
        ("classId" = Option<String>, Query, description = "Only requests for this class"),
    ),
    responses(
        (status = 200, description = "All requests for teachers, own requests for students", body = [StudentRequest]),
    )
)]
#[get("/makeup-requests?<status>&<classId>")]
#[tracing::instrument(skip(db))]
#[allow(non_snake_case)]
pub async fn makeup_list(
    status: Option<RequestStatus>,
    classId: Option<String>,
    auth: AuthToken,
    db: &State<Database>,
) -> Result<ApiJson<Vec<StudentRequest>>, Problem> {
    list_requests(RequestKind::Makeup, status, classId, &auth, db).await
}

#[utoipa::path(
    put,
    path = "/makeup-requests/{id}/status",
    tag = "requests",
    params(("id" = String, Path, description = "Request id")),
    request_body = ReviewData,
    responses(
        (status = 200, description = "Reviewed request; approval records the makeup session", body = StudentRequest),
        (status = 403, description = "Caller isn't a teacher", body = Problem),
        (status = 404, description = "No such request", body = Problem),
        (status = 409, description = "Request was already reviewed", body = Problem),
    )
)]
#[put("/makeup-requests/<id>/status", format = "json", data = "<review>")]
#[tracing::instrument(skip(db))]
pub async fn makeup_review(
    id: Result<IdParam, Problem>,
    review: Json<ReviewData>,
    auth: AuthToken,
    db: &State<Database>,
) -> RequestResult {
    let IdParam(id) = id?;
    review_request(RequestKind::Makeup, id, review.into_inner(), &auth, db).await
}
