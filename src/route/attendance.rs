use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;

use crate::data::attendance::db::{check_session, AttendanceData, AttendanceDbExt};
use crate::data::attendance::Attendance;
use crate::data::class::db::problem as class_problem;
use crate::data::class::db::ClassDbExt;
use crate::data::parse_id;
use crate::resp::json::ApiJson;
use crate::resp::jwt::AuthToken;
use crate::resp::problem::Problem;
use crate::resp::toast::{Toast, Toasted};

#[utoipa::path(
    post,
    path = "/attendance",
    tag = "attendance",
    request_body = AttendanceData,
    responses(
        (status = 200, description = "Stored record, replacing an earlier one for the same session", body = Attendance),
        (status = 400, description = "Student isn't enrolled or the class doesn't meet that day", body = Problem),
        (status = 403, description = "Caller isn't a teacher", body = Problem),
        (status = 409, description = "Session was cancelled", body = Problem),
    )
)]
#[post("/attendance", format = "json", data = "<data>")]
#[tracing::instrument(skip(db))]
pub async fn attendance_mark(
    data: Json<AttendanceData>,
    auth: AuthToken,
    db: &State<Database>,
) -> Result<Toasted<ApiJson<Attendance>>, Problem> {
    auth.require_teacher()?;

    let record = data.into_inner().into_attendance(auth.user_id()?)?;
    let class = db
        .get_class(record.class_id)
        .await?
        .ok_or_else(|| class_problem::not_found(record.class_id))?;
    check_session(&class, &record)?;

    let record = db.mark_attendance(record).await?;
    Ok(Toasted::new(ApiJson(record), Toast::success("Đã điểm danh.")))
}

#[utoipa::path(
    get,
    path = "/attendance",
    tag = "attendance",
    params(
        ("classId" = Option<String>, Query, description = "Only records of this class"),
        ("studentId" = Option<String>, Query, description = "Only records of this student"),
    ),
    responses(
        (status = 200, description = "Records, newest session first", body = [Attendance]),
        (status = 403, description = "Students can only list their own records", body = Problem),
    )
)]
#[get("/attendance?<classId>&<studentId>")]
#[tracing::instrument(skip(db))]
#[allow(non_snake_case)]
pub async fn attendance_list(
    classId: Option<String>,
    studentId: Option<String>,
    auth: AuthToken,
    db: &State<Database>,
) -> Result<ApiJson<Vec<Attendance>>, Problem> {
    let class_id = classId
        .as_deref()
        .map(|it| parse_id("classId", it))
        .transpose()?;
    let mut student_id = studentId
        .as_deref()
        .map(|it| parse_id("studentId", it))
        .transpose()?;

    if !auth.is_teacher() {
        let own = auth.user_id()?;
        if let Some(requested) = student_id {
            auth.require_self_or_teacher(requested)?;
        }
        student_id = Some(own);
    }

    Ok(ApiJson(db.list_attendance(class_id, student_id).await?))
}
