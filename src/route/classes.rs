use chrono::Utc;
use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;

use crate::data::class::db::problem as class_problem;
use crate::data::class::db::{CancellationData, ClassData, ClassDbExt, EnrollData};
use crate::data::class::{Class, SessionInfo};
use crate::data::course::db::CourseDbExt;
use crate::data::course::Course;
use crate::data::user::db::UserDbExt;
use crate::data::{parse_date, parse_id, IdParam};
use crate::resp::json::ApiJson;
use crate::resp::jwt::AuthToken;
use crate::resp::problem::{problems, Problem};
use crate::resp::toast::{Toast, Toasted};

async fn existing_course(db: &Database, id: bson::oid::ObjectId) -> Result<Course, Problem> {
    db.get_course(id)
        .await?
        .ok_or_else(|| problems::not_found("Course", id))
}

/// Class `id`, as long as the caller teaches or is enrolled in it.
pub(crate) async fn visible_class(
    db: &Database,
    auth: &AuthToken,
    id: bson::oid::ObjectId,
) -> Result<Class, Problem> {
    let class = db
        .get_class(id)
        .await?
        .ok_or_else(|| class_problem::not_found(id))?;

    if !auth.is_teacher() && !class.is_enrolled(auth.user_id()?) {
        return Err(problems::forbidden("Students can only access classes they're enrolled in."));
    }
    Ok(class)
}

#[utoipa::path(
    get,
    path = "/classes",
    tag = "classes",
    params(("courseId" = Option<String>, Query, description = "Only classes of this course")),
    responses(
        (status = 200, description = "All classes for teachers, enrolled classes for students", body = [Class]),
        (status = 401, description = "Not signed in", body = Problem),
    )
)]
#[get("/classes?<courseId>")]
#[tracing::instrument(skip(db))]
#[allow(non_snake_case)]
pub async fn class_list(
    courseId: Option<String>,
    auth: AuthToken,
    db: &State<Database>,
) -> Result<ApiJson<Vec<Class>>, Problem> {
    let course_id = courseId
        .as_deref()
        .map(|it| parse_id("courseId", it))
        .transpose()?;
    let student_id = if auth.is_teacher() {
        None
    } else {
        Some(auth.user_id()?)
    };

    Ok(ApiJson(db.list_classes(course_id, student_id).await?))
}

#[utoipa::path(
    post,
    path = "/classes",
    tag = "classes",
    request_body = ClassData,
    responses(
        (status = 200, description = "Created class", body = Class),
        (status = 400, description = "Invalid class", body = Problem),
        (status = 403, description = "Caller isn't a teacher", body = Problem),
        (status = 404, description = "Course doesn't exist", body = Problem),
    )
)]
#[post("/classes", format = "json", data = "<data>")]
#[tracing::instrument(skip(db))]
pub async fn class_create(
    data: Json<ClassData>,
    auth: AuthToken,
    db: &State<Database>,
) -> Result<Toasted<ApiJson<Class>>, Problem> {
    auth.require_teacher()?;

    let class = data.into_inner().into_class()?;
    existing_course(db, class.course_id).await?;

    let class = db.create_class(class).await?;
    let toast = Toast::success(format!("Đã tạo lớp {}.", class.name));
    Ok(Toasted::new(ApiJson(class), toast))
}

#[utoipa::path(
    get,
    path = "/classes/{id}",
    tag = "classes",
    params(("id" = String, Path, description = "Class id")),
    responses(
        (status = 200, description = "Class", body = Class),
        (status = 403, description = "Student isn't enrolled", body = Problem),
        (status = 404, description = "No such class", body = Problem),
    )
)]
#[get("/classes/<id>")]
#[tracing::instrument(skip(db))]
pub async fn class_get(
    id: Result<IdParam, Problem>,
    auth: AuthToken,
    db: &State<Database>,
) -> Result<ApiJson<Class>, Problem> {
    let IdParam(id) = id?;
    Ok(ApiJson(visible_class(db, &auth, id).await?))
}

#[utoipa::path(
    put,
    path = "/classes/{id}",
    tag = "classes",
    params(("id" = String, Path, description = "Class id")),
    request_body = ClassData,
    responses(
        (status = 200, description = "Updated class; roster and cancellations are kept", body = Class),
        (status = 400, description = "Invalid class", body = Problem),
        (status = 403, description = "Caller isn't a teacher", body = Problem),
        (status = 404, description = "No such class or course", body = Problem),
    )
)]
#[put("/classes/<id>", format = "json", data = "<data>")]
#[tracing::instrument(skip(db))]
pub async fn class_update(
    id: Result<IdParam, Problem>,
    data: Json<ClassData>,
    auth: AuthToken,
    db: &State<Database>,
) -> Result<Toasted<ApiJson<Class>>, Problem> {
    auth.require_teacher()?;
    let IdParam(id) = id?;

    let class = data.into_inner().into_class()?;
    existing_course(db, class.course_id).await?;

    let class = db
        .update_class_schedule(id, &class)
        .await?
        .ok_or_else(|| class_problem::not_found(id))?;
    Ok(Toasted::new(ApiJson(class), Toast::success("Đã cập nhật lớp.")))
}

#[utoipa::path(
    post,
    path = "/classes/{id}/students",
    tag = "classes",
    params(("id" = String, Path, description = "Class id")),
    request_body = EnrollData,
    responses(
        (status = 200, description = "Class with the student enrolled", body = Class),
        (status = 400, description = "User isn't a student", body = Problem),
        (status = 403, description = "Caller isn't a teacher", body = Problem),
        (status = 404, description = "No such class or student", body = Problem),
        (status = 409, description = "Class is full", body = Problem),
    )
)]
#[post("/classes/<id>/students", format = "json", data = "<data>")]
#[tracing::instrument(skip(db))]
pub async fn class_enroll(
    id: Result<IdParam, Problem>,
    data: Json<EnrollData>,
    auth: AuthToken,
    db: &State<Database>,
) -> Result<Toasted<ApiJson<Class>>, Problem> {
    auth.require_teacher()?;
    let IdParam(id) = id?;
    let student_id = parse_id("studentId", &data.student_id)?;

    let student = db
        .get_user(student_id)
        .await?
        .ok_or_else(|| problems::not_found("User", student_id))?;
    if !student.is_student() {
        return Err(problems::bad_request(
            "Not a student.",
            format!("'{}' isn't a student account.", student.username),
        ));
    }

    let class = db
        .get_class(id)
        .await?
        .ok_or_else(|| class_problem::not_found(id))?;
    let course = existing_course(db, class.course_id).await?;

    let class = db
        .enroll_student(class, student_id, course.max_students)
        .await?;
    let toast = Toast::success(format!("Đã thêm {} vào lớp.", student.username));
    Ok(Toasted::new(ApiJson(class), toast))
}

#[utoipa::path(
    delete,
    path = "/classes/{id}/students/{studentId}",
    tag = "classes",
    params(
        ("id" = String, Path, description = "Class id"),
        ("studentId" = String, Path, description = "Student id"),
    ),
    responses(
        (status = 200, description = "Class without the student", body = Class),
        (status = 403, description = "Caller isn't a teacher", body = Problem),
        (status = 404, description = "No such class", body = Problem),
    )
)]
#[delete("/classes/<id>/students/<student_id>")]
#[tracing::instrument(skip(db))]
pub async fn class_remove_student(
    id: Result<IdParam, Problem>,
    student_id: Result<IdParam, Problem>,
    auth: AuthToken,
    db: &State<Database>,
) -> Result<Toasted<ApiJson<Class>>, Problem> {
    auth.require_teacher()?;
    let IdParam(id) = id?;
    let IdParam(student_id) = student_id?;

    let class = db
        .remove_student(id, student_id)
        .await?
        .ok_or_else(|| class_problem::not_found(id))?;
    Ok(Toasted::new(ApiJson(class), Toast::info("Đã xóa học viên khỏi lớp.")))
}

#[utoipa::path(
    post,
    path = "/classes/{id}/cancellations",
    tag = "classes",
    params(("id" = String, Path, description = "Class id")),
    request_body = CancellationData,
    responses(
        (status = 200, description = "Class with the cancelled date", body = Class),
        (status = 403, description = "Caller isn't a teacher", body = Problem),
        (status = 404, description = "No such class", body = Problem),
    )
)]
#[post("/classes/<id>/cancellations", format = "json", data = "<data>")]
#[tracing::instrument(skip(db))]
pub async fn class_cancel_session(
    id: Result<IdParam, Problem>,
    data: Json<CancellationData>,
    auth: AuthToken,
    db: &State<Database>,
) -> Result<Toasted<ApiJson<Class>>, Problem> {
    auth.require_teacher()?;
    let IdParam(id) = id?;

    let class = db
        .cancel_session(id, data.date)
        .await?
        .ok_or_else(|| class_problem::not_found(id))?;
    let toast = Toast::info(format!("Đã hủy buổi học ngày {}.", data.date.format("%d/%m/%Y")));
    Ok(Toasted::new(ApiJson(class), toast))
}

#[utoipa::path(
    get,
    path = "/classes/{id}/session",
    tag = "classes",
    params(
        ("id" = String, Path, description = "Class id"),
        ("date" = Option<String>, Query, description = "YYYY-MM-DD, defaults to today"),
    ),
    responses(
        (status = 200, description = "Week number and session label", body = SessionInfo),
        (status = 400, description = "Malformed date", body = Problem),
        (status = 404, description = "No such class", body = Problem),
    )
)]
#[get("/classes/<id>/session?<date>")]
#[tracing::instrument(skip(db))]
pub async fn class_session(
    id: Result<IdParam, Problem>,
    date: Option<String>,
    auth: AuthToken,
    db: &State<Database>,
) -> Result<ApiJson<SessionInfo>, Problem> {
    let IdParam(id) = id?;
    let date = match date {
        Some(date) => parse_date("date", &date)?,
        None => Utc::now().date_naive(),
    };

    let class = visible_class(db, &auth, id).await?;
    let course = existing_course(db, class.course_id).await?;

    Ok(ApiJson(class.session_on(date, course.total_sessions as i64)))
}
