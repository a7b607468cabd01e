use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;

use crate::data::course::db::{CourseData, CourseDbExt};
use crate::data::course::Course;
use crate::data::IdParam;
use crate::resp::json::ApiJson;
use crate::resp::jwt::AuthToken;
use crate::resp::problem::{problems, Problem};
use crate::resp::toast::{Toast, Toasted};

#[utoipa::path(
    get,
    path = "/courses",
    tag = "courses",
    responses(
        (status = 200, description = "All courses", body = [Course]),
        (status = 500, description = "Courses couldn't be loaded", body = Problem),
    )
)]
#[get("/courses")]
#[tracing::instrument(skip(db))]
pub async fn course_list(db: &State<Database>) -> Result<ApiJson<Vec<Course>>, Problem> {
    Ok(ApiJson(db.list_courses().await?))
}

#[utoipa::path(
    get,
    path = "/courses/{id}",
    tag = "courses",
    params(("id" = String, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course", body = Course),
        (status = 404, description = "No such course", body = Problem),
    )
)]
#[get("/courses/<id>")]
#[tracing::instrument(skip(db))]
pub async fn course_get(
    id: Result<IdParam, Problem>,
    db: &State<Database>,
) -> Result<ApiJson<Course>, Problem> {
    let IdParam(id) = id?;
    let course = db
        .get_course(id)
        .await?
        .ok_or_else(|| problems::not_found("Course", id))?;
    Ok(ApiJson(course))
}

#[utoipa::path(
    post,
    path = "/courses",
    tag = "courses",
    request_body = CourseData,
    responses(
        (status = 200, description = "Created course", body = Course),
        (status = 400, description = "Invalid course", body = Problem),
        (status = 403, description = "Caller isn't a teacher", body = Problem),
    )
)]
#[post("/courses", format = "json", data = "<data>")]
#[tracing::instrument(skip(db))]
pub async fn course_create(
    data: Json<CourseData>,
    auth: AuthToken,
    db: &State<Database>,
) -> Result<Toasted<ApiJson<Course>>, Problem> {
    auth.require_teacher()?;

    let course = db.create_course(data.into_inner().into_course()?).await?;
    let toast = Toast::success(format!("Đã tạo khóa học {}.", course.name));
    Ok(Toasted::new(ApiJson(course), toast))
}

#[utoipa::path(
    put,
    path = "/courses/{id}",
    tag = "courses",
    params(("id" = String, Path, description = "Course id")),
    request_body = CourseData,
    responses(
        (status = 200, description = "Updated course", body = Course),
        (status = 400, description = "Invalid course", body = Problem),
        (status = 403, description = "Caller isn't a teacher", body = Problem),
        (status = 404, description = "No such course", body = Problem),
    )
)]
#[put("/courses/<id>", format = "json", data = "<data>")]
#[tracing::instrument(skip(db))]
pub async fn course_update(
    id: Result<IdParam, Problem>,
    data: Json<CourseData>,
    auth: AuthToken,
    db: &State<Database>,
) -> Result<Toasted<ApiJson<Course>>, Problem> {
    auth.require_teacher()?;
    let IdParam(id) = id?;

    let mut course = data.into_inner().into_course()?;
    course.created_at = None;
    let course = db
        .replace_course(id, course)
        .await?
        .ok_or_else(|| problems::not_found("Course", id))?;

    Ok(Toasted::new(ApiJson(course), Toast::success("Đã cập nhật khóa học.")))
}
