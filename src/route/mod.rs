use std::collections::BTreeMap;

use rocket::serde::json::Json;
use rocket::{Build, Rocket, Route};

pub mod attendance;
pub mod auth;
pub mod classes;
pub mod courses;
pub mod documents;
pub mod files;
pub mod products;
pub mod requests;
pub mod users;

use attendance::*;
use auth::*;
use classes::*;
use courses::*;
use documents::*;
use files::*;
use products::*;
use requests::*;
use users::*;

use utoipa::OpenApi;

use crate::{
    data::{
        attendance as ad, class as cd, course as crd, document as dd, product as pd, request as rd,
        user as ud,
    },
    middleware::redirect::canonical_redirect,
    resp::{jwt::doc::CookieAuth, problem::Problem, toast},
    role::Role,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        login,
        register,
        logout,
        me,
        user_list,
        user_create,
        user_get,
        user_update,
        course_list,
        course_get,
        course_create,
        course_update,
        class_list,
        class_create,
        class_get,
        class_update,
        class_enroll,
        class_remove_student,
        class_cancel_session,
        class_session,
        attendance_mark,
        attendance_list,
        absence_create,
        absence_list,
        absence_review,
        makeup_create,
        makeup_list,
        makeup_review,
        document_create,
        document_list,
        document_get,
        product_list,
        product_get,
        product_create,
        product_update,
        product_stock,
    ),
    components(schemas(
        Role,
        Problem,
        MessageResponse,
        toast::Toast,
        toast::ToastKind,
        ud::Profile,
        ud::UserResponse,
        ud::db::LoginData,
        ud::db::UserCreateData,
        ud::db::UserUpdateData,
        crd::Course,
        crd::CourseType,
        crd::CourseFormat,
        crd::db::CourseData,
        cd::Class,
        cd::ClassSession,
        cd::SessionInfo,
        cd::db::ClassData,
        cd::db::EnrollData,
        cd::db::CancellationData,
        ad::Attendance,
        ad::AttendanceStatus,
        ad::db::AttendanceData,
        rd::StudentRequest,
        rd::RequestStatus,
        rd::db::RequestData,
        rd::db::ReviewData,
        dd::Document,
        dd::DocumentCategory,
        dd::db::DocumentData,
        pd::Product,
        pd::db::ProductData,
        pd::db::StockData,
    )),
    tags(
        (name = "auth", description = "Sign in and out"),
        (name = "users", description = "Accounts and profiles"),
        (name = "courses", description = "Course catalog"),
        (name = "classes", description = "Class schedules and rosters"),
        (name = "attendance", description = "Session attendance"),
        (name = "requests", description = "Absence and makeup requests"),
        (name = "documents", description = "Shared course material"),
        (name = "products", description = "Shop catalog"),
    ),
    modifiers(&CookieAuth, &API_PREFIX)
)]
pub struct ApiDoc;

pub struct PathPrefix(pub &'static str);
static API_PREFIX: PathPrefix = PathPrefix("/api");

impl utoipa::Modify for PathPrefix {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let mut new_paths = BTreeMap::new();

        for (path, item) in std::mem::take(&mut openapi.paths.paths) {
            new_paths.insert(self.0.to_string() + path.as_ref(), item);
        }

        openapi.paths.paths = new_paths;
    }
}

#[get("/openapi.json")]
pub fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn api() -> Vec<Route> {
    routes![
        openapi_json,
        login,
        register,
        logout,
        me,
        user_list,
        user_create,
        user_get,
        user_update,
        course_list,
        course_get,
        course_create,
        course_update,
        class_list,
        class_create,
        class_get,
        class_update,
        class_enroll,
        class_remove_student,
        class_cancel_session,
        class_session,
        attendance_mark,
        attendance_list,
        absence_create,
        absence_list,
        absence_review,
        makeup_create,
        makeup_list,
        makeup_review,
        document_create,
        document_list,
        document_get,
        product_list,
        product_get,
        product_create,
        product_update,
        product_stock,
    ]
}

pub fn mount_api(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .mount("/api", api())
        .mount("/", routes![canonical_redirect, app, app_path])
        .register("/", catchers![crate::resp::problem::default_catcher])
}


#[cfg(test)]
mod tests {
    use super::test_util::client;
    use rocket::http::Status;
    use serde_json::Value;

    #[rocket::async_test]
    async fn openapi_lists_prefixed_paths() {
        let client = client().await;

        let response = client.get("/api/openapi.json").dispatch().await;
        assert_eq!(response.status(), Status::Ok);

        let doc: Value = response.into_json().await.expect("openapi json");
        let paths = doc["paths"].as_object().expect("paths");
        assert!(paths.contains_key("/api/courses"));
        assert!(paths.contains_key("/api/classes/{id}/session"));
        assert!(paths.contains_key("/api/auth/logout"));
        assert!(doc["components"]["securitySchemes"]["auth-token"].is_object());
    }

    #[rocket::async_test]
    async fn unmatched_routes_are_problems() {
        let client = client().await;

        let response = client.delete("/api/courses").dispatch().await;
        assert_eq!(response.status(), Status::NotFound);

        let body: Value = response.into_json().await.expect("problem body");
        assert_eq!(body["status"], 404);
        assert_eq!(body["error"], "Not Found");
    }
}
