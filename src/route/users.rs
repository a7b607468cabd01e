use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;

use crate::config::Config;
use crate::data::user::db::problem as user_problem;
use crate::data::user::db::{UserCreateData, UserDbExt, UserUpdateData};
use crate::data::user::{User, UserResponse};
use crate::data::IdParam;
use crate::middleware::paging::PageState;
use crate::resp::json::ApiJson;
use crate::resp::jwt::AuthToken;
use crate::resp::problem::{problems, Problem};
use crate::resp::toast::{Toast, Toasted};
use crate::role::Role;
use crate::security::Security;

#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    params(
        ("role" = Option<Role>, Query, description = "Only users with this role"),
        ("page" = Option<u32>, Query, description = "Zero based page"),
        ("len" = Option<u32>, Query, description = "Page length, at most 100"),
    ),
    responses(
        (status = 200, description = "Users sorted by username", body = [UserResponse]),
        (status = 403, description = "Caller isn't a teacher", body = Problem),
    )
)]
#[get("/users?<role>")]
#[tracing::instrument(skip(db))]
pub async fn user_list(
    role: Option<Role>,
    page: PageState,
    auth: AuthToken,
    db: &State<Database>,
) -> Result<ApiJson<Vec<UserResponse>>, Problem> {
    auth.require_teacher()?;

    let users = db.list_users(role, page).await?;
    Ok(ApiJson(users.into_iter().map(UserResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = UserCreateData,
    responses(
        (status = 200, description = "Created user", body = UserResponse),
        (status = 403, description = "Caller isn't a teacher", body = Problem),
        (status = 409, description = "Username already used", body = Problem),
    )
)]
#[post("/users", format = "json", data = "<data>")]
#[tracing::instrument(skip(db, security, config))]
pub async fn user_create(
    data: Json<UserCreateData>,
    auth: AuthToken,
    db: &State<Database>,
    security: &State<Security>,
    config: &State<Config>,
) -> Result<Toasted<ApiJson<UserResponse>>, Problem> {
    auth.require_teacher()?;
    data.validate()?;
    let data = data.into_inner();

    let mut profile = data.profile;
    if profile.avatar.as_deref().map_or(true, str::is_empty) {
        profile.avatar = Some(config.default_avatar.clone());
    }

    let user = User::new(
        data.username,
        data.password,
        data.role.unwrap_or_default(),
        profile,
        &security.salt,
    );
    let user = db.create_user(user).await?;

    let toast = Toast::success(format!("Đã tạo tài khoản {}.", user.username));
    Ok(Toasted::new(ApiJson(UserResponse::from(user)), toast))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 403, description = "Students can only view themselves", body = Problem),
        (status = 404, description = "No such user", body = Problem),
    )
)]
#[get("/users/<id>")]
#[tracing::instrument(skip(db))]
pub async fn user_get(
    id: Result<IdParam, Problem>,
    auth: AuthToken,
    db: &State<Database>,
) -> Result<ApiJson<UserResponse>, Problem> {
    let IdParam(id) = id?;
    auth.require_self_or_teacher(id)?;

    let user = db
        .get_user(id)
        .await?
        .ok_or_else(|| user_problem::not_found(id))?;
    Ok(ApiJson(UserResponse::from(user)))
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User id")),
    request_body = UserUpdateData,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 403, description = "Not allowed to change this user or role", body = Problem),
        (status = 404, description = "No such user", body = Problem),
    )
)]
#[put("/users/<id>", format = "json", data = "<update>")]
#[tracing::instrument(skip(db, security))]
pub async fn user_update(
    id: Result<IdParam, Problem>,
    update: Json<UserUpdateData>,
    auth: AuthToken,
    db: &State<Database>,
    security: &State<Security>,
) -> Result<Toasted<ApiJson<UserResponse>>, Problem> {
    let IdParam(id) = id?;
    auth.require_self_or_teacher(id)?;
    if update.role.is_some() && !auth.is_teacher() {
        return Err(problems::forbidden("Only teachers can change roles."));
    }
    update.validate()?;

    let user = db
        .update_user(id, update.to_update(&security.salt))
        .await?
        .ok_or_else(|| user_problem::not_found(id))?;

    Ok(Toasted::new(
        ApiJson(UserResponse::from(user)),
        Toast::success("Đã cập nhật hồ sơ."),
    ))
}

#[cfg(test)]
mod tests {
    use crate::resp::jwt::tests::token_for;
    use crate::role::Role;
    use crate::route::test_util::{auth_cookie, client};
    use bson::oid::ObjectId;
    use rocket::http::{ContentType, Status};
    use serde_json::Value;

    #[rocket::async_test]
    async fn listing_users_is_for_teachers() {
        let client = client().await;

        let anonymous = client.get("/api/users").dispatch().await;
        assert_eq!(anonymous.status(), Status::Unauthorized);

        let student = client
            .get("/api/users?role=student")
            .cookie(auth_cookie(&client, &token_for(Role::Student)))
            .dispatch()
            .await;
        assert_eq!(student.status(), Status::Forbidden);

        let body: Value = student.into_json().await.expect("problem body");
        assert_eq!(body["title"], "Permission level too low.");
    }

    #[rocket::async_test]
    async fn students_only_see_themselves() {
        let client = client().await;
        let other = ObjectId::new();

        let response = client
            .get(format!("/api/users/{}", other))
            .cookie(auth_cookie(&client, &token_for(Role::Student)))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Forbidden);
    }

    #[rocket::async_test]
    async fn students_cant_promote_themselves() {
        let client = client().await;
        let token = token_for(Role::Student);

        let response = client
            .put(format!("/api/users/{}", token.sub))
            .header(ContentType::JSON)
            .body(r#"{"role":"teacher"}"#)
            .cookie(auth_cookie(&client, &token))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Forbidden);
    }

    #[rocket::async_test]
    async fn malformed_ids_are_bad_requests() {
        let client = client().await;

        let response = client
            .get("/api/users/not-an-id")
            .cookie(auth_cookie(&client, &token_for(Role::Teacher)))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);

        let body: Value = response.into_json().await.expect("problem body");
        assert_eq!(body["field"], "id");
    }
}
