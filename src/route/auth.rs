use mongodb::Database;
use rocket::http::{Cookie, CookieJar};
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::Config;
use crate::data::user::db::problem as user_problem;
use crate::data::user::db::{LoginData, UserCreateData, UserDbExt};
use crate::data::user::{User, UserResponse};
use crate::resp::json::ApiJson;
use crate::resp::jwt::{AuthToken, AUTH_COOKIE_NAME};
use crate::resp::problem::Problem;
use crate::resp::toast::{Toast, Toasted};
use crate::role::Role;
use crate::security::Security;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

fn sign_in(
    user: &User,
    cookies: &CookieJar<'_>,
    security: &Security,
    config: &Config,
) -> Result<(), Problem> {
    let token = AuthToken::new(user)?;
    cookies.add(token.cookie(security, config.secure_cookies)?);
    Ok(())
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginData,
    responses(
        (status = 200, description = "Signed in, auth-token cookie set", body = UserResponse),
        (status = 401, description = "Bad username or password", body = Problem),
    )
)]
#[post("/auth/login", format = "json", data = "<login>")]
#[tracing::instrument(skip(cookies, db, security, config))]
pub async fn login(
    login: Json<LoginData>,
    cookies: &CookieJar<'_>,
    db: &State<Database>,
    security: &State<Security>,
    config: &State<Config>,
) -> Result<Toasted<ApiJson<UserResponse>>, Problem> {
    let user = db
        .find_user_by_username(&login.username)
        .await?
        .ok_or_else(user_problem::bad_login)?;

    if !user.password.verify(&login.password, &security.salt) {
        return Err(user_problem::bad_login());
    }

    sign_in(&user, cookies, security, config)?;
    tracing::info!("{} signed in", user.username);

    let toast = Toast::success(format!("Xin chào, {}!", display_name(&user)));
    Ok(Toasted::new(ApiJson(UserResponse::from(user)), toast))
}

fn display_name(user: &User) -> &str {
    if user.profile.full_name.is_empty() {
        &user.username
    } else {
        &user.profile.full_name
    }
}

#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = UserCreateData,
    responses(
        (status = 200, description = "Account created, auth-token cookie set", body = UserResponse),
        (status = 400, description = "Invalid account data", body = Problem),
        (status = 409, description = "Username already used", body = Problem),
    )
)]
#[post("/auth/register", format = "json", data = "<data>")]
#[tracing::instrument(skip(cookies, db, security, config))]
pub async fn register(
    data: Json<UserCreateData>,
    cookies: &CookieJar<'_>,
    db: &State<Database>,
    security: &State<Security>,
    config: &State<Config>,
) -> Result<Toasted<ApiJson<UserResponse>>, Problem> {
    data.validate()?;
    let data = data.into_inner();

    let role = if config.is_teacher_username(&data.username) {
        Role::Teacher
    } else {
        Role::Student
    };

    let mut profile = data.profile;
    if profile.avatar.as_deref().map_or(true, str::is_empty) {
        profile.avatar = Some(config.default_avatar.clone());
    }

    let user = User::new(data.username, data.password, role, profile, &security.salt);
    let user = db.create_user(user).await?;
    sign_in(&user, cookies, security, config)?;

    Ok(Toasted::new(
        ApiJson(UserResponse::from(user)),
        Toast::success("Đăng ký thành công."),
    ))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "auth-token cookie cleared", body = MessageResponse),
    )
)]
#[post("/auth/logout")]
#[tracing::instrument(skip(cookies))]
pub fn logout(cookies: &CookieJar<'_>) -> Toasted<Json<MessageResponse>> {
    cookies.remove(Cookie::build(AUTH_COOKIE_NAME).path("/"));

    Toasted::new(
        Json(MessageResponse {
            message: "Logged out successfully".to_string(),
        }),
        Toast::info("Đã đăng xuất."),
    )
}

#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Signed in user", body = UserResponse),
        (status = 401, description = "Not signed in", body = Problem),
    )
)]
#[get("/auth/me")]
#[tracing::instrument(skip(db))]
pub async fn me(auth: AuthToken, db: &State<Database>) -> Result<ApiJson<UserResponse>, Problem> {
    let id = auth.user_id()?;
    let user = db
        .get_user(id)
        .await?
        .ok_or_else(|| user_problem::not_found(id))?;

    Ok(ApiJson(UserResponse::from(user)))
}

#[cfg(test)]
mod tests {
    use crate::resp::jwt::tests::token_for;
    use crate::resp::jwt::AUTH_COOKIE_NAME;
    use crate::resp::toast::{Toast, ToastKind, TOAST_HEADER_NAME};
    use crate::role::Role;
    use crate::route::test_util::{auth_cookie, client};
    use rocket::http::{ContentType, Status};
    use serde_json::Value;

    #[rocket::async_test]
    async fn logout_clears_cookie() {
        let client = client().await;

        let response = client
            .post("/api/auth/logout")
            .cookie(auth_cookie(&client, &token_for(Role::Student)))
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);
        let removal = response
            .headers()
            .get("Set-Cookie")
            .find(|it| it.starts_with(AUTH_COOKIE_NAME))
            .expect("logout should expire the auth cookie");
        assert!(removal.contains("Max-Age=0") || removal.contains("Expires="));

        let toast = response
            .headers()
            .get_one(TOAST_HEADER_NAME)
            .and_then(Toast::decode_header)
            .expect("logout should toast");
        assert_eq!(toast.kind, ToastKind::Info);

        let body: Value = response.into_json().await.expect("json body");
        assert_eq!(body["message"], "Logged out successfully");
    }

    #[rocket::async_test]
    async fn me_requires_a_cookie() {
        let client = client().await;

        let response = client.get("/api/auth/me").dispatch().await;
        assert_eq!(response.status(), Status::Unauthorized);
        assert_eq!(
            response.content_type(),
            Some(ContentType::new("application", "problem+json"))
        );

        let body: Value = response.into_json().await.expect("problem body");
        assert_eq!(body["status"], 401);
        assert!(body["error"].is_string());
    }

    #[rocket::async_test]
    async fn forged_cookies_are_rejected() {
        let client = client().await;

        let forged = token_for(Role::Teacher)
            .cookie(&crate::security::Security::ephemeral(), false)
            .unwrap();
        let response = client.get("/api/auth/me").cookie(forged).dispatch().await;

        assert_eq!(response.status(), Status::Unauthorized);
    }

    #[rocket::async_test]
    async fn register_validates_before_touching_the_database() {
        let client = client().await;

        let response = client
            .post("/api/auth/register")
            .header(ContentType::JSON)
            .body(r#"{"username":"ab","password":"12345678","fullName":"A B"}"#)
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::BadRequest);
        let body: Value = response.into_json().await.expect("problem body");
        assert_eq!(body["title"], "Bad username.");
    }

    #[rocket::async_test]
    #[ignore = "requires a running MongoDB instance"]
    async fn register_then_login() {
        let client = client().await;
        let username = format!("reg{}", &bson::oid::ObjectId::new().to_hex()[7..]);

        let response = client
            .post("/api/auth/register")
            .header(ContentType::JSON)
            .body(format!(
                r#"{{"username":"{}","password":"d0n't-fr3t","fullName":"Học viên"}}"#,
                username
            ))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["role"], "student");
        assert!(body["_id"].is_string());
        assert!(body.get("password").is_none());

        let response = client
            .post("/api/auth/login")
            .header(ContentType::JSON)
            .body(format!(
                r#"{{"username":"{}","password":"d0n't-fr3t"}}"#,
                username
            ))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        assert!(response.cookies().get(AUTH_COOKIE_NAME).is_some());
    }
}
