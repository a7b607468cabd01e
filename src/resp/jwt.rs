use bson::oid::ObjectId;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::outcome::Outcome;
use rocket::request::{self, FromRequest, Request};
use serde::{Deserialize, Serialize};

use super::util::date_time_as_unix_seconds;
use crate::data::user::User;
use crate::resp::problem::{problems, Problem};
use crate::role::Role;
use crate::security::Security;

pub static AUTH_COOKIE_NAME: &str = "auth-token";

/// Claims carried by the `auth-token` cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthToken {
    #[serde(with = "date_time_as_unix_seconds")]
    iat: DateTime<Utc>,
    #[serde(with = "date_time_as_unix_seconds")]
    exp: DateTime<Utc>,
    /// User id as a hex string.
    pub sub: String,
    pub username: String,
    pub role: Role,
}

impl AuthToken {
    pub fn new(user: &User) -> Result<AuthToken, Problem> {
        let id = user
            .id
            .ok_or_else(|| auth_problem("User record has no id."))?;

        let now = Utc::now();
        Ok(AuthToken {
            iat: now,
            exp: now + Duration::weeks(1),
            sub: id.to_hex(),
            username: user.username.clone(),
            role: user.role,
        })
    }

    pub fn user_id(&self) -> Result<ObjectId, Problem> {
        ObjectId::parse_str(&self.sub).map_err(|_| auth_problem("JWT subject is not a user id."))
    }

    pub fn is_teacher(&self) -> bool {
        self.role.can_manage()
    }

    pub fn require_teacher(&self) -> Result<(), Problem> {
        if self.is_teacher() {
            Ok(())
        } else {
            Err(problems::forbidden("Only teachers can do this."))
        }
    }

    /// Teachers may act on anyone, students only on themselves.
    pub fn require_self_or_teacher(&self, user: ObjectId) -> Result<(), Problem> {
        if self.is_teacher() || self.user_id()? == user {
            Ok(())
        } else {
            Err(problems::forbidden("Students can only access their own records."))
        }
    }

    pub fn encode_jwt(&self, secret: impl AsRef<[u8]>) -> Result<String, jsonwebtoken::errors::Error> {
        let header = Header::new(Algorithm::HS256);
        let key = EncodingKey::from_secret(secret.as_ref());

        encode(&header, &self, &key)
    }

    pub fn cookie(&self, security: &Security, secure: bool) -> Result<Cookie<'static>, Problem> {
        Ok(
            Cookie::build((AUTH_COOKIE_NAME, self.encode_jwt(security.jwt_secret)?))
                .secure(secure)
                .max_age(rocket::time::Duration::weeks(1))
                .path("/")
                .same_site(SameSite::Lax)
                .http_only(true)
                .build(),
        )
    }
}

pub fn auth_problem(detail: impl ToString) -> Problem {
    Problem::new_untyped(Status::Unauthorized, "Unable to authorize user.")
        .detail(detail)
        .clone()
}

pub fn decode_jwt(token: &str, secret: impl AsRef<[u8]>) -> Result<AuthToken, Problem> {
    decode::<AuthToken>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(Problem::from)
}

pub fn extract_claims(cookies: &CookieJar, secret: impl AsRef<[u8]>) -> Result<AuthToken, Problem> {
    let token = match cookies.get(AUTH_COOKIE_NAME) {
        Some(jwt) => jwt.value().to_owned(),
        None => {
            return Err(auth_problem("No auth-token cookie."));
        }
    };
    tracing::debug!("extracted jwt auth from cookie");

    match decode_jwt(&token, secret) {
        Ok(it) => {
            tracing::debug!("decoded auth token for user: {}", it.username);
            Ok(it)
        }
        Err(mut e) => Err(e.detail("auth-token cookie was malformed or expired.").clone()),
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthToken {
    type Error = Problem;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let security: &Security = match req.rocket().state() {
            Some(it) => it,
            None => {
                tracing::error!("Security state isn't managed.");
                return Outcome::Error((Status::InternalServerError, Problem::default()));
            }
        };

        tracing::trace!("extracting auth token from request cookies");
        match extract_claims(req.cookies(), security.jwt_secret) {
            Ok(claims) => Outcome::Success(claims),
            Err(e) => {
                tracing::debug!("unable to extract claims from cookies");
                Outcome::Error((Status::Unauthorized, e))
            }
        }
    }
}

pub mod doc {
    use utoipa::openapi::security::*;

    /// Documents the `auth-token` cookie as the API's security scheme.
    #[derive(Clone, Copy)]
    pub struct CookieAuth;

    impl From<CookieAuth> for SecurityScheme {
        fn from(_: CookieAuth) -> Self {
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                super::AUTH_COOKIE_NAME,
                "JWT (HS256) set by /api/auth/login and /api/auth/register",
            )))
        }
    }

    impl utoipa::Modify for CookieAuth {
        fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
            if let Some(c) = openapi.components.as_mut() {
                c.add_security_scheme("auth-token", *self)
            }
        }
    }
}
