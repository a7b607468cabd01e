use bson::oid::ObjectId;
use bson::{doc, Document};
use chrono::{NaiveDate, Utc};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::results::UpdateResult;
use mongodb::Database;
use serde::Deserialize;
use utoipa::ToSchema;

use super::{PasswordHash, Profile, User, USER_COLLECTION_NAME};
use crate::data::{collect, filter, inserted_id};
use crate::middleware::paging::PageState;
use crate::resp::problem::Problem;
use crate::role::Role;
use crate::security::Salt;

pub mod problem {
    use crate::resp::problem::Problem;
    use rocket::http::Status;

    #[inline]
    pub fn bad_email(email: impl ToString, detail: impl ToString) -> Problem {
        Problem::new_untyped(Status::BadRequest, "Bad email.")
            .insert_str("email", email)
            .detail(detail)
            .to_owned()
    }

    #[inline]
    pub fn bad_username(username: impl ToString, detail: impl ToString) -> Problem {
        Problem::new_untyped(Status::BadRequest, "Bad username.")
            .insert_str("username", username)
            .detail(detail)
            .to_owned()
    }

    #[inline]
    pub fn bad_password(detail: impl ToString) -> Problem {
        Problem::new_untyped(Status::BadRequest, "Bad password.")
            .detail(detail)
            .to_owned()
    }

    #[inline]
    pub fn username_taken(username: impl ToString) -> Problem {
        Problem::new_untyped(Status::Conflict, "Username already used.")
            .insert_str("username", username)
            .to_owned()
    }

    #[inline]
    pub fn not_found(id: impl ToString) -> Problem {
        Problem::new_untyped(Status::NotFound, "User doesn't exist.")
            .insert_str("id", id)
            .to_owned()
    }

    #[inline]
    pub fn bad_login() -> Problem {
        Problem::new_untyped(Status::Unauthorized, "Bad username or password.")
    }
}

fn validate_username(username: &str) -> Result<(), Problem> {
    if username.len() < 3 {
        return Err(problem::bad_username(
            username,
            "Username must be at least 3 characters (bytes) long.",
        ));
    }

    if username.len() > 32 {
        return Err(problem::bad_username(
            username,
            "Username can't be longer than 32 (bytes) characters.",
        ));
    }

    if username.chars().any(char::is_whitespace) {
        return Err(problem::bad_username(
            username,
            "Username can't contain whitespace.",
        ));
    }

    Ok(())
}

fn validate_password(password: &str) -> Result<(), Problem> {
    if password.len() < 8 {
        return Err(problem::bad_password(
            "Password must be at least 8 characters (bytes) long.",
        ));
    }

    if password.len() > 72 {
        return Err(problem::bad_password(
            "Passwords longer than 72 characters (bytes) aren't supported.",
        ));
    }

    Ok(())
}

fn validate_email(email: Option<&str>) -> Result<(), Problem> {
    match email {
        Some(email) if !email.contains('@') => {
            Err(problem::bad_email(email, "Not a valid e-mail address."))
        }
        _ => Ok(()),
    }
}

#[derive(Clone, Deserialize, ToSchema)]
pub struct LoginData {
    pub username: String,
    #[schema(format = "password")]
    pub password: String,
}

impl std::fmt::Debug for LoginData {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LoginData:{}", self.username)
    }
}

/// New account. `role` is only honored when a teacher creates the account.
#[derive(Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserCreateData {
    pub username: String,
    #[schema(format = "password")]
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(flatten)]
    pub profile: Profile,
}

impl std::fmt::Debug for UserCreateData {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UserCreateData:{}", self.username)
    }
}

impl UserCreateData {
    pub fn validate(&self) -> Result<(), Problem> {
        validate_username(&self.username)?;
        validate_password(&self.password)?;
        validate_email(self.profile.email.as_deref())
    }
}

#[derive(Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdateData {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    #[schema(format = "password")]
    pub password: Option<String>,
    pub role: Option<Role>,
}

impl std::fmt::Debug for UserUpdateData {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserUpdateData")
            .field("full_name", &self.full_name)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl UserUpdateData {
    pub fn validate(&self) -> Result<(), Problem> {
        if let Some(password) = &self.password {
            validate_password(password)?;
        }
        validate_email(self.email.as_deref())
    }

    /// `$set` document with only the provided fields.
    pub fn to_update(&self, salt: &Salt) -> Document {
        let mut set = doc! { "updatedAt": Utc::now().to_rfc3339() };

        if let Some(full_name) = &self.full_name {
            set.insert("fullName", full_name.clone());
        }
        if let Some(email) = &self.email {
            set.insert("email", email.clone());
        }
        if let Some(phone) = &self.phone {
            set.insert("phone", phone.clone());
        }
        if let Some(avatar) = &self.avatar {
            set.insert("avatar", avatar.clone());
        }
        if let Some(date_of_birth) = &self.date_of_birth {
            set.insert("dateOfBirth", date_of_birth.format("%Y-%m-%d").to_string());
        }
        if let Some(password) = &self.password {
            set.insert("password", String::from(PasswordHash::new(password, salt)));
        }
        if let Some(role) = self.role {
            set.insert("role", role);
        }

        doc! { "$set": set }
    }
}

// TODO: UserDbExt fns shouldn't be erroring with Problem
#[allow(async_fn_in_trait)]
pub trait UserDbExt {
    async fn create_user(&self, user: User) -> Result<User, Problem>;

    async fn get_user(&self, id: ObjectId) -> Result<Option<User>, Problem>;

    async fn find_user_by_username(
        &self,
        username: impl AsRef<str>,
    ) -> Result<Option<User>, Problem>;

    async fn list_users(&self, role: Option<Role>, page: PageState) -> Result<Vec<User>, Problem>;

    async fn update_user(&self, id: ObjectId, update: Document) -> Result<Option<User>, Problem>;

    /// Sets `avatar` on every user where it's missing, null or empty.
    async fn backfill_default_avatars(
        &self,
        avatar: impl AsRef<str>,
    ) -> mongodb::error::Result<UpdateResult>;
}

impl UserDbExt for Database {
    async fn create_user(&self, mut user: User) -> Result<User, Problem> {
        if self.find_user_by_username(&user.username).await?.is_some() {
            return Err(problem::username_taken(&user.username));
        }

        let result = self
            .collection::<User>(USER_COLLECTION_NAME)
            .insert_one(&user, None)
            .await?;
        user.id = inserted_id(&result);

        tracing::info!("Created {} '{}'", user.role, user.username);
        Ok(user)
    }

    async fn get_user(&self, id: ObjectId) -> Result<Option<User>, Problem> {
        self.collection(USER_COLLECTION_NAME)
            .find_one(filter::by_id(id), None)
            .await
            .map_err(Problem::from)
    }

    async fn find_user_by_username(
        &self,
        username: impl AsRef<str>,
    ) -> Result<Option<User>, Problem> {
        self.collection(USER_COLLECTION_NAME)
            .find_one(filter::by_username(username), None)
            .await
            .map_err(Problem::from)
    }

    async fn list_users(&self, role: Option<Role>, page: PageState) -> Result<Vec<User>, Problem> {
        let options = page
            .apply(FindOptions::builder().sort(doc! { "username": 1 }).build());

        let cursor = self
            .collection::<User>(USER_COLLECTION_NAME)
            .find(filter::with_optional(doc! {}, "role", role), options)
            .await?;

        collect(cursor).await
    }

    async fn update_user(&self, id: ObjectId, update: Document) -> Result<Option<User>, Problem> {
        self.collection::<User>(USER_COLLECTION_NAME)
            .find_one_and_update(
                filter::by_id(id),
                update,
                FindOneAndUpdateOptions::builder()
                    .return_document(ReturnDocument::After)
                    .build(),
            )
            .await
            .map_err(Problem::from)
    }

    async fn backfill_default_avatars(
        &self,
        avatar: impl AsRef<str>,
    ) -> mongodb::error::Result<UpdateResult> {
        self.collection::<Document>(USER_COLLECTION_NAME)
            .update_many(
                doc! {
                    "$or": [
                        { "avatar": { "$exists": false } },
                        { "avatar": null },
                        { "avatar": "" },
                    ]
                },
                doc! { "$set": { "avatar": avatar.as_ref() } },
                None,
            )
            .await
    }
}
