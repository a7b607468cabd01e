use base64::Engine;
use bson::oid::ObjectId;
use chrono::{DateTime, NaiveDate, Utc};
use crypto::bcrypt::bcrypt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::convert::{TryFrom, TryInto};
use utoipa::ToSchema;

use crate::role::Role;
use crate::security::Salt;
use crate::util::base64_engine;

pub mod db;

pub static USER_COLLECTION_NAME: &str = "users";

const BCRYPT_COST: u32 = 10;

/// bcrypt over the SHA-256 of the password, so passwords of any length fit bcrypt's input.
#[derive(Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PasswordHash([u8; 24]);

impl PasswordHash {
    pub fn new(password: impl AsRef<str>, salt: &Salt) -> PasswordHash {
        let mut pw_hash: [u8; 24] = [0; 24];

        let mut sha = Sha256::new();
        sha2::Digest::update(&mut sha, password.as_ref().as_bytes());

        bcrypt(BCRYPT_COST, salt, sha.finalize().as_slice(), &mut pw_hash);

        PasswordHash(pw_hash)
    }

    pub fn verify(&self, password: impl AsRef<str>, salt: &Salt) -> bool {
        *self == PasswordHash::new(password, salt)
    }
}

impl std::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordHash(..)")
    }
}

impl From<PasswordHash> for String {
    fn from(pw_hash: PasswordHash) -> Self {
        base64_engine().encode(pw_hash.0)
    }
}

impl TryFrom<String> for PasswordHash {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let bytes = base64_engine()
            .decode(value)
            .map_err(|e| format!("password hash isn't base64: {}", e))?;
        let array: [u8; 24] = bytes
            .try_into()
            .map_err(|_| "password hash has an unexpected length".to_string())?;
        Ok(PasswordHash(array))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub username: String,
    pub password: PasswordHash,
    #[serde(default)]
    pub role: Role,
    #[serde(flatten)]
    pub profile: Profile,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(
        username: impl ToString,
        password: impl AsRef<str>,
        role: Role,
        profile: Profile,
        salt: &Salt,
    ) -> User {
        let now = Utc::now();
        User {
            id: None,
            username: username.to_string(),
            password: PasswordHash::new(password, salt),
            role,
            profile,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    pub fn is_student(&self) -> bool {
        self.role == Role::Student
    }
}

/// User as returned by the API, without the password hash.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[serde(rename = "_id")]
    #[schema(value_type = Option<String>)]
    pub id: Option<ObjectId>,
    pub username: String,
    pub role: Role,
    #[serde(flatten)]
    pub profile: Profile,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            username: user.username,
            role: user.role,
            profile: user.profile,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies_only_the_same_password_and_salt() {
        let salt: Salt = [7; 16];
        let hash = PasswordHash::new("d0n't-f3r3t-m3", &salt);

        assert!(hash.verify("d0n't-f3r3t-m3", &salt));
        assert!(!hash.verify("dont-fret-me", &salt));
        assert!(!hash.verify("d0n't-f3r3t-m3", &[8; 16]));
    }

    #[test]
    fn password_hash_is_stored_as_base64() {
        let hash = PasswordHash([42; 24]);
        let stored = bson::to_bson(&hash).unwrap();

        let text = stored.as_str().expect("hash should be a string");
        let back: PasswordHash = bson::from_bson(bson::Bson::String(text.to_string())).unwrap();
        assert_eq!(back, hash);

        assert!(bson::from_bson::<PasswordHash>(bson::Bson::String("short".into())).is_err());
    }

    #[test]
    fn user_documents_use_camel_case_and_flat_profile() {
        let mut user = User::new(
            "linh",
            "12345678",
            Role::Student,
            Profile {
                full_name: "Trần Linh".to_string(),
                ..Default::default()
            },
            &[1; 16],
        );
        user.id = Some(ObjectId::new());

        let document = bson::to_document(&user).unwrap();
        assert_eq!(document.get_str("fullName").unwrap(), "Trần Linh");
        assert_eq!(document.get_str("role").unwrap(), "student");
        assert!(document.contains_key("createdAt"));
        assert!(document.get_object_id("_id").is_ok());

        let back: User = bson::from_document(document).unwrap();
        assert_eq!(back.profile.full_name, "Trần Linh");
        assert_eq!(back.id, user.id);
    }

    #[test]
    fn response_hides_password() {
        let user = User::new("linh", "12345678", Role::Teacher, Profile::default(), &[1; 16]);
        let json = serde_json::to_value(UserResponse::from(user)).unwrap();

        assert!(json.get("password").is_none());
        assert_eq!(json["role"], "teacher");
        assert_eq!(json["username"], "linh");
    }
}
