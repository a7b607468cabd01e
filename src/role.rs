use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Portal role. Teachers manage everything, students see their own records.
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
}

impl Role {
    /// Indicates whether user with role can manage courses, classes and records
    pub fn can_manage(self) -> bool {
        self >= Role::Teacher
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Student
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Role> for bson::Bson {
    fn from(role: Role) -> Self {
        bson::Bson::String(role.as_str().to_string())
    }
}

impl<'v> rocket::form::FromFormField<'v> for Role {
    fn from_value(field: rocket::form::ValueField<'v>) -> rocket::form::Result<'v, Self> {
        match field.value {
            "student" => Ok(Role::Student),
            "teacher" => Ok(Role::Teacher),
            other => Err(rocket::form::Error::validation(format!("unknown role '{}'", other)).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn teachers_outrank_students() {
        assert!(Role::Teacher > Role::Student);
        assert!(Role::Teacher.can_manage());
        assert!(!Role::Student.can_manage());
    }

    #[test]
    fn role_wire_names_are_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Teacher).unwrap(), "\"teacher\"");
        let role: Role = serde_json::from_str("\"student\"").unwrap();
        assert_eq!(role, Role::Student);
    }
}
