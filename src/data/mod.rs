use bson::oid::ObjectId;
use chrono::NaiveDate;
use mongodb::Cursor;
use rocket::futures::TryStreamExt;
use rocket::request::FromParam;
use serde::de::DeserializeOwned;

use crate::resp::problem::{problems, Problem};

pub mod attendance;
pub mod class;
pub mod course;
pub mod document;
pub mod filter;
pub mod product;
pub mod request;
pub mod user;

/// Object id taken from a path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdParam(pub ObjectId);

impl<'a> FromParam<'a> for IdParam {
    type Error = Problem;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        parse_id("id", param).map(IdParam)
    }
}

pub fn parse_id(field: &str, value: &str) -> Result<ObjectId, Problem> {
    ObjectId::parse_str(value).map_err(|_| {
        problems::bad_request("Bad id.", format!("'{}' is not a valid {}.", value, field))
            .insert_str("field", field)
            .to_owned()
    })
}

pub fn parse_ids<'a>(field: &str, values: impl IntoIterator<Item = &'a String>) -> Result<Vec<ObjectId>, Problem> {
    values.into_iter().map(|it| parse_id(field, it)).collect()
}

pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate, Problem> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| problems::bad_date(field, value))
}

pub async fn collect<T>(cursor: Cursor<T>) -> Result<Vec<T>, Problem>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    cursor.try_collect().await.map_err(Problem::from)
}

pub fn inserted_id(result: &mongodb::results::InsertOneResult) -> Option<ObjectId> {
    result.inserted_id.as_object_id()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::http::Status;

    #[test]
    fn ids_parse_from_hex() {
        let id = ObjectId::new();
        assert_eq!(parse_id("classId", &id.to_hex()).unwrap(), id);

        let err = parse_id("classId", "not-an-id").unwrap_err();
        assert_eq!(err.status, Status::BadRequest);
        assert_eq!(err.body["field"], "classId");
    }

    #[test]
    fn dates_use_iso_format() {
        assert_eq!(
            parse_date("sessionDate", "2024-10-05").unwrap(),
            NaiveDate::from_ymd_opt(2024, 10, 5).unwrap()
        );
        assert!(parse_date("sessionDate", "05/10/2024").is_err());
    }
}
