use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rocket::Request;
use serde::Serialize;
use serde_json::{Map, Value};

/// JSON responder for database records.
///
/// BSON object ids serialize as `{"$oid": "<hex>"}`; clients get the bare hex string instead.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

impl<'r, T: Serialize> Responder<'r, 'static> for ApiJson<T> {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let value = serde_json::to_value(&self.0).map_err(|e| {
            tracing::error!("Unable to serialize response: {}", e);
            Status::InternalServerError
        })?;

        Json(plain_object_ids(value)).respond_to(req)
    }
}

pub fn plain_object_ids(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(hex)) = map.get("$oid") {
                    return Value::String(hex.clone());
                }
            }
            Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, plain_object_ids(v)))
                    .collect::<Map<String, Value>>(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(plain_object_ids).collect()),
        other => other,
    }
}
