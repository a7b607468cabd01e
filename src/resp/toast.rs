use base64::Engine;
use rocket::http::Header;
use rocket::response::{self, Responder};
use rocket::Request;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::util::base64_engine;

/// Response header the front-end turns into a `show-toast` event.
pub static TOAST_HEADER_NAME: &str = "X-Toast";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Error,
    Success,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Toast {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: ToastKind,
}

impl Toast {
    pub fn new(kind: ToastKind, message: impl ToString) -> Toast {
        Toast {
            message: message.to_string(),
            kind,
        }
    }

    pub fn success(message: impl ToString) -> Toast {
        Toast::new(ToastKind::Success, message)
    }

    pub fn info(message: impl ToString) -> Toast {
        Toast::new(ToastKind::Info, message)
    }

    /// Header value: base64url of the JSON payload, so non-ASCII messages survive.
    pub fn header_value(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        base64_engine().encode(json)
    }

    pub fn decode_header(value: &str) -> Option<Toast> {
        let bytes = base64_engine().decode(value).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

/// Wraps a responder and attaches a toast for the portal to show.
#[derive(Debug)]
pub struct Toasted<R> {
    pub inner: R,
    pub toast: Toast,
}

impl<R> Toasted<R> {
    pub fn new(inner: R, toast: Toast) -> Toasted<R> {
        Toasted { inner, toast }
    }
}

impl<'r, R: Responder<'r, 'static>> Responder<'r, 'static> for Toasted<R> {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let mut response = self.inner.respond_to(req)?;
        response.set_header(Header::new(TOAST_HEADER_NAME, self.toast.header_value()));
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toast_payload_uses_type_key() {
        let json = serde_json::to_value(Toast::success("Đã lưu")).unwrap();
        assert_eq!(json, serde_json::json!({ "message": "Đã lưu", "type": "success" }));
    }

    #[test]
    fn header_value_is_ascii_and_decodes() {
        let toast = Toast::new(ToastKind::Error, "Lớp học đã đầy");
        let value = toast.header_value();

        assert!(value.is_ascii());
        assert_eq!(Toast::decode_header(&value), Some(toast));
    }
}
