use bson::oid::ObjectId;
use bson::{doc, Document};
use chrono::{NaiveDate, Utc};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::Database;
use serde::Deserialize;
use utoipa::ToSchema;

use super::{RequestKind, RequestStatus, StudentRequest};
use crate::data::{collect, filter, inserted_id, parse_id};
use crate::resp::problem::{problems, Problem};

pub mod problem {
    use super::super::{RequestKind, RequestStatus};
    use crate::resp::problem::Problem;
    use rocket::http::Status;

    #[inline]
    pub fn not_found(kind: RequestKind, id: impl ToString) -> Problem {
        Problem::new_untyped(Status::NotFound, format!("{} doesn't exist.", kind.title()))
            .insert_str("id", id)
            .to_owned()
    }

    #[inline]
    pub fn already_reviewed(kind: RequestKind, status: RequestStatus) -> Problem {
        Problem::new_untyped(Status::Conflict, format!("{} was already reviewed.", kind.title()))
            .insert_str("status", status.as_str())
            .to_owned()
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestData {
    /// Defaults to the requesting user.
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub enrollment_id: Option<String>,
    pub class_id: String,
    #[schema(value_type = String, format = Date)]
    pub session_date: NaiveDate,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub makeup_class_id: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>, format = Date)]
    pub makeup_date: Option<NaiveDate>,
}

fn parse_optional_id(field: &str, value: Option<&str>) -> Result<Option<ObjectId>, Problem> {
    value.map(|it| parse_id(field, it)).transpose()
}

impl RequestData {
    pub fn into_request(
        self,
        kind: RequestKind,
        student_id: ObjectId,
        status: RequestStatus,
    ) -> Result<StudentRequest, Problem> {
        let (makeup_class_id, makeup_date) = match kind {
            RequestKind::Absence => (None, None),
            RequestKind::Makeup => (
                parse_optional_id("makeupClassId", self.makeup_class_id.as_deref())?,
                self.makeup_date,
            ),
        };

        let now = Utc::now();
        Ok(StudentRequest {
            id: None,
            student_id,
            enrollment_id: parse_optional_id("enrollmentId", self.enrollment_id.as_deref())?,
            class_id: parse_id("classId", &self.class_id)?,
            session_date: self.session_date,
            reason: self.reason,
            status,
            reviewed_by: None,
            makeup_class_id,
            makeup_date,
            created_at: Some(now),
            updated_at: Some(now),
        })
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReviewData {
    pub status: RequestStatus,
}

impl ReviewData {
    pub fn validate(&self) -> Result<(), Problem> {
        if self.status == RequestStatus::Pending {
            return Err(problems::bad_request(
                "Bad review.",
                "A review must approve or reject the request.",
            ));
        }
        Ok(())
    }
}

fn review_update(status: RequestStatus, reviewer: ObjectId) -> Document {
    doc! {
        "$set": {
            "status": status,
            "reviewedBy": reviewer,
            "updatedAt": Utc::now().to_rfc3339(),
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait RequestDbExt {
    async fn create_request(
        &self,
        kind: RequestKind,
        request: StudentRequest,
    ) -> Result<StudentRequest, Problem>;

    async fn get_request(
        &self,
        kind: RequestKind,
        id: ObjectId,
    ) -> Result<Option<StudentRequest>, Problem>;

    async fn list_requests(
        &self,
        kind: RequestKind,
        status: Option<RequestStatus>,
        class_id: Option<ObjectId>,
        student_id: Option<ObjectId>,
    ) -> Result<Vec<StudentRequest>, Problem>;

    /// Moves a pending request to `status`. Requests that were already decided are a conflict.
    async fn review_request(
        &self,
        kind: RequestKind,
        id: ObjectId,
        status: RequestStatus,
        reviewer: ObjectId,
    ) -> Result<StudentRequest, Problem>;
}

impl RequestDbExt for Database {
    async fn create_request(
        &self,
        kind: RequestKind,
        mut request: StudentRequest,
    ) -> Result<StudentRequest, Problem> {
        let result = self
            .collection::<StudentRequest>(kind.collection())
            .insert_one(&request, None)
            .await?;
        request.id = inserted_id(&result);

        tracing::info!(
            "{} filed by {} for {}",
            kind.title(),
            request.student_id,
            request.session_date
        );
        Ok(request)
    }

    async fn get_request(
        &self,
        kind: RequestKind,
        id: ObjectId,
    ) -> Result<Option<StudentRequest>, Problem> {
        self.collection(kind.collection())
            .find_one(filter::by_id(id), None)
            .await
            .map_err(Problem::from)
    }

    async fn list_requests(
        &self,
        kind: RequestKind,
        status: Option<RequestStatus>,
        class_id: Option<ObjectId>,
        student_id: Option<ObjectId>,
    ) -> Result<Vec<StudentRequest>, Problem> {
        let query = filter::with_optional(doc! {}, "status", status);
        let query = filter::with_optional(query, "classId", class_id);
        let query = filter::with_optional(query, "studentId", student_id);

        let cursor = self
            .collection::<StudentRequest>(kind.collection())
            .find(
                query,
                FindOptions::builder().sort(doc! { "createdAt": -1 }).build(),
            )
            .await?;

        collect(cursor).await
    }

    async fn review_request(
        &self,
        kind: RequestKind,
        id: ObjectId,
        status: RequestStatus,
        reviewer: ObjectId,
    ) -> Result<StudentRequest, Problem> {
        let reviewed = self
            .collection::<StudentRequest>(kind.collection())
            .find_one_and_update(
                doc! { "_id": id, "status": RequestStatus::Pending },
                review_update(status, reviewer),
                FindOneAndUpdateOptions::builder()
                    .return_document(ReturnDocument::After)
                    .build(),
            )
            .await?;

        match reviewed {
            Some(request) => {
                tracing::info!("{} {} was {}", kind.title(), id, status.as_str());
                Ok(request)
            }
            None => match self.get_request(kind, id).await? {
                Some(existing) => Err(problem::already_reviewed(kind, existing.status)),
                None => Err(problem::not_found(kind, id)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::http::Status;

    fn data() -> RequestData {
        serde_json::from_value(serde_json::json!({
            "classId": ObjectId::new().to_hex(),
            "sessionDate": "2024-11-05",
            "reason": "Đi công tác",
            "makeupClassId": ObjectId::new().to_hex(),
            "makeupDate": "2024-11-09",
        }))
        .unwrap()
    }

    #[test]
    fn absence_requests_drop_makeup_fields() {
        let student = ObjectId::new();
        let request = data()
            .into_request(RequestKind::Absence, student, RequestStatus::Pending)
            .unwrap();

        assert_eq!(request.student_id, student);
        assert_eq!(request.status, RequestStatus::Pending);
        assert!(request.makeup_class_id.is_none());
        assert!(request.makeup_date.is_none());
    }

    #[test]
    fn makeup_requests_keep_makeup_fields() {
        let request = data()
            .into_request(RequestKind::Makeup, ObjectId::new(), RequestStatus::Approved)
            .unwrap();

        assert!(request.makeup_class_id.is_some());
        assert_eq!(request.makeup_date, NaiveDate::from_ymd_opt(2024, 11, 9));
        assert_eq!(request.status, RequestStatus::Approved);
    }

    #[test]
    fn bad_ids_are_rejected() {
        let mut data = data();
        data.class_id = "class-1".to_string();
        let err = data
            .into_request(RequestKind::Absence, ObjectId::new(), RequestStatus::Pending)
            .unwrap_err();

        assert_eq!(err.status, Status::BadRequest);
        assert_eq!(err.body["field"], "classId");
    }

    #[test]
    fn reviews_must_decide() {
        assert!(ReviewData { status: RequestStatus::Pending }.validate().is_err());
        assert!(ReviewData { status: RequestStatus::Approved }.validate().is_ok());

        let update = review_update(RequestStatus::Rejected, ObjectId::new());
        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_str("status").unwrap(), "rejected");
        assert!(set.get_object_id("reviewedBy").is_ok());
    }
}
