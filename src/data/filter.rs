use bson::oid::ObjectId;
use bson::{doc, Document};

#[inline]
pub fn by_id(id: ObjectId) -> Document {
    doc! { "_id": id }
}

#[inline]
pub fn by_username(username: impl AsRef<str>) -> Document {
    doc! { "username": username.as_ref() }
}

/// Adds `key: value` to `filter` when `value` is set.
pub fn with_optional<V: Into<bson::Bson>>(mut filter: Document, key: &str, value: Option<V>) -> Document {
    if let Some(value) = value {
        filter.insert(key, value.into());
    }
    filter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_members_are_skipped() {
        let id = ObjectId::new();
        let filter = with_optional(doc! {}, "classId", Some(id));
        let filter = with_optional::<String>(filter, "status", None);

        assert_eq!(filter, doc! { "classId": id });
    }
}
