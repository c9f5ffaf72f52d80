pub mod alerts;
pub mod analytics;
pub mod assignments;
pub mod bikes;
pub mod health;
pub mod maintenance;
pub mod payments;
pub mod riders;
pub mod tickets;

use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{doc, to_bson, Bson, Document};
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
use mongodb::Collection;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::datetime::bson_date;
use fleet_core::error::AppError;
use fleet_core::pagination::{Page, Pagination};

/// Options that make `find_one_and_update` return the updated document.
pub(crate) fn return_updated() -> FindOneAndUpdateOptions {
    FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build()
}

/// Run one page of a filtered, sorted listing along with its total count.
pub(crate) async fn fetch_page<T>(
    collection: &Collection<T>,
    filter: Document,
    page: &Page,
) -> Result<(Vec<T>, Pagination), AppError>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    let total = collection.count_documents(filter.clone(), None).await?;
    let items: Vec<T> = collection
        .find(filter, page.find_options())
        .await?
        .try_collect()
        .await?;
    Ok((items, page.pagination(total)))
}

/// Fetch by id regardless of the soft-delete flag.
pub(crate) async fn find_by_id<T>(
    collection: &Collection<T>,
    entity: &str,
    id: &str,
) -> Result<T, AppError>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    collection
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| AppError::not_found(entity, id))
}

/// Fetch by id, treating soft-deleted documents as missing.
pub(crate) async fn find_active<T>(
    collection: &Collection<T>,
    entity: &str,
    id: &str,
) -> Result<T, AppError>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    collection
        .find_one(doc! { "_id": id, "is_active": true }, None)
        .await?
        .ok_or_else(|| AppError::not_found(entity, id))
}

/// Builds a `$set` from the fields present in a partial update.
pub(crate) struct Changes {
    set: Document,
}

impl Changes {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            set: doc! { "updated_at": bson_date(now) },
        }
    }

    pub fn value(mut self, key: &str, value: Option<impl Into<Bson>>) -> Self {
        if let Some(value) = value {
            self.set.insert(key, value.into());
        }
        self
    }

    pub fn date(mut self, key: &str, value: Option<DateTime<Utc>>) -> Self {
        if let Some(value) = value {
            self.set.insert(key, bson_date(value));
        }
        self
    }

    pub fn nested<T: Serialize>(mut self, key: &str, value: Option<&T>) -> Result<Self, AppError> {
        if let Some(value) = value {
            self.set.insert(key, to_bson(value)?);
        }
        Ok(self)
    }

    pub fn into_update(self) -> Document {
        doc! { "$set": self.set }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_present_fields_are_set() {
        let now = Utc::now();
        let update = Changes::new(now)
            .value("name", Some("Asha"))
            .value("email", None::<String>)
            .date("due_date", Some(now))
            .into_update();

        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_str("name").unwrap(), "Asha");
        assert!(!set.contains_key("email"));
        assert!(set.contains_key("due_date"));
        assert!(set.contains_key("updated_at"));
    }
}
