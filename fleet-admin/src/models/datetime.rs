//! BSON datetime adapters for optional chrono timestamps.

pub mod opt_chrono_datetime_as_bson_datetime {
    use chrono::{DateTime, Utc};
    use mongodb::bson;
    use serde::{self, Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(dt) => {
                let bson_dt = bson::DateTime::from_chrono(*dt);
                bson_dt.serialize(serializer)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt: Option<bson::DateTime> = Option::deserialize(deserializer)?;
        Ok(opt.map(|dt| dt.to_chrono()))
    }
}

pub use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;

/// Convert a chrono timestamp for use inside a `doc!` filter or update.
pub fn bson_date(dt: chrono::DateTime<chrono::Utc>) -> mongodb::bson::Bson {
    mongodb::bson::Bson::DateTime(mongodb::bson::DateTime::from_chrono(dt))
}
