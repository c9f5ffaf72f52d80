//! Page/limit/sort query handling shared by every list endpoint.

use mongodb::bson::{doc, Document};
use mongodb::options::FindOptions;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;
pub const DEFAULT_SORT_FIELD: &str = "createdAt";

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    fn direction(self) -> i32 {
        match self {
            SortOrder::Asc => 1,
            SortOrder::Desc => -1,
        }
    }
}

/// Raw pagination query parameters (`?page=2&limit=20&sortBy=dueDate&sortOrder=asc`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
}

/// Maps an API sort key to the stored field name.
pub type SortableFields = &'static [(&'static str, &'static str)];

/// Validated pagination window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub page: u64,
    pub limit: u64,
    pub sort_field: String,
    pub sort_order: SortOrder,
}

impl PageParams {
    /// Clamp page/limit and translate `sortBy` through the entity's allow-list.
    pub fn resolve(&self, sortable: SortableFields) -> Result<Page, AppError> {
        let sort_key = self.sort_by.as_deref().unwrap_or(DEFAULT_SORT_FIELD);
        let sort_field = sortable
            .iter()
            .find(|(api, _)| *api == sort_key)
            .map(|(_, stored)| stored.to_string())
            .ok_or_else(|| {
                let allowed: Vec<&str> = sortable.iter().map(|(api, _)| *api).collect();
                AppError::BadRequest(anyhow::anyhow!(
                    "Cannot sort by '{}'; allowed: {}",
                    sort_key,
                    allowed.join(", ")
                ))
            })?;

        let page = self.page.unwrap_or(1).max(1);
        let limit = self
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);

        // The driver takes the skip as an i64.
        let in_range = (page - 1)
            .checked_mul(limit)
            .is_some_and(|skip| i64::try_from(skip).is_ok());
        if !in_range {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Page {} is out of range for limit {}",
                page,
                limit
            )));
        }

        Ok(Page {
            page,
            limit,
            sort_field,
            sort_order: self.sort_order.unwrap_or_default(),
        })
    }
}

impl Page {
    pub fn skip(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    /// Sort on the requested field with `_id` as a tiebreaker so pages never overlap.
    pub fn sort_document(&self) -> Document {
        let direction = self.sort_order.direction();
        let mut sort = Document::new();
        sort.insert(self.sort_field.as_str(), direction);
        if self.sort_field != "_id" {
            sort.insert("_id", direction);
        }
        sort
    }

    pub fn find_options(&self) -> FindOptions {
        FindOptions::builder()
            .sort(self.sort_document())
            .skip(self.skip())
            .limit(self.limit as i64)
            .build()
    }

    pub fn pagination(&self, total: u64) -> Pagination {
        Pagination {
            page: self.page,
            limit: self.limit,
            total,
            pages: total.div_ceil(self.limit),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub pages: u64,
}

/// Escape regex metacharacters so user input is matched literally.
pub fn escape_regex(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(
            c,
            '.' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '^' | '$' | '\\'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Case-insensitive substring match of `term` across any of `fields`.
pub fn search_filter(term: &str, fields: &[&str]) -> Option<Document> {
    let term = term.trim();
    if term.is_empty() {
        return None;
    }
    let pattern = escape_regex(term);
    let clauses: Vec<Document> = fields
        .iter()
        .map(|field| {
            let mut clause = Document::new();
            clause.insert(*field, doc! { "$regex": &pattern, "$options": "i" });
            clause
        })
        .collect();
    Some(doc! { "$or": clauses })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;

    const SORTABLE: SortableFields = &[("createdAt", "created_at"), ("dueDate", "due_date")];

    #[test]
    fn defaults_when_params_missing() {
        let page = PageParams::default().resolve(SORTABLE).unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(page.sort_field, "created_at");
        assert_eq!(page.sort_order, SortOrder::Desc);
        assert_eq!(page.skip(), 0);
    }

    #[test]
    fn limit_and_page_are_clamped() {
        let params = PageParams {
            page: Some(0),
            limit: Some(10_000),
            ..Default::default()
        };
        let page = params.resolve(SORTABLE).unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, MAX_PAGE_SIZE);

        let params = PageParams {
            page: Some(3),
            limit: Some(0),
            ..Default::default()
        };
        let page = params.resolve(SORTABLE).unwrap();
        assert_eq!(page.limit, 1);
        assert_eq!(page.skip(), 2);
    }

    #[test]
    fn page_past_the_skip_range_is_rejected() {
        let params = PageParams {
            page: Some(u64::MAX),
            limit: Some(100),
            ..Default::default()
        };
        let err = params.resolve(SORTABLE).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);

        // No overflow in u64, but still beyond what the driver accepts
        let params = PageParams {
            page: Some(100_000_000_000_000_000),
            limit: Some(100),
            ..Default::default()
        };
        assert!(matches!(
            params.resolve(SORTABLE),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn largest_valid_page_builds_find_options() {
        let limit = MAX_PAGE_SIZE;
        let page = PageParams {
            page: Some(i64::MAX as u64 / limit + 1),
            limit: Some(limit),
            ..Default::default()
        }
        .resolve(SORTABLE)
        .unwrap();
        assert!(page.skip() <= i64::MAX as u64);
        assert_eq!(page.find_options().skip, Some(page.skip()));
    }

    #[test]
    fn huge_page_from_query_string_is_rejected() {
        let uri: axum::http::Uri = "/riders?page=18446744073709551615&limit=100"
            .parse()
            .unwrap();
        let Query(params) = Query::<PageParams>::try_from_uri(&uri).unwrap();
        assert_eq!(params.page, Some(u64::MAX));
        assert!(matches!(
            params.resolve(SORTABLE),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn sort_key_is_translated_to_stored_field() {
        let params = PageParams {
            sort_by: Some("dueDate".to_string()),
            sort_order: Some(SortOrder::Asc),
            ..Default::default()
        };
        let page = params.resolve(SORTABLE).unwrap();
        assert_eq!(page.sort_document(), doc! { "due_date": 1, "_id": 1 });
    }

    #[test]
    fn unknown_sort_key_is_rejected() {
        let params = PageParams {
            sort_by: Some("password".to_string()),
            ..Default::default()
        };
        let err = params.resolve(SORTABLE).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(err.to_string().contains("createdAt, dueDate"));
    }

    #[test]
    fn pages_round_up() {
        let page = PageParams {
            limit: Some(10),
            ..Default::default()
        }
        .resolve(SORTABLE)
        .unwrap();
        assert_eq!(page.pagination(0).pages, 0);
        assert_eq!(page.pagination(10).pages, 1);
        assert_eq!(page.pagination(11).pages, 2);
    }

    #[test]
    fn regex_metacharacters_are_escaped() {
        assert_eq!(escape_regex("KA-01 (blue)"), r"KA-01 \(blue\)");
        assert_eq!(escape_regex("a.b*c"), r"a\.b\*c");
    }

    #[test]
    fn blank_search_yields_no_filter() {
        assert!(search_filter("   ", &["name"]).is_none());
        let filter = search_filter("ravi", &["name", "phone"]).unwrap();
        assert_eq!(filter.get_array("$or").unwrap().len(), 2);
    }
}
