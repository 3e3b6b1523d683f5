//! One module per back-office resource: its slice, actions, reducer,
//! selectors and intents.

use std::collections::BTreeMap;

use serde_json::Value;
use shared::protocol::id_of;

use crate::transport::ApiRequest;

pub mod comments;
pub mod contacts;
pub mod invoices;
pub mod leases;
pub mod rent_basis;

/// Parameters of a collection fetch. Every field is optional; `None` leaves
/// the server default in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Free-text search (`search=`).
    pub search: Option<String>,
    /// 1-based page number (`page=`). Server default: first page.
    pub page: Option<u32>,
    /// Page size (`page_size=`). Server default applies when unset.
    pub page_size: Option<u32>,
    /// Sort field, `-` prefix for descending (`ordering=`).
    pub ordering: Option<String>,
    /// Resource-specific filters sent verbatim.
    pub filters: BTreeMap<String, String>,
}

impl ListQuery {
    pub fn search(text: impl Into<String>) -> Self {
        Self {
            search: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    pub fn apply(&self, request: ApiRequest) -> ApiRequest {
        let request = request
            .query_opt("search", self.search.as_deref())
            .query_opt("page", self.page)
            .query_opt("page_size", self.page_size)
            .query_opt("ordering", self.ordering.as_deref());
        self.filters
            .iter()
            .fold(request, |request, (key, value)| request.query(key, value))
    }
}

/// Replaces the record with the same `id`, or appends it.
pub(crate) fn upsert_by_id(items: &mut Vec<Value>, entity: Value) {
    let id = id_of(&entity);
    match items
        .iter_mut()
        .find(|existing| id.is_some() && id_of(existing) == id)
    {
        Some(existing) => *existing = entity,
        None => items.push(entity),
    }
}

pub(crate) fn remove_by_id(items: &mut Vec<Value>, id: i64) {
    items.retain(|existing| id_of(existing) != Some(id));
}

/// Sets `field` on an object payload; other payloads pass through.
pub(crate) fn with_field(mut body: Value, field: &str, value: impl Into<Value>) -> Value {
    if let Value::Object(map) = &mut body {
        map.insert(field.to_string(), value.into());
    }
    body
}
