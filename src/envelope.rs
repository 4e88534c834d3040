//! Recognition of the two list-response shapes the admin API produces.
//!
//! Older endpoints wrap results as `{status, data, pagination}`; newer ones
//! return the framework paginator as-is (`{current_page, last_page, per_page,
//! total, data}`). Both are normalized into [`PageResult`].

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::AdminError;
use crate::pagination::{PageRequest, PageResult};
use crate::{value_str, value_u64};

#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEnvelope {
    /// `{status: true, data: [...], pagination: {...}?}`
    TaggedSuccess {
        data: Vec<Value>,
        pagination: Option<Value>,
    },
    /// `{status: false, message?}`
    TaggedFailure { message: String },
    /// `{current_page, last_page?, per_page?, total?, data: [...]}`
    BarePaginator { data: Vec<Value>, meta: Value },
    Unrecognized(String),
}

impl RemoteEnvelope {
    /// Discriminate a response body. Runs once per response.
    pub fn classify(body: Value) -> Self {
        let mut map = match body {
            Value::Object(map) => map,
            Value::Null => return RemoteEnvelope::Unrecognized("empty body".into()),
            Value::Array(_) => return RemoteEnvelope::Unrecognized("bare array".into()),
            other => {
                return RemoteEnvelope::Unrecognized(format!("unexpected JSON value {other}"))
            }
        };

        if let Some(status) = map.get("status").and_then(Value::as_bool) {
            if !status {
                let message = value_str(&Value::Object(map), &["message", "error"])
                    .unwrap_or_else(|| "List request was rejected".to_string());
                return RemoteEnvelope::TaggedFailure { message };
            }
            return match map.remove("data") {
                Some(Value::Array(data)) => RemoteEnvelope::TaggedSuccess {
                    data,
                    pagination: map.remove("pagination").filter(Value::is_object),
                },
                _ => RemoteEnvelope::Unrecognized("status wrapper without a data array".into()),
            };
        }

        if map.contains_key("current_page") {
            return match map.remove("data") {
                Some(Value::Array(data)) => RemoteEnvelope::BarePaginator {
                    data,
                    meta: Value::Object(map),
                },
                _ => RemoteEnvelope::Unrecognized("paginator without a data array".into()),
            };
        }

        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        RemoteEnvelope::Unrecognized(format!("unknown keys [{}]", keys.join(", ")))
    }

    /// Normalize into a page, deserializing every row into `T`.
    pub fn into_page<T: DeserializeOwned>(
        self,
        request: &PageRequest,
    ) -> Result<PageResult<T>, AdminError> {
        let (data, meta) = match self {
            RemoteEnvelope::TaggedSuccess { data, pagination } => {
                let meta = pagination.unwrap_or_else(|| Value::Object(Map::new()));
                (data, meta)
            }
            RemoteEnvelope::BarePaginator { data, meta } => (data, meta),
            RemoteEnvelope::TaggedFailure { message } => {
                return Err(AdminError::Rejected {
                    message,
                    errors: Default::default(),
                })
            }
            RemoteEnvelope::Unrecognized(reason) => return Err(AdminError::Format(reason)),
        };

        let received = data.len() as u64;
        let items = data
            .into_iter()
            .enumerate()
            .map(|(i, row)| {
                serde_json::from_value::<T>(row)
                    .map_err(|e| AdminError::Format(format!("row {i} could not be decoded: {e}")))
            })
            .collect::<Result<Vec<T>, AdminError>>()?;

        let page_size = value_u64(&meta, &["per_page", "perPage"])
            .filter(|n| *n > 0)
            .unwrap_or(request.page_size as u64);
        let total = value_u64(&meta, &["total"]).unwrap_or(received);
        let last_page = value_u64(&meta, &["last_page", "lastPage"])
            .unwrap_or_else(|| total.div_ceil(page_size).max(1));
        let current_page =
            value_u64(&meta, &["current_page", "currentPage"]).unwrap_or(request.page as u64);

        Ok(PageResult::from_parts(
            items,
            current_page,
            last_page,
            page_size,
            total,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(page: i64) -> PageRequest {
        PageRequest::new(page, "", 10, 10)
    }

    #[test]
    fn test_classify_tagged_success() {
        let body = json!({
            "status": true,
            "data": [{"id": 1}, {"id": 2}],
            "pagination": {"current_page": 2, "last_page": 4, "per_page": 2, "total": 8}
        });
        let env = RemoteEnvelope::classify(body);
        assert!(matches!(env, RemoteEnvelope::TaggedSuccess { ref data, .. } if data.len() == 2));

        let page: PageResult<Value> = env.into_page(&request(2)).expect("page");
        assert_eq!(page.current_page, 2);
        assert_eq!(page.last_page, 4);
        assert_eq!(page.page_size, 2);
        assert_eq!(page.total, 8);
        assert_eq!(page.items.len(), 2);
    }

    #[test]
    fn test_tagged_success_without_pagination_uses_request() {
        let body = json!({ "status": true, "data": [{"id": 1}] });
        let page: PageResult<Value> = RemoteEnvelope::classify(body)
            .into_page(&request(1))
            .expect("page");
        assert_eq!(
            (page.current_page, page.last_page, page.page_size, page.total),
            (1, 1, 10, 1)
        );
    }

    #[test]
    fn test_classify_bare_paginator_with_string_numbers() {
        let body = json!({
            "current_page": "3",
            "last_page": 5,
            "per_page": "10",
            "total": 47,
            "data": [{"id": 21}],
            "next_page_url": "http://localhost:8000/api/admin/getorders?page=4"
        });
        let env = RemoteEnvelope::classify(body);
        assert!(matches!(env, RemoteEnvelope::BarePaginator { .. }));
        let page: PageResult<Value> = env.into_page(&request(3)).expect("page");
        assert_eq!((page.current_page, page.last_page, page.total), (3, 5, 47));
    }

    #[test]
    fn test_bare_paginator_derives_last_page_from_total() {
        let body = json!({ "current_page": 1, "per_page": 10, "total": 21, "data": [] });
        let page: PageResult<Value> = RemoteEnvelope::classify(body)
            .into_page(&request(1))
            .expect("page");
        assert_eq!(page.last_page, 3);
    }

    #[test]
    fn test_classify_tagged_failure() {
        let env = RemoteEnvelope::classify(json!({ "status": false, "message": "Server busy" }));
        assert_eq!(
            env,
            RemoteEnvelope::TaggedFailure {
                message: "Server busy".into()
            }
        );
        let err = env.into_page::<Value>(&request(1)).unwrap_err();
        assert_eq!(err.to_string(), "Server busy");
    }

    #[test]
    fn test_unrecognized_shapes_are_format_errors() {
        for body in [
            json!({ "items": [], "page": 1 }),
            json!([1, 2, 3]),
            Value::Null,
            json!({ "status": true, "data": "nope" }),
            json!({ "current_page": 1 }),
        ] {
            let env = RemoteEnvelope::classify(body);
            assert!(matches!(env, RemoteEnvelope::Unrecognized(_)));
            assert!(env.into_page::<Value>(&request(1)).unwrap_err().is_format());
        }
    }

    #[test]
    fn test_undecodable_rows_are_format_errors() {
        #[derive(Debug, serde::Deserialize)]
        struct Row {
            #[allow(dead_code)]
            id: u32,
        }
        let body = json!({ "status": true, "data": [{"id": 1}, {"id": "x"}] });
        let err = RemoteEnvelope::classify(body)
            .into_page::<Row>(&request(1))
            .unwrap_err();
        assert!(err.is_format());
        assert!(err.to_string().contains("row 1"));
    }
}
