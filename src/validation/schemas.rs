//! Reusable field rules and the request schemas of the HTTP routes.

use super::{NumberRule, RequestSchema, Schema, StringRule};

/// Largest integer a JavaScript client can represent exactly.
pub const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

pub fn page() -> NumberRule {
    NumberRule::new().optional().integer().min(1.0).max(MAX_SAFE_INTEGER)
}

pub fn limit() -> NumberRule {
    NumberRule::new().optional().integer().min(1.0).max(100.0)
}

pub fn id() -> NumberRule {
    NumberRule::new().integer().min(1.0).max(MAX_SAFE_INTEGER)
}

pub fn email() -> StringRule {
    StringRule::email()
}

pub fn name() -> StringRule {
    StringRule::new().min_length(1).max_length(100)
}

pub fn message() -> StringRule {
    StringRule::new().min_length(1).max_length(1000)
}

pub fn pagination() -> Schema {
    Schema::new().field("page", page()).field("limit", limit())
}

pub fn id_params() -> RequestSchema {
    RequestSchema::new().params(Schema::new().field("id", id()))
}

pub fn list_users() -> RequestSchema {
    RequestSchema::new().query(pagination())
}

pub fn create_user() -> RequestSchema {
    RequestSchema::new().body(
        Schema::new()
            .field("name", StringRule::new().min_length(1).max_length(50))
            .field("email", email().optional())
            .field("avatar", StringRule::url().optional().max_length(2048)),
    )
}

/// Every field optional; an empty value leaves the stored one untouched.
pub fn update_user() -> RequestSchema {
    id_params().body(
        Schema::new()
            .field("name", StringRule::new().optional().min_length(1).max_length(50))
            .field("email", email().optional())
            .field("avatar", StringRule::url().optional().max_length(2048)),
    )
}

pub fn get_hello() -> RequestSchema {
    RequestSchema::new().query(Schema::new().field("name", name().optional()))
}

pub fn create_hello() -> RequestSchema {
    RequestSchema::new()
        .body(Schema::new().field("name", name()).field("message", message().optional()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_user_rejects_empty_name() {
        let errors = create_user().validate(Some(&json!({ "name": "" })), &json!({}), &json!({})).unwrap_err();
        assert_eq!(errors, vec!["name is required".to_string()]);
    }

    #[test]
    fn pagination_query_coerces_strings() {
        let v = list_users().validate(None, &json!({ "page": "2", "limit": "10", "sort": "x" }), &json!({})).unwrap();
        assert_eq!(v.query, Some(json!({ "page": 2, "limit": 10 })));
        assert!(v.body.is_none());
    }

    #[test]
    fn id_params_reject_non_numeric() {
        let errors = id_params().validate(None, &json!({}), &json!({ "id": "abc" })).unwrap_err();
        assert_eq!(errors, vec!["id must be a valid number".to_string()]);
    }

    #[test]
    fn ids_beyond_safe_integer_range_are_rejected() {
        for id in ["1e20", "9007199254740993"] {
            let errors = id_params().validate(None, &json!({}), &json!({ "id": id })).unwrap_err();
            assert_eq!(errors, vec!["id must be no more than 9007199254740991".to_string()], "accepted {id}");
        }
        let v = id_params().validate(None, &json!({}), &json!({ "id": "9007199254740991" })).unwrap();
        assert_eq!(v.params, Some(json!({ "id": 9_007_199_254_740_991_i64 })));
    }

    #[test]
    fn failures_across_parts_are_all_reported() {
        let errors = update_user()
            .validate(Some(&json!({ "email": "bad", "role": "admin" })), &json!({}), &json!({ "id": "0" }))
            .unwrap_err();
        assert_eq!(
            errors,
            vec!["email format is invalid, Unknown property: role".to_string(), "id must be at least 1".to_string()]
        );
    }
}
