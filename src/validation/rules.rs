use regex::Regex;
use serde_json::{Map, Number, Value};

use super::{FieldError, Rule, RuleResult, Schema};

lazy_static::lazy_static! {
    static ref EMAIL_PATTERN: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static email pattern");
    static ref URL_PATTERN: Regex = Regex::new(r"^https?://.+").expect("static url pattern");
}

/// `undefined`, `null` and `""` all count as "no value" for scalar rules.
fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

fn is_absent(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

fn fail(message: String) -> RuleResult {
    Err(FieldError(message))
}

#[derive(Debug, Clone)]
pub struct StringRule {
    pub required: bool,
    pub min_length: usize,
    pub max_length: usize,
    pub pattern: Option<Regex>,
    pub trim: bool,
}

impl Default for StringRule {
    fn default() -> Self {
        Self { required: true, min_length: 0, max_length: 255, pattern: None, trim: true }
    }
}

impl StringRule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Address pattern, at most 254 characters.
    pub fn email() -> Self {
        Self { pattern: Some(EMAIL_PATTERN.clone()), max_length: 254, ..Self::default() }
    }

    /// Requires an `http://` or `https://` prefix.
    pub fn url() -> Self {
        Self { pattern: Some(URL_PATTERN.clone()), ..Self::default() }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn min_length(mut self, n: usize) -> Self {
        self.min_length = n;
        self
    }

    pub fn max_length(mut self, n: usize) -> Self {
        self.max_length = n;
        self
    }

    pub fn pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }
}

impl Rule for StringRule {
    fn validate(&self, value: Option<&Value>, field: &str) -> RuleResult {
        if is_blank(value) {
            if self.required {
                return fail(format!("{} is required", field));
            }
            return Ok(Value::String(String::new()));
        }
        let Some(Value::String(raw)) = value else {
            return fail(format!("{} must be a string", field));
        };

        let s = if self.trim { raw.trim() } else { raw.as_str() };
        let len = s.chars().count();
        if len < self.min_length {
            return fail(format!("{} must be at least {} characters long", field, self.min_length));
        }
        if len > self.max_length {
            return fail(format!("{} must be no more than {} characters long", field, self.max_length));
        }
        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(s) {
                return fail(format!("{} format is invalid", field));
            }
        }
        Ok(Value::String(s.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct NumberRule {
    pub required: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub integer: bool,
}

impl Default for NumberRule {
    fn default() -> Self {
        Self { required: true, min: None, max: None, integer: false }
    }
}

impl NumberRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn integer(mut self) -> Self {
        self.integer = true;
        self
    }
}

/// Loose numeric coercion: numbers as-is, strings parsed (blank is 0), booleans 1/0.
fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            let t = s.trim();
            if t.is_empty() {
                0.0
            } else {
                t.parse::<f64>().unwrap_or(f64::NAN)
            }
        }
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => f64::NAN,
    }
}

/// Integral values inside the `i64` range are emitted as integers.
fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

impl Rule for NumberRule {
    fn validate(&self, value: Option<&Value>, field: &str) -> RuleResult {
        let Some(raw) = value.filter(|_| !is_blank(value)) else {
            if self.required {
                return fail(format!("{} is required", field));
            }
            return Ok(Value::Null);
        };

        let n = coerce_number(raw);
        if !n.is_finite() {
            return fail(format!("{} must be a valid number", field));
        }
        if self.integer && n.fract() != 0.0 {
            return fail(format!("{} must be an integer", field));
        }
        if let Some(min) = self.min {
            if n < min {
                return fail(format!("{} must be at least {}", field, min));
            }
        }
        if let Some(max) = self.max {
            if n > max {
                return fail(format!("{} must be no more than {}", field, max));
            }
        }
        Ok(number_value(n))
    }
}

#[derive(Clone, Default)]
pub struct ArrayRule {
    pub required: bool,
    pub min_length: usize,
    pub max_length: Option<usize>,
    item: Option<std::sync::Arc<dyn Rule>>,
}

impl ArrayRule {
    pub fn new() -> Self {
        Self { required: true, ..Self::default() }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn min_length(mut self, n: usize) -> Self {
        self.min_length = n;
        self
    }

    pub fn max_length(mut self, n: usize) -> Self {
        self.max_length = Some(n);
        self
    }

    /// Rule applied to every item, named `field[i]` in errors.
    pub fn items(mut self, rule: impl Rule + 'static) -> Self {
        self.item = Some(std::sync::Arc::new(rule));
        self
    }
}

impl std::fmt::Debug for ArrayRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayRule")
            .field("required", &self.required)
            .field("min_length", &self.min_length)
            .field("max_length", &self.max_length)
            .field("has_item_rule", &self.item.is_some())
            .finish()
    }
}

impl Rule for ArrayRule {
    fn validate(&self, value: Option<&Value>, field: &str) -> RuleResult {
        if is_absent(value) {
            if self.required {
                return fail(format!("{} is required", field));
            }
            return Ok(Value::Array(Vec::new()));
        }
        let Some(Value::Array(items)) = value else {
            return fail(format!("{} must be an array", field));
        };

        if items.len() < self.min_length {
            return fail(format!("{} must have at least {} items", field, self.min_length));
        }
        if let Some(max) = self.max_length {
            if items.len() > max {
                return fail(format!("{} must have no more than {} items", field, max));
            }
        }

        let Some(rule) = &self.item else {
            return Ok(Value::Array(items.clone()));
        };
        let mut normalized = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            normalized.push(rule.validate(Some(item), &format!("{}[{}]", field, i))?);
        }
        Ok(Value::Array(normalized))
    }
}

/// Validates a JSON object against a [`Schema`], collecting every field error.
#[derive(Clone, Debug)]
pub struct ObjectRule {
    pub required: bool,
    pub schema: Schema,
    pub allow_unknown: bool,
}

impl ObjectRule {
    pub fn new(schema: Schema) -> Self {
        Self { required: true, schema, allow_unknown: false }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn allow_unknown(mut self, allow: bool) -> Self {
        self.allow_unknown = allow;
        self
    }
}

impl Rule for ObjectRule {
    fn validate(&self, value: Option<&Value>, field: &str) -> RuleResult {
        if is_absent(value) {
            if self.required {
                return fail(format!("{} is required", field));
            }
            return Ok(Value::Object(Map::new()));
        }
        let Some(Value::Object(obj)) = value else {
            return fail(format!("{} must be an object", field));
        };

        let mut normalized = Map::new();
        let mut errors = Vec::new();
        for (key, rule) in self.schema.iter() {
            match rule.validate(obj.get(key), key) {
                Ok(v) => {
                    normalized.insert(key.to_string(), v);
                }
                Err(e) => errors.push(e.0),
            }
        }
        if !self.allow_unknown {
            for key in obj.keys() {
                if !self.schema.contains(key) {
                    errors.push(format!("Unknown property: {}", key));
                }
            }
        }

        if errors.is_empty() {
            Ok(Value::Object(normalized))
        } else {
            fail(errors.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn err(r: RuleResult) -> String {
        r.unwrap_err().0
    }

    #[test]
    fn required_string_rejects_missing_and_empty() {
        let rule = StringRule::new();
        for input in [None, Some(json!(null)), Some(json!(""))] {
            assert_eq!(err(rule.validate(input.as_ref(), "name")), "name is required");
        }
    }

    #[test]
    fn optional_string_normalizes_to_empty() {
        let rule = StringRule::new().optional().min_length(3);
        assert_eq!(rule.validate(None, "nick").unwrap(), json!(""));
        // Whitespace is a value; trimming leaves it too short
        assert_eq!(
            err(rule.validate(Some(&json!("  ")), "nick")),
            "nick must be at least 3 characters long"
        );
    }

    #[test]
    fn string_checks_in_order() {
        let rule = StringRule::new().min_length(2).max_length(4);
        assert_eq!(err(rule.validate(Some(&json!(12)), "code")), "code must be a string");
        assert_eq!(err(rule.validate(Some(&json!(" a ")), "code")), "code must be at least 2 characters long");
        assert_eq!(err(rule.validate(Some(&json!("abcde")), "code")), "code must be no more than 4 characters long");
        assert_eq!(rule.validate(Some(&json!("  abc ")), "code").unwrap(), json!("abc"));
    }

    #[test]
    fn string_length_counts_characters() {
        let rule = StringRule::new().max_length(2);
        assert_eq!(rule.validate(Some(&json!("🦀🦀")), "name").unwrap(), json!("🦀🦀"));
        assert!(rule.validate(Some(&json!("🦀🦀🦀")), "name").is_err());
    }

    #[test]
    fn large_integers_stay_integral() {
        let rule = NumberRule::new().integer();
        assert_eq!(rule.validate(Some(&json!("9007199254740993")), "n").unwrap(), json!(9_007_199_254_740_992_i64));
        assert!(rule.validate(Some(&json!("1e20")), "n").unwrap().is_f64());
    }

    #[test]
    fn string_without_trim_keeps_whitespace() {
        let rule = StringRule::new().trim(false);
        assert_eq!(rule.validate(Some(&json!(" x ")), "f").unwrap(), json!(" x "));
    }

    #[test]
    fn email_and_url_patterns() {
        let email = StringRule::email();
        assert!(email.validate(Some(&json!("a@b.io")), "email").is_ok());
        assert_eq!(err(email.validate(Some(&json!("a@b")), "email")), "email format is invalid");
        let long = format!("{}@example.com", "a".repeat(250));
        assert_eq!(err(email.validate(Some(&json!(long)), "email")), "email must be no more than 254 characters long");

        let url = StringRule::url();
        assert!(url.validate(Some(&json!("https://example.com/a.png")), "avatar").is_ok());
        assert!(url.validate(Some(&json!("http://x")), "avatar").is_ok());
        assert_eq!(err(url.validate(Some(&json!("ftp://x")), "avatar")), "avatar format is invalid");
    }

    #[test]
    fn number_parses_numeric_strings() {
        let rule = NumberRule::new();
        for (input, expected) in [("42", 42.0), ("-3.5", -3.5), (" 7 ", 7.0), ("1e3", 1000.0), ("0.25", 0.25)] {
            let v = rule.validate(Some(&json!(input)), "n").unwrap();
            assert_eq!(v.as_f64().unwrap(), expected, "input {input}");
        }
        assert_eq!(rule.validate(Some(&json!("42")), "n").unwrap(), json!(42));
    }

    #[test]
    fn number_rejects_non_numeric_strings() {
        let rule = NumberRule::new();
        for input in ["abc", "12abc", "NaN", "inf"] {
            assert_eq!(err(rule.validate(Some(&json!(input)), "n")), "n must be a valid number");
        }
        assert_eq!(err(rule.validate(Some(&json!([1])), "n")), "n must be a valid number");
    }

    #[test]
    fn number_integer_and_range() {
        let rule = NumberRule::new().integer().min(1.0).max(100.0);
        assert_eq!(err(rule.validate(Some(&json!("1.5")), "limit")), "limit must be an integer");
        assert_eq!(err(rule.validate(Some(&json!(0)), "limit")), "limit must be at least 1");
        assert_eq!(err(rule.validate(Some(&json!(101)), "limit")), "limit must be no more than 100");
        assert_eq!(rule.validate(Some(&json!(true)), "limit").unwrap(), json!(1));
    }

    #[test]
    fn optional_number_empty_is_null() {
        let rule = NumberRule::new().optional().min(5.0);
        assert_eq!(rule.validate(Some(&json!("")), "page").unwrap(), Value::Null);
        assert_eq!(rule.validate(None, "page").unwrap(), Value::Null);
    }

    #[test]
    fn array_items_short_circuit_with_index() {
        let rule = ArrayRule::new().max_length(3).items(StringRule::email());
        assert_eq!(
            err(rule.validate(Some(&json!(["a@b.io", "nope", "also bad"])), "emails")),
            "emails[1] format is invalid"
        );
        assert_eq!(err(rule.validate(Some(&json!("a@b.io")), "emails")), "emails must be an array");
        assert_eq!(
            err(rule.validate(Some(&json!(["a@b.io", "a@b.io", "a@b.io", "a@b.io"])), "emails")),
            "emails must have no more than 3 items"
        );
        assert_eq!(ArrayRule::new().optional().validate(None, "tags").unwrap(), json!([]));
        assert_eq!(
            err(ArrayRule::new().min_length(1).validate(Some(&json!([])), "tags")),
            "tags must have at least 1 items"
        );
    }

    #[test]
    fn object_collects_all_errors() {
        let rule = ObjectRule::new(
            Schema::new()
                .field("name", StringRule::new().min_length(1))
                .field("age", NumberRule::new().integer()),
        );
        let input = json!({ "age": "x", "extra": true });
        assert_eq!(
            err(rule.validate(Some(&input), "body")),
            "name is required, age must be a valid number, Unknown property: extra"
        );
        assert_eq!(err(rule.validate(Some(&json!([1, 2])), "body")), "body must be an object");
    }

    #[test]
    fn object_allows_unknown_when_asked() {
        let rule = ObjectRule::new(Schema::new().field("q", StringRule::new().optional())).allow_unknown(true);
        let v = rule.validate(Some(&json!({ "q": " hi ", "other": 1 })), "query").unwrap();
        assert_eq!(v, json!({ "q": "hi" }));
    }

    #[test]
    fn object_validation_is_idempotent() {
        let rule = ObjectRule::new(
            Schema::new()
                .field("name", StringRule::new().max_length(10))
                .field("nick", StringRule::new().optional())
                .field("age", NumberRule::new().optional())
                .field("score", NumberRule::new())
                .field("tags", ArrayRule::new().optional().items(StringRule::new()))
                .field("meta", ObjectRule::new(Schema::new()).optional()),
        );
        let once = rule
            .validate(Some(&json!({ "name": "  Ann ", "score": "9.5", "tags": [" a "] })), "body")
            .unwrap();
        let twice = rule.validate(Some(&once), "body").unwrap();
        assert_eq!(once, twice);
        assert_eq!(
            once,
            json!({ "name": "Ann", "nick": "", "age": null, "score": 9.5, "tags": ["a"], "meta": {} })
        );
    }

    #[test]
    fn closures_are_rules() {
        let even = |v: Option<&Value>, field: &str| -> RuleResult {
            match v.and_then(Value::as_i64) {
                Some(n) if n % 2 == 0 => Ok(json!(n)),
                _ => Err(FieldError::new(format!("{} must be even", field))),
            }
        };
        let rule = ObjectRule::new(Schema::new().field("n", even));
        assert!(rule.validate(Some(&json!({ "n": 4 })), "body").is_ok());
        assert_eq!(err(rule.validate(Some(&json!({ "n": 3 })), "body")), "n must be even");
    }
}
