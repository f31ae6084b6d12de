use tf_provider::value::Value;
use tf_provider::{AttributePath, Diagnostics};

/// Validates a known attribute value. Null and unknown values never reach a validator.
pub trait Validator<T: ?Sized>: Send + Sync {
    /// Human-readable description
    fn description(&self) -> String;
    fn validate(&self, value: &T, path: &AttributePath, diagnostics: &mut Diagnostics);
}

/// Runs string validators against a configured value
pub fn validate_string(
    value: &Value<String>,
    path: AttributePath,
    diagnostics: &mut Diagnostics,
    validators: &[&dyn Validator<str>],
) {
    if let Value::Value(s) = value {
        for validator in validators {
            validator.validate(s, &path, diagnostics);
        }
    }
}

/// Runs number validators against a configured value
pub fn validate_number(
    value: &Value<i64>,
    path: AttributePath,
    diagnostics: &mut Diagnostics,
    validators: &[&dyn Validator<i64>],
) {
    if let Value::Value(n) = value {
        for validator in validators {
            validator.validate(n, &path, diagnostics);
        }
    }
}

/// Runs a string validator against every known element of a list
pub fn validate_string_list(
    value: &Value<Vec<Value<String>>>,
    path: AttributePath,
    diagnostics: &mut Diagnostics,
    validators: &[&dyn Validator<str>],
) {
    if let Value::Value(items) = value {
        for (idx, item) in items.iter().enumerate() {
            validate_string(item, path.clone().index(idx as i64), diagnostics, validators);
        }
    }
}

pub struct StringLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Validator<str> for StringLengthValidator {
    fn description(&self) -> String {
        format!("string length between {:?} and {:?}", self.min, self.max)
    }

    fn validate(&self, value: &str, path: &AttributePath, diagnostics: &mut Diagnostics) {
        if let Some(min) = self.min {
            if value.len() < min {
                diagnostics.error(
                    format!("{} must have minimum length of {}", path, min),
                    format!("Got length {}", value.len()),
                    path.clone(),
                );
            }
        }
        if let Some(max) = self.max {
            if value.len() > max {
                diagnostics.error(
                    format!("{} must have maximum length of {}", path, max),
                    format!("Got length {}", value.len()),
                    path.clone(),
                );
            }
        }
    }
}

pub struct StringPatternValidator {
    pub pattern: regex::Regex,
    pub description: String,
}

impl Validator<str> for StringPatternValidator {
    fn description(&self) -> String {
        format!("string must match {}", self.description)
    }

    fn validate(&self, value: &str, path: &AttributePath, diagnostics: &mut Diagnostics) {
        if !self.pattern.is_match(value) {
            diagnostics.error(
                format!("{} must match {}", path, self.description),
                format!("Value '{}' does not match pattern", value),
                path.clone(),
            );
        }
    }
}

/// Accepts only the listed values, compared case-sensitively
pub struct OneOfValidator {
    pub values: &'static [&'static str],
}

impl OneOfValidator {
    pub const fn new(values: &'static [&'static str]) -> Self {
        Self { values }
    }
}

impl Validator<str> for OneOfValidator {
    fn description(&self) -> String {
        format!("value must be one of: {}", self.values.join(", "))
    }

    fn validate(&self, value: &str, path: &AttributePath, diagnostics: &mut Diagnostics) {
        if !self.values.contains(&value) {
            diagnostics.error(
                format!("Invalid value for {}", path),
                format!(
                    "Value '{}' must be one of: {}",
                    value,
                    self.values.join(", ")
                ),
                path.clone(),
            );
        }
    }
}

pub struct GuidValidator;

impl Validator<str> for GuidValidator {
    fn description(&self) -> String {
        "value must be a GUID".to_string()
    }

    fn validate(&self, value: &str, path: &AttributePath, diagnostics: &mut Diagnostics) {
        if uuid::Uuid::parse_str(value).is_err() {
            diagnostics.error(
                format!("{} must be a valid GUID", path),
                format!("Value '{}' is not a GUID", value),
                path.clone(),
            );
        }
    }
}

pub struct NumberRangeValidator {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl Validator<i64> for NumberRangeValidator {
    fn description(&self) -> String {
        format!("number between {:?} and {:?}", self.min, self.max)
    }

    fn validate(&self, value: &i64, path: &AttributePath, diagnostics: &mut Diagnostics) {
        if let Some(min) = self.min {
            if *value < min {
                diagnostics.error(
                    format!("{} must be at least {}", path, min),
                    format!("Got {}", value),
                    path.clone(),
                );
            }
        }
        if let Some(max) = self.max {
            if *value > max {
                diagnostics.error(
                    format!("{} must be at most {}", path, max),
                    format!("Got {}", value),
                    path.clone(),
                );
            }
        }
    }
}

pub struct ListLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl ListLengthValidator {
    pub fn validate_list<T>(
        &self,
        value: &Value<Vec<T>>,
        path: AttributePath,
        diagnostics: &mut Diagnostics,
    ) {
        if let Value::Value(items) = value {
            self.validate(&items.len(), &path, diagnostics);
        }
    }
}

impl Validator<usize> for ListLengthValidator {
    fn description(&self) -> String {
        format!("list length between {:?} and {:?}", self.min, self.max)
    }

    fn validate(&self, len: &usize, path: &AttributePath, diagnostics: &mut Diagnostics) {
        if let Some(min) = self.min {
            if *len < min {
                diagnostics.error(
                    format!("{} must have at least {} items", path, min),
                    format!("Got {} items", len),
                    path.clone(),
                );
            }
        }
        if let Some(max) = self.max {
            if *len > max {
                diagnostics.error(
                    format!("{} must have at most {} items", path, max),
                    format!("Got {} items", len),
                    path.clone(),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path() -> AttributePath {
        AttributePath::new("test_field")
    }

    #[test]
    fn string_length_validator_accepts_valid_length() {
        let validator = StringLengthValidator {
            min: Some(3),
            max: Some(10),
        };

        let mut diags = Diagnostics::default();
        validator.validate("hello", &path(), &mut diags);

        assert_eq!(diags.errors.len(), 0);
    }

    #[test]
    fn string_length_validator_rejects_too_short() {
        let validator = StringLengthValidator {
            min: Some(5),
            max: None,
        };

        let mut diags = Diagnostics::default();
        validator.validate("hi", &path(), &mut diags);

        assert_eq!(diags.errors.len(), 1);
        assert!(diags.errors[0].summary.contains("minimum length"));
    }

    #[test]
    fn string_length_validator_rejects_too_long() {
        let validator = StringLengthValidator {
            min: None,
            max: Some(5),
        };

        let mut diags = Diagnostics::default();
        validator.validate("hello world", &path(), &mut diags);

        assert_eq!(diags.errors.len(), 1);
        assert!(diags.errors[0].summary.contains("maximum length"));
    }

    #[test]
    fn string_pattern_validator_rejects_non_matching() {
        let validator = StringPatternValidator {
            pattern: regex::Regex::new(r"#").unwrap(),
            description: "a naming scheme containing '#'".to_string(),
        };

        let mut diags = Diagnostics::default();
        validator.validate("vda-##", &path(), &mut diags);
        assert_eq!(diags.errors.len(), 0);

        validator.validate("vda", &path(), &mut diags);
        assert_eq!(diags.errors.len(), 1);
        assert!(diags.errors[0].summary.contains("naming scheme"));
    }

    #[test]
    fn one_of_validator_is_case_sensitive() {
        let validator = OneOfValidator::new(&["Random", "Static"]);

        let mut diags = Diagnostics::default();
        validator.validate("Random", &path(), &mut diags);
        assert!(diags.errors.is_empty());

        validator.validate("random", &path(), &mut diags);
        assert_eq!(diags.errors.len(), 1);
        assert!(diags.errors[0].detail.contains("Random, Static"));
    }

    #[test]
    fn guid_validator_checks_format() {
        let mut diags = Diagnostics::default();
        GuidValidator.validate("6c0f6ba5-2c1d-4d4e-9a43-4c2b1f0d2a11", &path(), &mut diags);
        assert!(diags.errors.is_empty());

        GuidValidator.validate("not-a-guid", &path(), &mut diags);
        assert_eq!(diags.errors.len(), 1);
    }

    #[test]
    fn number_range_validator_rejects_too_small() {
        let validator = NumberRangeValidator {
            min: Some(10),
            max: None,
        };

        let mut diags = Diagnostics::default();
        validator.validate(&5, &path(), &mut diags);

        assert_eq!(diags.errors.len(), 1);
        assert!(diags.errors[0].summary.contains("at least"));
    }

    #[test]
    fn list_length_validator_accepts_valid_length() {
        let validator = ListLengthValidator {
            min: Some(1),
            max: Some(5),
        };

        let mut diags = Diagnostics::default();
        let list: Value<Vec<Value<String>>> =
            Value::Value(vec![Value::Value("a".into()), Value::Value("b".into())]);
        validator.validate_list(&list, path(), &mut diags);
        assert_eq!(diags.errors.len(), 0);

        validator.validate_list(&Value::Value(Vec::<i64>::new()), path(), &mut diags);
        assert_eq!(diags.errors.len(), 1);
    }

    #[test]
    fn null_and_unknown_values_are_skipped() {
        let mut diags = Diagnostics::default();
        validate_string(&Value::Null, path(), &mut diags, &[&GuidValidator]);
        validate_string(&Value::Unknown, path(), &mut diags, &[&GuidValidator]);
        validate_number(
            &Value::Unknown,
            path(),
            &mut diags,
            &[&NumberRangeValidator {
                min: Some(1),
                max: None,
            }],
        );
        assert!(diags.errors.is_empty());
    }

    #[test]
    fn string_list_validator_reports_each_bad_element() {
        let mut diags = Diagnostics::default();
        let list = Value::Value(vec![
            Value::Value("bad".to_string()),
            Value::Value("6c0f6ba5-2c1d-4d4e-9a43-4c2b1f0d2a11".to_string()),
            Value::Value("also-bad".to_string()),
        ]);
        validate_string_list(&list, AttributePath::new("scopes"), &mut diags, &[&GuidValidator]);
        assert_eq!(diags.errors.len(), 2);
    }
}
