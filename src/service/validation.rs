use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{Datelike, Utc};
use regex::Regex;
use rust_decimal::Decimal;

use crate::model::{
    apperror::ApplicationError,
    models::{LoginInputType, SchoolLeaverInputType, SearchCriteriaType, SortDirection, SortField, SortInput},
};

pub const MAX_STATISTIC_CODE_LENGTH: usize = 20;
pub const MAX_STATISTIC_LABEL_LENGTH: usize = 100;
pub const MAX_SEX_LENGTH: usize = 20;
pub const MAX_UNIT_LENGTH: usize = 10;
pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 50;
pub const MIN_PASSWORD_LENGTH: usize = 4;
pub const MAX_PASSWORD_LENGTH: usize = 100;
pub const MIN_QUARTER_YEAR: i32 = 1900;

static STATISTIC_CODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]+$").expect("invalid statistic code pattern"));
static STATISTIC_LABEL_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9\s\-(),.]+$").expect("invalid statistic label pattern"));
static QUARTER_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^Q[1-4]\d{4}$").expect("invalid quarter pattern"));
static SEX_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z\s]+$").expect("invalid sex pattern"));
static UNIT_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9\s%]+$").expect("invalid unit pattern"));
static SANITIZE_CHARACTERS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"[<>"']"#).expect("invalid sanitize pattern"));
static SANITIZE_SCRIPT_SCHEME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"javascript:").expect("invalid script scheme pattern"));
static SANITIZE_EVENT_HANDLER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"on\w+").expect("invalid event handler pattern"));

/**
 * Raw school leaver payload before sanitization and validation.
 */
#[derive(Debug, Clone, Default)]
pub struct SchoolLeaverFormType {
    pub statistic_code: Option<String>,
    pub statistic_label: Option<String>,
    pub quarter: Option<String>,
    pub sex: Option<String>,
    pub unit: Option<String>,
    pub value: Option<Decimal>,
}

/**
 * Strips characters that could be replayed as script when the value is
 * redisplayed. Regex based, so heuristic rather than a full guarantee.
 *
 * # Arguments
 * `input`: The raw input string.
 *
 * # Returns
 * The trimmed input with angle brackets, quotes, `javascript:` and
 * `on<word>` fragments removed.
 */
pub fn sanitize(input: &str) -> String {
    let trimmed = input.trim();
    let no_chars = SANITIZE_CHARACTERS.replace_all(trimmed, "");
    let no_scheme = SANITIZE_SCRIPT_SCHEME.replace_all(&no_chars, "");
    SANITIZE_EVENT_HANDLER.replace_all(&no_scheme, "").into_owned()
}

fn sanitize_optional(input: Option<&String>) -> Option<String> {
    input.map(|value| sanitize(value)).filter(|value| !value.is_empty())
}

fn char_length(value: &str) -> usize {
    value.chars().count()
}

fn latest_allowed_quarter_year() -> i32 {
    Utc::now().year() + 10
}

/**
 * Validates a school leaver payload field by field, collecting every
 * violation instead of failing fast.
 *
 * # Arguments
 * `form`: The raw payload, sanitized in place before the checks run.
 *
 * # Returns
 * The validated input with the statistic code uppercased, or a validation
 * error carrying the complete field to message map.
 */
pub fn validate_school_leaver(form: &SchoolLeaverFormType) -> Result<SchoolLeaverInputType, ApplicationError> {
    let mut violations: HashMap<String, String> = HashMap::new();

    let statistic_code = sanitize_optional(form.statistic_code.as_ref());
    match &statistic_code {
        None => {
            violations.insert("statisticCode".to_string(), "Statistic code is required".to_string());
        }
        Some(code) if char_length(code) > MAX_STATISTIC_CODE_LENGTH => {
            violations.insert("statisticCode".to_string(), format!("Statistic code must be between 1 and {MAX_STATISTIC_CODE_LENGTH} characters"));
        }
        Some(code) if !STATISTIC_CODE_PATTERN.is_match(code) => {
            violations.insert("statisticCode".to_string(), "Statistic code must contain only letters and numbers".to_string());
        }
        Some(_) => {}
    }

    let statistic_label = sanitize_optional(form.statistic_label.as_ref());
    match &statistic_label {
        None => {
            violations.insert("statisticLabel".to_string(), "Statistic label is required".to_string());
        }
        Some(label) if char_length(label) > MAX_STATISTIC_LABEL_LENGTH => {
            violations.insert("statisticLabel".to_string(), format!("Statistic label must be between 1 and {MAX_STATISTIC_LABEL_LENGTH} characters"));
        }
        Some(label) if !STATISTIC_LABEL_PATTERN.is_match(label) => {
            violations.insert("statisticLabel".to_string(), "Statistic label can only contain letters, numbers, spaces, hyphens, parentheses, and commas".to_string());
        }
        Some(_) => {}
    }

    let quarter = sanitize_optional(form.quarter.as_ref());
    match &quarter {
        None => {
            violations.insert("quarter".to_string(), "Quarter is required".to_string());
        }
        Some(quarter) if !QUARTER_PATTERN.is_match(quarter) => {
            violations.insert("quarter".to_string(), "Quarter must be in format Q1YYYY, Q2YYYY, Q3YYYY, or Q4YYYY".to_string());
        }
        Some(quarter) => {
            if let Err(message) = validate_quarter_year(quarter) {
                violations.insert("quarter".to_string(), message);
            }
        }
    }

    let sex = sanitize_optional(form.sex.as_ref());
    match &sex {
        None => {
            violations.insert("sex".to_string(), "Sex is required".to_string());
        }
        Some(sex) if char_length(sex) > MAX_SEX_LENGTH => {
            violations.insert("sex".to_string(), format!("Sex must be between 1 and {MAX_SEX_LENGTH} characters"));
        }
        Some(sex) if !SEX_PATTERN.is_match(sex) => {
            violations.insert("sex".to_string(), "Sex can only contain letters and spaces".to_string());
        }
        Some(_) => {}
    }

    let unit = sanitize_optional(form.unit.as_ref());
    match &unit {
        None => {
            violations.insert("unit".to_string(), "Unit is required".to_string());
        }
        Some(unit) if char_length(unit) > MAX_UNIT_LENGTH => {
            violations.insert("unit".to_string(), format!("Unit must be between 1 and {MAX_UNIT_LENGTH} characters"));
        }
        Some(unit) if !UNIT_PATTERN.is_match(unit) => {
            violations.insert("unit".to_string(), "Unit can only contain letters, numbers, spaces, and %".to_string());
        }
        Some(_) => {}
    }

    match form.value {
        None => {
            violations.insert("value".to_string(), "Value is required".to_string());
        }
        Some(value) if value < Decimal::ZERO || value > Decimal::new(99999, 2) => {
            violations.insert("value".to_string(), "Value must be between 0.0 and 999.99".to_string());
        }
        Some(value) if value.normalize().scale() > 2 => {
            violations.insert("value".to_string(), "Value must have at most 2 decimal places".to_string());
        }
        Some(_) => {}
    }

    if !violations.is_empty() {
        return Err(ApplicationError::validation(violations));
    }
    // The unwraps cannot fail here, missing fields were reported above.
    Ok(SchoolLeaverInputType {
        statistic_code: statistic_code.unwrap_or_default().to_uppercase(),
        statistic_label: statistic_label.unwrap_or_default(),
        quarter: quarter.unwrap_or_default(),
        sex: sex.unwrap_or_default(),
        unit: unit.unwrap_or_default(),
        value: form.value.unwrap_or_default(),
    })
}

fn validate_quarter_year(quarter: &str) -> Result<(), String> {
    let max_year = latest_allowed_quarter_year();
    let year: i32 = quarter[2..].parse().map_err(|_| format!("Quarter year must be between {MIN_QUARTER_YEAR} and {max_year}"))?;
    if !(MIN_QUARTER_YEAR..=max_year).contains(&year) {
        return Err(format!("Quarter year must be between {MIN_QUARTER_YEAR} and {max_year}"));
    }
    Ok(())
}

/**
 * Validates a login payload.
 *
 * # Arguments
 * `username`: The supplied username.
 * `password`: The supplied password.
 *
 * # Returns
 * The validated login input or a validation error with all field violations.
 */
pub fn validate_login(username: Option<&String>, password: Option<&String>) -> Result<LoginInputType, ApplicationError> {
    let mut violations: HashMap<String, String> = HashMap::new();

    let username = sanitize_optional(username);
    match &username {
        None => {
            violations.insert("username".to_string(), "Username is required".to_string());
        }
        Some(name) if char_length(name) < MIN_USERNAME_LENGTH || char_length(name) > MAX_USERNAME_LENGTH => {
            violations.insert("username".to_string(), format!("Username must be between {MIN_USERNAME_LENGTH} and {MAX_USERNAME_LENGTH} characters"));
        }
        Some(name) if !STATISTIC_CODE_PATTERN.is_match(name) => {
            violations.insert("username".to_string(), "Username can only contain letters and numbers".to_string());
        }
        Some(_) => {}
    }

    match password {
        None => {
            violations.insert("password".to_string(), "Password is required".to_string());
        }
        Some(password) if char_length(password) < MIN_PASSWORD_LENGTH || char_length(password) > MAX_PASSWORD_LENGTH => {
            violations.insert("password".to_string(), format!("Password must be between {MIN_PASSWORD_LENGTH} and {MAX_PASSWORD_LENGTH} characters"));
        }
        Some(_) => {}
    }

    if !violations.is_empty() {
        return Err(ApplicationError::validation(violations));
    }
    Ok(LoginInputType { username: username.unwrap_or_default(), password: password.cloned().unwrap_or_default() })
}

/**
 * Validates optional search criteria and sort parameters. Pagination is
 * clamped elsewhere and never rejected; an unknown sort field is an error
 * rather than a silent fallback.
 *
 * # Returns
 * The validated criteria and sort input, or a validation error.
 */
pub fn validate_search(
    statistic_code: Option<&String>,
    quarter: Option<&String>,
    sex: Option<&String>,
    sort_by: Option<&String>,
    sort_dir: Option<&String>,
) -> Result<(SearchCriteriaType, SortInput), ApplicationError> {
    let mut violations: HashMap<String, String> = HashMap::new();

    let statistic_code = sanitize_optional(statistic_code);
    if let Some(code) = &statistic_code {
        if char_length(code) > MAX_STATISTIC_CODE_LENGTH {
            violations.insert("statisticCode".to_string(), format!("Statistic code must not exceed {MAX_STATISTIC_CODE_LENGTH} characters"));
        } else if !STATISTIC_CODE_PATTERN.is_match(code) {
            violations.insert("statisticCode".to_string(), "Statistic code can only contain letters and numbers".to_string());
        }
    }

    let quarter = sanitize_optional(quarter);
    if let Some(quarter) = &quarter {
        if !QUARTER_PATTERN.is_match(quarter) {
            violations.insert("quarter".to_string(), "Quarter must be in format Q1YYYY, Q2YYYY, Q3YYYY, or Q4YYYY".to_string());
        }
    }

    let sex = sanitize_optional(sex);
    if let Some(sex) = &sex {
        if char_length(sex) > MAX_SEX_LENGTH {
            violations.insert("sex".to_string(), format!("Sex must not exceed {MAX_SEX_LENGTH} characters"));
        } else if !SEX_PATTERN.is_match(sex) {
            violations.insert("sex".to_string(), "Sex can only contain letters and spaces".to_string());
        }
    }

    let sort_field = match sort_by {
        Some(name) => match SortField::from_name(name) {
            Some(field) => Some(field),
            None => {
                violations.insert("sortBy".to_string(), format!("Unknown sort field: {name}"));
                None
            }
        },
        None => None,
    };

    let direction = match sort_dir.map(String::as_str) {
        None | Some("desc") => SortDirection::Desc,
        Some("asc") => SortDirection::Asc,
        Some(_) => {
            violations.insert("sortDir".to_string(), "Sort direction must be 'asc' or 'desc'".to_string());
            SortDirection::Desc
        }
    };

    if !violations.is_empty() {
        return Err(ApplicationError::validation(violations));
    }
    Ok((
        SearchCriteriaType { statistic_code: statistic_code.map(|code| code.to_uppercase()), quarter, sex },
        SortInput { sort_by: sort_field, direction },
    ))
}

#[cfg(test)]
mod test {
    use super::*;

    fn valid_form() -> SchoolLeaverFormType {
        SchoolLeaverFormType {
            statistic_code: Some("sl001".to_string()),
            statistic_label: Some("Total School Leavers".to_string()),
            quarter: Some("Q12023".to_string()),
            sex: Some("Male".to_string()),
            unit: Some("Count".to_string()),
            value: Some(Decimal::new(65050, 2)),
        }
    }

    #[test]
    fn test_valid_form_uppercases_code() {
        let input = validate_school_leaver(&valid_form()).unwrap();
        assert_eq!(input.statistic_code, "SL001");
        assert_eq!(input.value, Decimal::new(65050, 2));
    }

    #[test]
    fn test_missing_code_is_single_violation() {
        let mut form = valid_form();
        form.statistic_code = None;
        let error = validate_school_leaver(&form).unwrap_err();
        let violations = error.field_errors.unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations.get("statisticCode").unwrap(), "Statistic code is required");
    }

    #[test]
    fn test_code_with_symbols_rejected() {
        let mut form = valid_form();
        form.statistic_code = Some("SL-001".to_string());
        let error = validate_school_leaver(&form).unwrap_err();
        assert!(error.field_errors.unwrap().contains_key("statisticCode"));
    }

    #[test]
    fn test_bad_quarter_format() {
        let mut form = valid_form();
        form.quarter = Some("Q52023".to_string());
        let error = validate_school_leaver(&form).unwrap_err();
        assert_eq!(error.field_errors.unwrap().get("quarter").unwrap(), "Quarter must be in format Q1YYYY, Q2YYYY, Q3YYYY, or Q4YYYY");
    }

    #[test]
    fn test_quarter_year_out_of_range() {
        let mut form = valid_form();
        form.quarter = Some("Q11850".to_string());
        let error = validate_school_leaver(&form).unwrap_err();
        assert!(error.field_errors.unwrap().get("quarter").unwrap().starts_with("Quarter year must be between 1900"));
    }

    #[test]
    fn test_value_at_upper_bound_is_valid() {
        let mut form = valid_form();
        form.value = Some(Decimal::new(99999, 2));
        assert!(validate_school_leaver(&form).is_ok());
    }

    #[test]
    fn test_value_above_range() {
        let mut form = valid_form();
        form.value = Some(Decimal::new(100000, 2));
        let error = validate_school_leaver(&form).unwrap_err();
        assert_eq!(error.field_errors.unwrap().get("value").unwrap(), "Value must be between 0.0 and 999.99");
    }

    #[test]
    fn test_value_too_many_decimal_places() {
        let mut form = valid_form();
        form.value = Some(Decimal::new(123456, 3));
        let error = validate_school_leaver(&form).unwrap_err();
        assert_eq!(error.field_errors.unwrap().get("value").unwrap(), "Value must have at most 2 decimal places");
    }

    #[test]
    fn test_all_violations_collected() {
        let form = SchoolLeaverFormType::default();
        let error = validate_school_leaver(&form).unwrap_err();
        assert_eq!(error.field_errors.unwrap().len(), 6);
    }

    #[test]
    fn test_sanitize_strips_script_vectors() {
        assert_eq!(sanitize("  <script>alert('x')</script>  "), "scriptalert(x)/script");
        assert_eq!(sanitize("javascript:doEvil()"), "doEvil()");
        assert_eq!(sanitize("a onclick b"), "a  b");
    }

    #[test]
    fn test_login_default_user_payload() {
        let username = "CCT1234".to_string();
        let password = "54321".to_string();
        let input = validate_login(Some(&username), Some(&password)).unwrap();
        assert_eq!(input.username, "CCT1234");
        assert_eq!(input.password, "54321");
    }

    #[test]
    fn test_login_missing_fields() {
        let error = validate_login(None, None).unwrap_err();
        let violations = error.field_errors.unwrap();
        assert_eq!(violations.get("username").unwrap(), "Username is required");
        assert_eq!(violations.get("password").unwrap(), "Password is required");
    }

    #[test]
    fn test_login_short_username() {
        let username = "ab".to_string();
        let password = "54321".to_string();
        let error = validate_login(Some(&username), Some(&password)).unwrap_err();
        assert_eq!(error.field_errors.unwrap().get("username").unwrap(), "Username must be between 3 and 50 characters");
    }

    #[test]
    fn test_search_no_criteria_is_valid() {
        let (criteria, sort) = validate_search(None, None, None, None, None).unwrap();
        assert!(criteria.is_empty());
        assert!(sort.sort_by.is_none());
        assert_eq!(sort.direction, SortDirection::Desc);
    }

    #[test]
    fn test_search_unknown_sort_field_fails() {
        let sort_by = "password".to_string();
        let error = validate_search(None, None, None, Some(&sort_by), None).unwrap_err();
        assert_eq!(error.field_errors.unwrap().get("sortBy").unwrap(), "Unknown sort field: password");
    }

    #[test]
    fn test_search_bad_sort_direction_fails() {
        let sort_dir = "sideways".to_string();
        let error = validate_search(None, None, None, None, Some(&sort_dir)).unwrap_err();
        assert!(error.field_errors.unwrap().contains_key("sortDir"));
    }

    #[test]
    fn test_search_code_uppercased() {
        let code = "sl001".to_string();
        let (criteria, _) = validate_search(Some(&code), None, None, None, None).unwrap();
        assert_eq!(criteria.statistic_code.unwrap(), "SL001");
    }

    #[test]
    fn test_search_invalid_quarter() {
        let quarter = "2023Q1".to_string();
        let error = validate_search(None, Some(&quarter), None, None, None).unwrap_err();
        assert!(error.field_errors.unwrap().contains_key("quarter"));
    }
}
