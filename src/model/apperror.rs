use std::collections::HashMap;
use std::fmt;

/**
 * Represents the type of error that can occur within the application.
 */
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorType {
    /**
     * Input failed field validation. Carries a field to message map.
     */
    Validation,
    /**
     * The requested entity does not exist.
     */
    NotFound,
    /**
     * Login failed, wrong credentials or disabled user.
     */
    Authentication,
    /**
     * A protected route was called without a valid session.
     */
    Authorization,
    /**
     * A database operation failed unexpectedly.
     */
    DatabaseError,
    /**
     * Unexpected application failure.
     */
    Application,
    /**
     * Failure during application startup.
     */
    Initialization,
}

/**
 * Represents an error that occurs within the application.
 */
#[derive(Debug, Clone)]
pub struct ApplicationError {
    /**
     * Error type.
     */
    pub error_type: ErrorType,
    /**
     * Error message describing problem.
     */
    pub message: String,
    /**
     * Field violations, only present for validation errors.
     */
    pub field_errors: Option<HashMap<String, String>>,
}

impl ApplicationError {
    /**
     * Creates a new ApplicationError.
     *
     * #Arguments
     * `error_type`: The type of error.
     * `message`: A description of the error.
     */
    pub fn new(error_type: ErrorType, message: String) -> Self {
        ApplicationError { error_type, message, field_errors: None }
    }

    /**
     * Creates a validation error carrying the complete set of field violations.
     *
     * #Arguments
     * `field_errors`: Map of field name to violation message.
     */
    pub fn validation(field_errors: HashMap<String, String>) -> Self {
        ApplicationError { error_type: ErrorType::Validation, message: "Validation failed".to_string(), field_errors: Some(field_errors) }
    }
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_validation_error_keeps_all_violations() {
        let mut violations = HashMap::new();
        violations.insert("statisticCode".to_string(), "Statistic code is required".to_string());
        violations.insert("value".to_string(), "Value must be between 0.0 and 999.99".to_string());
        let error = ApplicationError::validation(violations);
        assert_eq!(error.error_type, ErrorType::Validation);
        assert_eq!(error.field_errors.unwrap().len(), 2);
    }

    #[test]
    fn test_display_uses_message() {
        let error = ApplicationError::new(ErrorType::NotFound, "School leaver not found with ID: 99999".to_string());
        assert_eq!(error.to_string(), "School leaver not found with ID: 99999");
        assert!(error.field_errors.is_none());
    }
}
