use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use actix_web::{FromRequest, HttpRequest};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use uuid::Uuid;

use crate::model::apperror::{ApplicationError, ErrorType};

/**
 * An authenticated session: opaque token plus the username it belongs to.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct SessionType {
    pub token: String,
    pub username: String,
}

/**
 * Session security service holding the active sessions in process memory.
 *
 * Tokens are random v4 UUIDs handed out at login and presented as bearer
 * credentials on every protected request. Sessions live until logout or
 * process restart; there is no expiry, refresh or lockout.
 */
#[derive(Clone)]
pub struct SessionSecurityService {
    /**
     * Active sessions, token to username.
     */
    sessions: Arc<Mutex<HashMap<String, String>>>,
}

impl SessionSecurityService {
    /**
     * Creates a new instance of `SessionSecurityService` with no active
     * sessions.
     */
    pub fn new() -> Self {
        SessionSecurityService { sessions: Arc::new(Mutex::new(HashMap::new())) }
    }

    /**
     * Creates a session for an authenticated user.
     *
     * # Arguments
     * `username`: The authenticated username.
     *
     * # Returns
     * The new session with its opaque token.
     */
    pub fn create_session(&self, username: &str) -> Result<SessionType, ApplicationError> {
        let token = Uuid::new_v4().to_string();
        let mut sessions = self.sessions.lock().map_err(|_| ApplicationError::new(ErrorType::Application, "Session store lock poisoned".to_string()))?;
        sessions.insert(token.clone(), username.to_string());
        Ok(SessionType { token, username: username.to_string() })
    }

    /**
     * Validates the bearer token on the HTTP request against the active
     * sessions.
     *
     * # Arguments
     * `http_request`: The HTTP request carrying the token in the
     * Authorization header.
     *
     * # Returns
     * The session, or an `Authorization` error when the token is missing or
     * unknown.
     */
    pub fn validate(&self, http_request: &HttpRequest) -> Result<SessionType, ApplicationError> {
        let credentials = BearerAuth::from_request(http_request, &mut actix_web::dev::Payload::None).into_inner().ok();
        let Some(credentials) = credentials else {
            return Err(ApplicationError::new(ErrorType::Authorization, "Unauthorized".to_string()));
        };
        let sessions = self.sessions.lock().map_err(|_| ApplicationError::new(ErrorType::Application, "Session store lock poisoned".to_string()))?;
        match sessions.get(credentials.token()) {
            Some(username) => Ok(SessionType { token: credentials.token().to_string(), username: username.clone() }),
            None => Err(ApplicationError::new(ErrorType::Authorization, "Unauthorized".to_string())),
        }
    }

    /**
     * Discards the session carried by the HTTP request.
     *
     * # Arguments
     * `http_request`: The HTTP request carrying the token to invalidate.
     *
     * # Returns
     * A result indicating success, or an `Authorization` error when the
     * token is missing or unknown.
     */
    pub fn invalidate(&self, http_request: &HttpRequest) -> Result<(), ApplicationError> {
        let session = self.validate(http_request)?;
        let mut sessions = self.sessions.lock().map_err(|_| ApplicationError::new(ErrorType::Application, "Session store lock poisoned".to_string()))?;
        sessions.remove(&session.token);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use actix_web::test::TestRequest;

    use super::*;

    #[test]
    fn test_create_then_validate_session() {
        let service = SessionSecurityService::new();
        let session = service.create_session("CCT1234").unwrap();
        let request = TestRequest::default().insert_header(("Authorization", format!("Bearer {}", session.token))).to_http_request();
        let validated = service.validate(&request).unwrap();
        assert_eq!(validated.username, "CCT1234");
        assert_eq!(validated.token, session.token);
    }

    #[test]
    fn test_validate_without_token_fails() {
        let service = SessionSecurityService::new();
        let request = TestRequest::default().to_http_request();
        let error = service.validate(&request).unwrap_err();
        assert_eq!(error.error_type, ErrorType::Authorization);
    }

    #[test]
    fn test_validate_unknown_token_fails() {
        let service = SessionSecurityService::new();
        let request = TestRequest::default().insert_header(("Authorization", "Bearer not-a-session")).to_http_request();
        assert!(service.validate(&request).is_err());
    }

    #[test]
    fn test_invalidate_removes_session() {
        let service = SessionSecurityService::new();
        let session = service.create_session("CCT1234").unwrap();
        let request = TestRequest::default().insert_header(("Authorization", format!("Bearer {}", session.token))).to_http_request();
        service.invalidate(&request).unwrap();
        let error = service.validate(&request).unwrap_err();
        assert_eq!(error.error_type, ErrorType::Authorization);
    }

    #[test]
    fn test_sessions_are_unique_per_login() {
        let service = SessionSecurityService::new();
        let first = service.create_session("CCT1234").unwrap();
        let second = service.create_session("CCT1234").unwrap();
        assert_ne!(first.token, second.token);
    }
}
