use crate::{
    api::security::SessionSecurityService,
    service::{school_leavers::SchoolLeaverService, users::UserService},
};

/**
* Represents the application state shared across the Actix web application.
*/
pub struct AppState {
    /**
     * The session security service for handling authentication and authorization.
     */
    pub session_service: SessionSecurityService,
    /**
     * The school leaver service for handling record operations.
     */
    pub school_leaver_service: SchoolLeaverService,
    /**
     * The user service for handling login.
     */
    pub user_service: UserService,
}

/**
 * Creates a new instance of `AppState`.
 *
 * # Arguments
 * `session_service`: The session security service for handling authentication and authorization.
 * `school_leaver_service`: The school leaver service for handling record operations.
 * `user_service`: The user service for handling login.
 */
impl AppState {
    pub fn new(session_service: SessionSecurityService, school_leaver_service: SchoolLeaverService, user_service: UserService) -> Self {
        AppState { session_service, school_leaver_service, user_service }
    }
}
