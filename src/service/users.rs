use sqlx::{Pool, Postgres};
use tracing::{Instrument, instrument};

use crate::{
    dao::users::UserDao,
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{LoginInputType, UserDetailType},
    },
};

/**
 * Represents the service for user lookup and authentication.
 *
 * Passwords are compared in clear text. This mirrors the system being
 * replaced and is a known security defect, see DESIGN.md.
 */
pub struct UserService {
    /**
     * The DAO for user operations.
     */
    user_dao: UserDao,
    /**
     * Optional connection pool for database operations. Optional for test purposes until we have a better way to mock the database.
     */
    connection_pool: Option<Pool<Postgres>>,
}

impl UserService {
    /**
     * Creates a new instance of `UserService`.
     *
     * # Arguments
     * `user_dao`: The DAO for user operations.
     * `connection_pool`: Optional connection pool for database operations.
     */
    pub fn new(user_dao: UserDao, connection_pool: Option<Pool<Postgres>>) -> Self {
        UserService { user_dao, connection_pool }
    }

    fn pool(&self) -> Result<&Pool<Postgres>, ApplicationError> {
        self.connection_pool.as_ref().ok_or_else(|| ApplicationError::new(ErrorType::DatabaseError, "No database connection available".to_string()))
    }

    /**
     * Authenticates a user. Fails when the user is absent, disabled, or the
     * password does not match. A successful login records `last_login`.
     *
     * # Arguments
     * `login`: The validated login input.
     *
     * # Returns
     * The authenticated user or an `Authentication` error. The error message
     * never reveals which check failed.
     */
    #[instrument(skip(self, login), fields(result))]
    pub async fn authenticate(&self, login: &LoginInputType) -> Result<UserDetailType, ApplicationError> {
        let span = tracing::Span::current();
        tracing::info!("Attempting authentication for user: {}", login.username);
        let mut transaction = self.pool()?.begin().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to begin transaction: {err}")))?;
        let user = self.user_dao.find_by_username(&mut transaction, &login.username).instrument(span.clone()).await?;
        let Some(user) = user else {
            tracing::warn!("Authentication failed: User not found - {}", login.username);
            return Err(ApplicationError::new(ErrorType::Authentication, "Invalid username or password".to_string()));
        };
        if !user.enabled {
            tracing::warn!("Authentication failed: User disabled - {}", login.username);
            return Err(ApplicationError::new(ErrorType::Authentication, "Invalid username or password".to_string()));
        }
        if login.password != user.password {
            tracing::warn!("Authentication failed: Invalid password for user - {}", login.username);
            return Err(ApplicationError::new(ErrorType::Authentication, "Invalid username or password".to_string()));
        }
        self.user_dao.touch_last_login(&mut transaction, user.id).instrument(span).await?;
        transaction.commit().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to commit transaction: {err}")))?;
        tracing::info!("Authentication successful for user: {}", login.username);
        Ok(user)
    }

    /**
     * Seeds the default user at startup when no row with that username
     * exists. Existing rows are left untouched.
     *
     * # Arguments
     * `username`: The default username.
     * `password`: The default password, stored as supplied.
     */
    #[instrument(skip(self, password), fields(result))]
    pub async fn seed_default_user(&self, username: &str, password: &str) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let mut transaction = self.pool()?.begin().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to begin transaction: {err}")))?;
        let existing = self.user_dao.find_by_username(&mut transaction, username).instrument(span.clone()).await?;
        if existing.is_some() {
            tracing::debug!("Default user {} already present, skipping seed", username);
            return Ok(());
        }
        let created = self.user_dao.insert_user(&mut transaction, username, password, true).instrument(span).await?;
        transaction.commit().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to commit transaction: {err}")))?;
        tracing::info!("Seeded default user {} with ID {}", username, created.id);
        Ok(())
    }
}
