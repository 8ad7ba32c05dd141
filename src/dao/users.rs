use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::UserDetailType,
};

/**
 * Database response type for a user row.
 */
pub type UserDbRow = (i64, String, String, bool, DateTime<Utc>, DateTime<Utc>, Option<DateTime<Utc>>);

/**
 * SQL query to retrieve a user by username.
 */
const QUERY_USER_BY_USERNAME: &str = "SELECT id, username, password, enabled, created_at, updated_at, last_login FROM users WHERE username = $1";

/**
 * SQL query to insert a user. The password is stored as supplied.
 */
const INSERT_USER: &str = "INSERT INTO users (username, password, enabled, created_at, updated_at) VALUES ($1, $2, $3, now(), now()) \
                           RETURNING id, username, password, enabled, created_at, updated_at, last_login";

/**
 * SQL query to record a successful login.
 */
const UPDATE_LAST_LOGIN: &str = "UPDATE users SET last_login = now(), updated_at = now() WHERE id = $1";

impl From<UserDbRow> for UserDetailType {
    fn from(row: UserDbRow) -> Self {
        UserDetailType { id: row.0, username: row.1, password: row.2, enabled: row.3, created_at: row.4, updated_at: row.5, last_login: row.6 }
    }
}

/**
 * DAO for user database operations.
 */
pub struct UserDao {}

impl UserDao {
    /**
     * Creates a new instance of `UserDao`.
     */
    pub fn new() -> Self {
        UserDao {}
    }

    /**
     * Looks up a user by username.
     *
     * # Arguments
     * `connection`: The database connection.
     * `username`: The username to look up.
     *
     * # Returns
     * The user when present, `None` otherwise.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn find_by_username(&self, connection: &mut PgConnection, username: &str) -> Result<Option<UserDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let row: Option<UserDbRow> = sqlx::query_as(QUERY_USER_BY_USERNAME)
            .bind(username)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to find user: {err}")))?;
        Ok(row.map(UserDetailType::from))
    }

    /**
     * Inserts a new user row.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     * `username`: The username, unique.
     * `password`: The password, stored in clear text.
     * `enabled`: Whether the user may authenticate.
     */
    #[instrument(skip(self, transaction, password), fields(result))]
    pub async fn insert_user(&self, transaction: &mut PgConnection, username: &str, password: &str, enabled: bool) -> Result<UserDetailType, ApplicationError> {
        let span = tracing::Span::current();
        let row: UserDbRow = sqlx::query_as(INSERT_USER)
            .bind(username)
            .bind(password)
            .bind(enabled)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to insert user: {err}")))?;
        Ok(UserDetailType::from(row))
    }

    /**
     * Records a successful login for the user.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     * `user_id`: The ID of the user that logged in.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn touch_last_login(&self, transaction: &mut PgConnection, user_id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(UPDATE_LAST_LOGIN)
            .bind(user_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to update last login: {err}")))?;
        if result.rows_affected() == 0 {
            return Err(ApplicationError::new(ErrorType::NotFound, format!("User not found with ID: {user_id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_user_row_conversion() {
        let now = Utc::now();
        let row: UserDbRow = (1, "CCT1234".to_string(), "54321".to_string(), true, now, now, None);
        let user = UserDetailType::from(row);
        assert_eq!(user.username, "CCT1234");
        assert!(user.enabled);
        assert!(user.last_login.is_none());
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use super::*;
    use sqlx::PgPool;

    #[sqlx::test]
    async fn test_insert_then_find_user() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let dao = UserDao::new();
        let created = dao.insert_user(&mut transaction, "testuser1", "secret", true).await.unwrap();
        let found = dao.find_by_username(&mut transaction, "testuser1").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.password, "secret");
        transaction.rollback().await.unwrap(); // Rollback the transaction to avoid leaving test data in the database
    }

    #[sqlx::test]
    async fn test_touch_last_login_sets_timestamp() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let dao = UserDao::new();
        let created = dao.insert_user(&mut transaction, "testuser2", "secret", true).await.unwrap();
        dao.touch_last_login(&mut transaction, created.id).await.unwrap();
        let found = dao.find_by_username(&mut transaction, "testuser2").await.unwrap().unwrap();
        assert!(found.last_login.is_some());
        transaction.rollback().await.unwrap(); // Rollback the transaction to avoid leaving test data in the database
    }

    /**
     * Initialize the database connection pool.
     */
    async fn init_db() -> PgPool {
        dotenv::from_filename("./sqlx-postgresql-migration/.env-test").ok();
        let pool = PgPool::connect(dotenv::var("DATABASE_URL").unwrap().as_str()).await.unwrap();
        sqlx::migrate!("./sqlx-postgresql-migration/migrations").run(&pool).await.unwrap();
        pool
    }
}
