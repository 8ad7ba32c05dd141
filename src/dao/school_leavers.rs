use std::borrow::Cow;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::{FilterOptionsOutputType, PageInfoType, PaginationInput, SchoolLeaverDetailType, SchoolLeaverInputType, SchoolLeaverPageType, SearchCriteriaType, SortInput, SummaryOutputType},
};

/**
 * Database response type for a school leaver row.
 */
pub type SchoolLeaverDbRow = (i64, String, String, String, String, String, Decimal, DateTime<Utc>, DateTime<Utc>);

/**
 * Database response type for the aggregate summary.
 */
pub type SummaryDbRow = (i64, Decimal, Decimal, Decimal, Decimal);

/**
 * Columns selected for every school leaver query.
 */
const SCHOOL_LEAVER_COLUMNS: &str = "id, statistic_code, statistic_label, quarter, sex, unit, value, created_at, updated_at";

/**
 * SQL query to insert a school leaver record.
 */
const INSERT_SCHOOL_LEAVER: &str = "INSERT INTO school_leavers (statistic_code, statistic_label, quarter, sex, unit, value, created_at, updated_at) \
                                    VALUES ($1, $2, $3, $4, $5, $6, now(), now()) \
                                    RETURNING id, statistic_code, statistic_label, quarter, sex, unit, value, created_at, updated_at";

/**
 * SQL query to update a school leaver record, refreshing updated_at.
 */
const UPDATE_SCHOOL_LEAVER: &str = "UPDATE school_leavers SET statistic_code = $1, statistic_label = $2, quarter = $3, sex = $4, unit = $5, value = $6, updated_at = now() \
                                    WHERE id = $7 \
                                    RETURNING id, statistic_code, statistic_label, quarter, sex, unit, value, created_at, updated_at";

/**
 * SQL query to delete a school leaver record.
 */
const DELETE_SCHOOL_LEAVER: &str = "DELETE FROM school_leavers WHERE id = $1";

/**
 * SQL query to count all school leaver records.
 */
const COUNT_SCHOOL_LEAVERS: &str = "SELECT COUNT(*) FROM school_leavers";

/**
 * SQL query to count records matching the search criteria.
 */
const COUNT_SEARCH: &str = "SELECT COUNT(*) FROM school_leavers \
                            WHERE ($1::varchar IS NULL OR statistic_code LIKE '%' || $1 || '%') AND \
                                  ($2::varchar IS NULL OR quarter = $2) AND \
                                  ($3::varchar IS NULL OR sex = $3)";

/**
 * SQL query for the aggregate summary, optionally scoped to a statistic
 * code. Aggregates resolve to zero rather than NULL when no rows match.
 */
const QUERY_SUMMARY: &str = "SELECT COUNT(*), COALESCE(AVG(value), 0), COALESCE(MAX(value), 0), COALESCE(MIN(value), 0), COALESCE(SUM(value), 0) \
                             FROM school_leavers WHERE ($1::varchar IS NULL OR statistic_code = $1)";

/**
 * SQL queries for the distinct filter option values.
 */
const QUERY_DISTINCT_CODES: &str = "SELECT DISTINCT statistic_code FROM school_leavers ORDER BY statistic_code";
const QUERY_DISTINCT_QUARTERS: &str = "SELECT DISTINCT quarter FROM school_leavers ORDER BY quarter DESC";
const QUERY_DISTINCT_SEXES: &str = "SELECT DISTINCT sex FROM school_leavers ORDER BY sex";
const QUERY_DISTINCT_UNITS: &str = "SELECT DISTINCT unit FROM school_leavers ORDER BY unit";

impl From<SchoolLeaverDbRow> for SchoolLeaverDetailType {
    fn from(row: SchoolLeaverDbRow) -> Self {
        SchoolLeaverDetailType { id: row.0, statistic_code: row.1, statistic_label: row.2, quarter: row.3, sex: row.4, unit: row.5, value: row.6, created_at: row.7, updated_at: row.8 }
    }
}

/**
 * DAO for school leaver database operations.
 */
pub struct SchoolLeaverDao {}

impl SchoolLeaverDao {
    /**
     * Creates a new instance of `SchoolLeaverDao`.
     */
    pub fn new() -> Self {
        SchoolLeaverDao {}
    }

    /**
     * Inserts a new school leaver record.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     * `input`: The validated record to insert.
     *
     * # Returns
     * The stored record including generated id and timestamps.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn insert_school_leaver(&self, transaction: &mut PgConnection, input: SchoolLeaverInputType) -> Result<SchoolLeaverDetailType, ApplicationError> {
        let span = tracing::Span::current();
        let row: SchoolLeaverDbRow = sqlx::query_as(INSERT_SCHOOL_LEAVER)
            .bind(input.statistic_code)
            .bind(input.statistic_label)
            .bind(input.quarter)
            .bind(input.sex)
            .bind(input.unit)
            .bind(input.value)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| Self::handle_database_error(err.as_database_error()))?;
        Ok(SchoolLeaverDetailType::from(row))
    }

    /**
     * Retrieves a school leaver record by its ID.
     *
     * # Arguments
     * `connection`: The database connection.
     * `id`: The ID of the record.
     *
     * # Returns
     * The record, or a `NotFound` error when absent.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_school_leaver(&self, connection: &mut PgConnection, id: i64) -> Result<SchoolLeaverDetailType, ApplicationError> {
        let span = tracing::Span::current();
        let query = format!("SELECT {SCHOOL_LEAVER_COLUMNS} FROM school_leavers WHERE id = $1");
        let row: Option<SchoolLeaverDbRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get school leaver: {err}")))?;
        row.map(SchoolLeaverDetailType::from).ok_or_else(|| ApplicationError::new(ErrorType::NotFound, format!("School leaver not found with ID: {id}")))
    }

    /**
     * Retrieves a sorted page of school leaver records along with the
     * page metadata.
     *
     * # Arguments
     * `connection`: The database connection.
     * `pagination`: Clamped pagination parameters.
     * `sort`: Validated sort parameters.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_school_leaver_list(&self, connection: &mut PgConnection, pagination: PaginationInput, sort: SortInput) -> Result<SchoolLeaverPageType, ApplicationError> {
        let span = tracing::Span::current();
        let total: (i64,) = sqlx::query_as(COUNT_SCHOOL_LEAVERS)
            .fetch_one(&mut *connection)
            .instrument(span.clone())
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to count school leavers: {err}")))?;
        let query = Self::build_list_query(&sort);
        let rows: Vec<SchoolLeaverDbRow> = sqlx::query_as(&query)
            .bind(pagination.size)
            .bind(pagination.offset())
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get school leaver list: {err}")))?;
        let elements = rows.into_iter().map(SchoolLeaverDetailType::from).collect();
        Ok(SchoolLeaverPageType::new(elements, PageInfoType::new(&pagination, total.0)))
    }

    /**
     * Retrieves a sorted page of school leaver records matching the search
     * criteria. Criteria are combined with AND semantics; the statistic
     * code matches as a substring, quarter and sex match exactly.
     *
     * # Arguments
     * `connection`: The database connection.
     * `criteria`: Optional filter criteria.
     * `pagination`: Clamped pagination parameters.
     * `sort`: Validated sort parameters.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn search_school_leavers(
        &self,
        connection: &mut PgConnection,
        criteria: &SearchCriteriaType,
        pagination: PaginationInput,
        sort: SortInput,
    ) -> Result<SchoolLeaverPageType, ApplicationError> {
        let span = tracing::Span::current();
        let total: (i64,) = sqlx::query_as(COUNT_SEARCH)
            .bind(criteria.statistic_code.as_deref())
            .bind(criteria.quarter.as_deref())
            .bind(criteria.sex.as_deref())
            .fetch_one(&mut *connection)
            .instrument(span.clone())
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to count search results: {err}")))?;
        let query = Self::build_search_query(&sort);
        let rows: Vec<SchoolLeaverDbRow> = sqlx::query_as(&query)
            .bind(criteria.statistic_code.as_deref())
            .bind(criteria.quarter.as_deref())
            .bind(criteria.sex.as_deref())
            .bind(pagination.size)
            .bind(pagination.offset())
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to search school leavers: {err}")))?;
        let elements = rows.into_iter().map(SchoolLeaverDetailType::from).collect();
        Ok(SchoolLeaverPageType::new(elements, PageInfoType::new(&pagination, total.0)))
    }

    /**
     * Updates an existing school leaver record, overwriting all mutable
     * fields and refreshing updated_at.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     * `id`: The ID of the record to update.
     * `input`: The validated replacement values.
     *
     * # Returns
     * The updated record, or a `NotFound` error when absent.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn update_school_leaver(&self, transaction: &mut PgConnection, id: i64, input: SchoolLeaverInputType) -> Result<SchoolLeaverDetailType, ApplicationError> {
        let span = tracing::Span::current();
        let row: Option<SchoolLeaverDbRow> = sqlx::query_as(UPDATE_SCHOOL_LEAVER)
            .bind(input.statistic_code)
            .bind(input.statistic_label)
            .bind(input.quarter)
            .bind(input.sex)
            .bind(input.unit)
            .bind(input.value)
            .bind(id)
            .fetch_optional(transaction)
            .instrument(span)
            .await
            .map_err(|err| Self::handle_database_error(err.as_database_error()))?;
        row.map(SchoolLeaverDetailType::from).ok_or_else(|| {
            tracing::debug!("School leaver with ID {} not found for update", id);
            ApplicationError::new(ErrorType::NotFound, format!("School leaver not found with ID: {id}"))
        })
    }

    /**
     * Deletes a school leaver record by its ID.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     * `id`: The ID of the record to delete.
     *
     * # Returns
     * A result indicating success or failure of the operation.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_school_leaver(&self, transaction: &mut PgConnection, id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(DELETE_SCHOOL_LEAVER)
            .bind(id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to delete school leaver: {err}")))?;
        if result.rows_affected() == 0 {
            tracing::debug!("School leaver with ID {} not found for deletion", id);
            return Err(ApplicationError::new(ErrorType::NotFound, format!("School leaver not found with ID: {id}")));
        }
        if result.rows_affected() > 1 {
            tracing::warn!("Multiple school leavers attempted deleted. Rolled back");
            return Err(ApplicationError::new(ErrorType::Application, "Multiple school leavers attempted deleted. Rolled back".to_string()));
        }
        Ok(())
    }

    /**
     * Computes count, average, maximum, minimum and sum of values, over the
     * whole table or scoped to one statistic code.
     *
     * # Arguments
     * `connection`: The database connection.
     * `statistic_code`: Optional statistic code scope, already uppercased.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_summary(&self, connection: &mut PgConnection, statistic_code: Option<&str>) -> Result<SummaryOutputType, ApplicationError> {
        let span = tracing::Span::current();
        let row: SummaryDbRow = sqlx::query_as(QUERY_SUMMARY)
            .bind(statistic_code)
            .fetch_one(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query for summary: {err}")))?;
        Ok(SummaryOutputType { count: row.0, average: row.1, max: row.2, min: row.3, sum: row.4 })
    }

    /**
     * Retrieves the distinct values currently present for each filterable
     * column.
     *
     * # Arguments
     * `connection`: The database connection.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_filter_options(&self, connection: &mut PgConnection) -> Result<FilterOptionsOutputType, ApplicationError> {
        let span = tracing::Span::current();
        let statistic_codes = Self::fetch_distinct(&mut *connection, QUERY_DISTINCT_CODES, &span).await?;
        let quarters = Self::fetch_distinct(&mut *connection, QUERY_DISTINCT_QUARTERS, &span).await?;
        let sexes = Self::fetch_distinct(&mut *connection, QUERY_DISTINCT_SEXES, &span).await?;
        let units = Self::fetch_distinct(&mut *connection, QUERY_DISTINCT_UNITS, &span).await?;
        Ok(FilterOptionsOutputType { statistic_codes, quarters, sexes, units })
    }

    async fn fetch_distinct(connection: &mut PgConnection, query: &str, span: &tracing::Span) -> Result<Vec<String>, ApplicationError> {
        let rows: Vec<(String,)> = sqlx::query_as(query)
            .fetch_all(connection)
            .instrument(span.clone())
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query for filter options: {err}")))?;
        Ok(rows.into_iter().map(|row| row.0).collect())
    }

    /**
     * Builds the paginated list query. The ORDER BY body only ever contains
     * whitelisted column names from `SortInput`.
     */
    fn build_list_query(sort: &SortInput) -> String {
        format!("SELECT {SCHOOL_LEAVER_COLUMNS} FROM school_leavers ORDER BY {} LIMIT $1 OFFSET $2", sort.order_clause())
    }

    /**
     * Builds the search query with the same filters as `COUNT_SEARCH`.
     */
    fn build_search_query(sort: &SortInput) -> String {
        format!(
            "SELECT {SCHOOL_LEAVER_COLUMNS} FROM school_leavers \
             WHERE ($1::varchar IS NULL OR statistic_code LIKE '%' || $1 || '%') AND \
                   ($2::varchar IS NULL OR quarter = $2) AND \
                   ($3::varchar IS NULL OR sex = $3) \
             ORDER BY {} LIMIT $4 OFFSET $5",
            sort.order_clause()
        )
    }

    /**
     * Handles database errors and maps them to application errors.
     *
     * # Arguments
     * `error`: The database error to handle.
     *
     * # Returns
     * An `ApplicationError` corresponding to the database error.
     */
    fn handle_database_error(error: Option<&dyn sqlx::error::DatabaseError>) -> ApplicationError {
        if let Some(db_error) = error {
            tracing::debug!("Database error: {}", db_error);
            if db_error.code() == Some(Cow::Borrowed("23505")) {
                // Unique violation
                return ApplicationError::new(ErrorType::Application, "Already exists".to_string());
            } else if db_error.code() == Some(Cow::Borrowed("22001")) {
                // Value too long
                return ApplicationError::new(ErrorType::Application, "Value too long".to_string());
            } else if db_error.code() == Some(Cow::Borrowed("22003")) {
                // Numeric value out of range
                return ApplicationError::new(ErrorType::Application, "Value out of range".to_string());
            }
            tracing::error!("Unhandled database error: {}", db_error);
            return ApplicationError::new(ErrorType::DatabaseError, "Unhandled database error".to_string());
        }
        ApplicationError::new(ErrorType::DatabaseError, "Failed to execute database operation".to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::models::{SortDirection, SortField};

    #[test]
    fn test_row_conversion() {
        let now = Utc::now();
        let row: SchoolLeaverDbRow = (7, "SL001".to_string(), "Total School Leavers".to_string(), "Q12023".to_string(), "Male".to_string(), "Count".to_string(), Decimal::new(65050, 2), now, now);
        let detail = SchoolLeaverDetailType::from(row);
        assert_eq!(detail.id, 7);
        assert_eq!(detail.statistic_code, "SL001");
        assert_eq!(detail.value, Decimal::new(65050, 2));
    }

    #[test]
    fn test_list_query_uses_default_ordering() {
        let query = SchoolLeaverDao::build_list_query(&SortInput::default());
        assert!(query.contains("ORDER BY quarter DESC, statistic_code ASC"));
    }

    #[test]
    fn test_search_query_uses_requested_sort() {
        let sort = SortInput { sort_by: Some(SortField::Value), direction: SortDirection::Asc };
        let query = SchoolLeaverDao::build_search_query(&sort);
        assert!(query.contains("ORDER BY value ASC"));
        assert!(query.contains("LIKE '%' || $1 || '%'"));
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use super::*;
    use crate::model::models::SortDirection;
    use sqlx::PgPool;

    fn sample_input() -> SchoolLeaverInputType {
        SchoolLeaverInputType {
            statistic_code: "SL001".to_string(),
            statistic_label: "Total School Leavers".to_string(),
            quarter: "Q12023".to_string(),
            sex: "Male".to_string(),
            unit: "Count".to_string(),
            value: Decimal::new(65050, 2),
        }
    }

    #[sqlx::test]
    async fn test_insert_then_get_school_leaver() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let dao = SchoolLeaverDao::new();
        let created = dao.insert_school_leaver(&mut transaction, sample_input()).await.unwrap();
        let fetched = dao.get_school_leaver(&mut transaction, created.id).await.unwrap();
        assert_eq!(created, fetched);
        assert_eq!(fetched.statistic_code, "SL001");
        transaction.rollback().await.unwrap(); // Rollback the transaction to avoid leaving test data in the database
    }

    #[sqlx::test]
    async fn test_update_refreshes_fields() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let dao = SchoolLeaverDao::new();
        let created = dao.insert_school_leaver(&mut transaction, sample_input()).await.unwrap();
        let mut updated_input = sample_input();
        updated_input.sex = "Female".to_string();
        updated_input.value = Decimal::new(58025, 2);
        let updated = dao.update_school_leaver(&mut transaction, created.id, updated_input).await.unwrap();
        assert_eq!(updated.sex, "Female");
        assert_eq!(updated.value, Decimal::new(58025, 2));
        assert_eq!(updated.created_at, created.created_at);
        transaction.rollback().await.unwrap(); // Rollback the transaction to avoid leaving test data in the database
    }

    #[sqlx::test]
    async fn test_delete_missing_school_leaver_is_not_found() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let dao = SchoolLeaverDao::new();
        let result = dao.delete_school_leaver(&mut transaction, 99999).await;
        assert_eq!(result.unwrap_err().error_type, ErrorType::NotFound);
        transaction.rollback().await.unwrap(); // Rollback the transaction to avoid leaving test data in the database
    }

    #[sqlx::test]
    async fn test_search_without_criteria_matches_list() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let dao = SchoolLeaverDao::new();
        dao.insert_school_leaver(&mut transaction, sample_input()).await.unwrap();
        let mut second = sample_input();
        second.quarter = "Q22023".to_string();
        dao.insert_school_leaver(&mut transaction, second).await.unwrap();
        let pagination = PaginationInput { page: 0, size: 10 };
        let listed = dao.get_school_leaver_list(&mut transaction, pagination, SortInput::default()).await.unwrap();
        let searched = dao.search_school_leavers(&mut transaction, &SearchCriteriaType::default(), pagination, SortInput::default()).await.unwrap();
        assert_eq!(listed.elements, searched.elements);
        assert_eq!(listed.pagination, searched.pagination);
        transaction.rollback().await.unwrap(); // Rollback the transaction to avoid leaving test data in the database
    }

    #[sqlx::test]
    async fn test_search_filters_combined_with_and() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let dao = SchoolLeaverDao::new();
        dao.insert_school_leaver(&mut transaction, sample_input()).await.unwrap();
        let mut other = sample_input();
        other.sex = "Female".to_string();
        dao.insert_school_leaver(&mut transaction, other).await.unwrap();
        let criteria = SearchCriteriaType { statistic_code: Some("SL0".to_string()), quarter: Some("Q12023".to_string()), sex: Some("Male".to_string()) };
        let pagination = PaginationInput { page: 0, size: 10 };
        let result = dao.search_school_leavers(&mut transaction, &criteria, pagination, SortInput::default()).await.unwrap();
        assert_eq!(result.elements.len(), 1);
        assert_eq!(result.elements[0].sex, "Male");
        transaction.rollback().await.unwrap(); // Rollback the transaction to avoid leaving test data in the database
    }

    #[sqlx::test]
    async fn test_summary_on_empty_scope_is_zero() {
        let pool = init_db().await;
        let mut connection = pool.acquire().await.unwrap();
        let dao = SchoolLeaverDao::new();
        let summary = dao.get_summary(&mut connection, Some("NOSUCHCODE")).await.unwrap();
        assert_eq!(summary.count, 0);
        assert_eq!(summary.average, Decimal::ZERO);
        assert_eq!(summary.max, Decimal::ZERO);
        assert_eq!(summary.min, Decimal::ZERO);
        assert_eq!(summary.sum, Decimal::ZERO);
    }

    #[sqlx::test]
    async fn test_filter_options_reflect_rows() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let dao = SchoolLeaverDao::new();
        dao.insert_school_leaver(&mut transaction, sample_input()).await.unwrap();
        let options = dao.get_filter_options(&mut transaction).await.unwrap();
        assert!(options.statistic_codes.contains(&"SL001".to_string()));
        assert!(options.quarters.contains(&"Q12023".to_string()));
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
