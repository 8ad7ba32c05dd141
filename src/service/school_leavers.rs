use sqlx::{Pool, Postgres};
use tracing::{Instrument, instrument};

use crate::{
    dao::school_leavers::SchoolLeaverDao,
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{FilterOptionsOutputType, PaginationInput, SchoolLeaverDetailType, SchoolLeaverPageType, SearchCriteriaType, SortInput, SummaryOutputType},
    },
    service::validation::{SchoolLeaverFormType, validate_school_leaver},
};

/**
 * Represents the service for managing school leaver records.
 */
pub struct SchoolLeaverService {
    /**
     * The DAO for school leaver operations.
     */
    school_leaver_dao: SchoolLeaverDao,
    /**
     * Optional connection pool for database operations. Optional for test purposes until we have a better way to mock the database.
     */
    connection_pool: Option<Pool<Postgres>>,
}

impl SchoolLeaverService {
    /**
     * Creates a new instance of `SchoolLeaverService`.
     *
     * # Arguments
     * `school_leaver_dao`: The DAO for school leaver operations.
     * `connection_pool`: Optional connection pool for database operations.
     */
    pub fn new(school_leaver_dao: SchoolLeaverDao, connection_pool: Option<Pool<Postgres>>) -> Self {
        SchoolLeaverService { school_leaver_dao, connection_pool }
    }

    fn pool(&self) -> Result<&Pool<Postgres>, ApplicationError> {
        self.connection_pool.as_ref().ok_or_else(|| ApplicationError::new(ErrorType::DatabaseError, "No database connection available".to_string()))
    }

    /**
     * Validates and stores a new school leaver record. The statistic code
     * is uppercased by the validation layer before it reaches the store;
     * nothing is persisted when any field violation exists.
     *
     * # Arguments
     * `form`: The raw payload.
     *
     * # Returns
     * The stored record, or a validation error with the field violations.
     */
    #[instrument(skip(self, form), fields(result))]
    pub async fn create_school_leaver(&self, form: &SchoolLeaverFormType) -> Result<SchoolLeaverDetailType, ApplicationError> {
        let span = tracing::Span::current();
        let input = validate_school_leaver(form)?;
        tracing::info!("Creating new school leaver record: {}", input.statistic_code);
        let mut transaction = self.pool()?.begin().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to begin transaction: {err}")))?;
        match self.school_leaver_dao.insert_school_leaver(&mut transaction, input).instrument(span).await {
            Ok(created) => {
                transaction.commit().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to commit transaction: {err}")))?;
                tracing::info!("School leaver record created successfully with ID: {}", created.id);
                Ok(created)
            }
            Err(err) => {
                transaction.rollback().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to rollback transaction: {err}")))?;
                Err(err)
            }
        }
    }

    /**
     * Retrieves a school leaver record by its ID.
     *
     * # Arguments
     * `id`: The ID of the record.
     *
     * # Returns
     * The record, or a `NotFound` error when absent.
     */
    #[instrument(skip(self), fields(result))]
    pub async fn get_school_leaver(&self, id: i64) -> Result<SchoolLeaverDetailType, ApplicationError> {
        let span = tracing::Span::current();
        let mut connection = self.pool()?.acquire().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to acquire connection: {err}")))?;
        self.school_leaver_dao.get_school_leaver(&mut connection, id).instrument(span).await
    }

    /**
     * Retrieves a page of school leaver records.
     *
     * # Arguments
     * `pagination`: Clamped pagination parameters.
     * `sort`: Validated sort parameters.
     */
    #[instrument(skip(self), fields(result))]
    pub async fn get_school_leaver_list(&self, pagination: PaginationInput, sort: SortInput) -> Result<SchoolLeaverPageType, ApplicationError> {
        let span = tracing::Span::current();
        let mut connection = self.pool()?.acquire().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to acquire connection: {err}")))?;
        self.school_leaver_dao.get_school_leaver_list(&mut connection, pagination, sort).instrument(span).await
    }

    /**
     * Validates the replacement payload and overwrites an existing record.
     *
     * # Arguments
     * `id`: The ID of the record to update.
     * `form`: The raw replacement payload.
     *
     * # Returns
     * The updated record, a validation error, or `NotFound` when absent.
     */
    #[instrument(skip(self, form), fields(result))]
    pub async fn update_school_leaver(&self, id: i64, form: &SchoolLeaverFormType) -> Result<SchoolLeaverDetailType, ApplicationError> {
        let span = tracing::Span::current();
        let input = validate_school_leaver(form)?;
        tracing::info!("Updating school leaver with ID: {}", id);
        let mut transaction = self.pool()?.begin().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to begin transaction: {err}")))?;
        match self.school_leaver_dao.update_school_leaver(&mut transaction, id, input).instrument(span).await {
            Ok(updated) => {
                transaction.commit().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to commit transaction: {err}")))?;
                tracing::info!("School leaver updated successfully with ID: {}", updated.id);
                Ok(updated)
            }
            Err(err) => {
                transaction.rollback().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to rollback transaction: {err}")))?;
                Err(err)
            }
        }
    }

    /**
     * Deletes a school leaver record by its ID.
     *
     * # Arguments
     * `id`: The ID of the record to delete.
     *
     * # Returns
     * A result indicating success, or `NotFound` when absent.
     */
    #[instrument(skip(self), fields(result))]
    pub async fn delete_school_leaver(&self, id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        tracing::info!("Deleting school leaver with ID: {}", id);
        let mut transaction = self.pool()?.begin().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to begin transaction: {err}")))?;
        match self.school_leaver_dao.delete_school_leaver(&mut transaction, id).instrument(span).await {
            Ok(()) => {
                transaction.commit().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to commit transaction: {err}")))?;
                Ok(())
            }
            Err(err) => {
                transaction.rollback().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to rollback transaction: {err}")))?;
                Err(err)
            }
        }
    }

    /**
     * Searches school leaver records. When no criteria are supplied the
     * result is the unfiltered paginated list with identical sort and page
     * parameters.
     *
     * # Arguments
     * `criteria`: Validated optional criteria, combined with AND semantics.
     * `pagination`: Clamped pagination parameters.
     * `sort`: Validated sort parameters.
     */
    #[instrument(skip(self), fields(result))]
    pub async fn search_school_leavers(&self, criteria: &SearchCriteriaType, pagination: PaginationInput, sort: SortInput) -> Result<SchoolLeaverPageType, ApplicationError> {
        if criteria.is_empty() {
            return self.get_school_leaver_list(pagination, sort).await;
        }
        let span = tracing::Span::current();
        let mut connection = self.pool()?.acquire().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to acquire connection: {err}")))?;
        self.school_leaver_dao.search_school_leavers(&mut connection, criteria, pagination, sort).instrument(span).await
    }

    /**
     * Computes the aggregate summary, optionally scoped to one statistic
     * code. All decimal aggregates are rounded to two fraction digits; an
     * empty scope yields zeroes.
     *
     * # Arguments
     * `statistic_code`: Optional statistic code, uppercased before matching.
     */
    #[instrument(skip(self), fields(result))]
    pub async fn get_summary(&self, statistic_code: Option<&str>) -> Result<SummaryOutputType, ApplicationError> {
        let span = tracing::Span::current();
        let mut connection = self.pool()?.acquire().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to acquire connection: {err}")))?;
        let scope = statistic_code.map(str::to_uppercase);
        let summary = self.school_leaver_dao.get_summary(&mut connection, scope.as_deref()).instrument(span).await?;
        Ok(SummaryOutputType {
            count: summary.count,
            average: summary.average.round_dp(2),
            max: summary.max.round_dp(2),
            min: summary.min.round_dp(2),
            sum: summary.sum.round_dp(2),
        })
    }

    /**
     * Retrieves the distinct filter option values for the UI dropdowns.
     */
    #[instrument(skip(self), fields(result))]
    pub async fn get_filter_options(&self) -> Result<FilterOptionsOutputType, ApplicationError> {
        let span = tracing::Span::current();
        let mut connection = self.pool()?.acquire().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to acquire connection: {err}")))?;
        self.school_leaver_dao.get_filter_options(&mut connection).instrument(span).await
    }
}
