use std::collections::HashMap;

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{FilterOptionsOutputType, PageInfoType, SchoolLeaverDetailType, SchoolLeaverPageType, SummaryOutputType},
    },
    service::validation::SchoolLeaverFormType,
};

/***************** School leaver models *********************/

/**
 * Request structure for creating or replacing a school leaver record.
 *
 * Every field is optional at the wire level; the validation layer reports
 * the missing ones.
 */
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolLeaverRequest {
    pub statistic_code: Option<String>,
    pub statistic_label: Option<String>,
    pub quarter: Option<String>,
    pub sex: Option<String>,
    pub unit: Option<String>,
    pub value: Option<Decimal>,
}

/**
 * Converts from SchoolLeaverRequest to the raw form handed to the
 * validation layer.
 */
impl From<SchoolLeaverRequest> for SchoolLeaverFormType {
    fn from(request: SchoolLeaverRequest) -> Self {
        SchoolLeaverFormType {
            statistic_code: request.statistic_code,
            statistic_label: request.statistic_label,
            quarter: request.quarter,
            sex: request.sex,
            unit: request.unit,
            value: request.value,
        }
    }
}

/**
 * Represents one school leaver record in API responses.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolLeaverElement {
    /**
     * The unique identifier for the record.
     */
    id: i64,
    /**
     * The statistic code, always uppercase.
     */
    statistic_code: String,
    /**
     * The human readable statistic label.
     */
    statistic_label: String,
    /**
     * The quarter the observation covers.
     */
    quarter: String,
    /**
     * The sex breakdown of the observation.
     */
    sex: String,
    /**
     * The unit of the value.
     */
    unit: String,
    /**
     * The observed value.
     */
    value: Decimal,
    /**
     * The timestamp when the record was created.
     */
    created_at: chrono::DateTime<Utc>,
    /**
     * The timestamp when the record was last updated.
     */
    updated_at: chrono::DateTime<Utc>,
}

/**
 * Converts from SchoolLeaverDetailType to SchoolLeaverElement.
 *
 * This conversion is used to transform the internal detail type into a response format suitable for API responses.
 */
impl From<SchoolLeaverDetailType> for SchoolLeaverElement {
    fn from(detail: SchoolLeaverDetailType) -> Self {
        SchoolLeaverElement {
            id: detail.id,
            statistic_code: detail.statistic_code,
            statistic_label: detail.statistic_label,
            quarter: detail.quarter,
            sex: detail.sex,
            unit: detail.unit,
            value: detail.value,
            created_at: detail.created_at,
            updated_at: detail.updated_at,
        }
    }
}

/**
 * Response structure wrapping a single school leaver record.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolLeaverResponse {
    /**
     * Always true; failures use `ErrorResponse` instead.
     */
    pub success: bool,
    /**
     * The record.
     */
    pub data: SchoolLeaverElement,
    /**
     * Optional human readable message.
     */
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SchoolLeaverResponse {
    /**
     * Creates a new instance of SchoolLeaverResponse.
     *
     * # Arguments
     * `detail`: The record.
     * `message`: Optional human readable message.
     */
    pub fn new(detail: SchoolLeaverDetailType, message: Option<String>) -> Self {
        SchoolLeaverResponse { success: true, data: SchoolLeaverElement::from(detail), message }
    }
}

/**
 * Response structure for listing or searching school leaver records.
 *
 * This structure contains the page of records and pagination information.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolLeaverListResponse {
    /**
     * Always true; failures use `ErrorResponse` instead.
     */
    pub success: bool,
    /**
     * The records on this page.
     */
    pub data: Vec<SchoolLeaverElement>,
    /**
     * Pagination information for the response.
     */
    pub pagination: PaginationResponse,
}

/**
 * Converts from SchoolLeaverPageType to SchoolLeaverListResponse.
 */
impl From<SchoolLeaverPageType> for SchoolLeaverListResponse {
    fn from(page: SchoolLeaverPageType) -> Self {
        let data: Vec<SchoolLeaverElement> = page.elements.into_iter().map(SchoolLeaverElement::from).collect();
        SchoolLeaverListResponse { success: true, data, pagination: PaginationResponse::from(page.pagination) }
    }
}

/***************** Summary and filter option models *********************/

/**
 * Response structure for the aggregate summary.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub success: bool,
    pub data: SummaryElement,
}

/**
 * Aggregates over the selected records, rounded to two fraction digits.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryElement {
    pub count: i64,
    pub average: Decimal,
    pub max: Decimal,
    pub min: Decimal,
    pub sum: Decimal,
}

impl From<SummaryOutputType> for SummaryResponse {
    fn from(summary: SummaryOutputType) -> Self {
        SummaryResponse { success: true, data: SummaryElement { count: summary.count, average: summary.average, max: summary.max, min: summary.min, sum: summary.sum } }
    }
}

/**
 * Response structure for the filter option values.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptionsResponse {
    pub success: bool,
    pub data: FilterOptionsElement,
}

/**
 * Distinct values per filterable column, used to populate UI dropdowns.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptionsElement {
    pub statistic_codes: Vec<String>,
    pub quarters: Vec<String>,
    pub sexes: Vec<String>,
    pub units: Vec<String>,
}

impl From<FilterOptionsOutputType> for FilterOptionsResponse {
    fn from(options: FilterOptionsOutputType) -> Self {
        FilterOptionsResponse {
            success: true,
            data: FilterOptionsElement { statistic_codes: options.statistic_codes, quarters: options.quarters, sexes: options.sexes, units: options.units },
        }
    }
}

/***************** Auth models *********************/

/**
 * Request structure for logging in.
 */
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/**
 * Response structure for a successful login.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    /**
     * The opaque session token to present as a bearer credential.
     */
    pub token: String,
    pub username: String,
    pub message: String,
}

impl LoginResponse {
    pub fn new(token: String, username: String) -> Self {
        LoginResponse { success: true, token, username, message: "Login successful".to_string() }
    }
}

/**
 * Response structure for operations that only report an outcome message,
 * such as logout and delete.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        MessageResponse { success: true, message: message.to_string() }
    }
}

/***************** Error models *********************/

/**
 * Custom error response for the application.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /**
     * Always false.
     */
    pub success: bool,
    /**
     * A stable label for the error category.
     */
    pub error: String,
    /**
     * A human-readable message describing the error.
     */
    pub message: String,
    /**
     * Field violations, only present for validation errors.
     */
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<HashMap<String, String>>,
}

impl ResponseError for ApplicationError {
    /**
     * Generates an error response for the application error. Internal
     * failures never leak their message to the caller.
     */
    fn error_response(&self) -> HttpResponse {
        let status = get_statuscode(&self.error_type);
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR { "An unexpected error occurred".to_string() } else { self.message.clone() };
        let error_response = ErrorResponse { success: false, error: get_error_label(&self.error_type).to_string(), message, field_errors: self.field_errors.clone() };
        HttpResponse::build(status).json(&error_response)
    }
}

/**
* Maps application errors to HTTP status codes.
*
* # Arguments
* `application_error`: The type of error that occurred.
*
* # Returns
* The corresponding HTTP status code.
*/
fn get_statuscode(application_error: &ErrorType) -> StatusCode {
    match application_error {
        ErrorType::Validation => StatusCode::BAD_REQUEST,
        ErrorType::Authentication | ErrorType::Authorization => StatusCode::UNAUTHORIZED,
        ErrorType::NotFound => StatusCode::NOT_FOUND,
        ErrorType::DatabaseError | ErrorType::Application | ErrorType::Initialization => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/**
 * Maps application errors to stable error labels.
 *
 * # Arguments
 * `application_error`: The type of error that occurred.
 *
 * # Returns
 * The corresponding label.
 */
fn get_error_label(application_error: &ErrorType) -> &'static str {
    match application_error {
        ErrorType::Validation => "VALIDATION_ERROR",
        ErrorType::Authentication => "AUTHENTICATION_ERROR",
        ErrorType::Authorization => "UNAUTHORIZED",
        ErrorType::NotFound => "NOT_FOUND",
        ErrorType::DatabaseError | ErrorType::Application | ErrorType::Initialization => "INTERNAL_ERROR",
    }
}

/***************** Common models *********************/

/**
 * Pagination and sorting query parameters for list requests.
 */
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    /**
     * Zero based page number.
     */
    pub page: Option<i64>,
    /**
     * The size of the page to return.
     */
    pub size: Option<i64>,
    /**
     * The wire name of the column to sort on.
     */
    pub sort_by: Option<String>,
    /**
     * The sort direction, asc or desc.
     */
    pub sort_dir: Option<String>,
}

/**
 * Query parameters for searching, pagination and sorting included.
 */
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub statistic_code: Option<String>,
    pub quarter: Option<String>,
    pub sex: Option<String>,
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
}

/**
 * Query parameter scoping the summary to one statistic code.
 */
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryQuery {
    pub statistic_code: Option<String>,
}

/**
 * Pagination response structure.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationResponse {
    /**
     * The zero based page number of the returned page.
     */
    pub current_page: i64,
    /**
     * The total number of pages for the current page size.
     */
    pub total_pages: i64,
    /**
     * The total number of matching records.
     */
    pub total_elements: i64,
    /**
     * The size of the page.
     */
    pub size: i64,
    /**
     * Indicates if a later page exists.
     */
    pub has_next: bool,
    /**
     * Indicates if an earlier page exists.
     */
    pub has_previous: bool,
}

impl From<PageInfoType> for PaginationResponse {
    fn from(page_info: PageInfoType) -> Self {
        PaginationResponse {
            current_page: page_info.current_page,
            total_pages: page_info.total_pages,
            total_elements: page_info.total_elements,
            size: page_info.size,
            has_next: page_info.has_next,
            has_previous: page_info.has_previous,
        }
    }
}
