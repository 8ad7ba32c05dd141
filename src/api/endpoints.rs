use actix_web::{
    HttpRequest, HttpResponse, delete, get, post, put,
    web::{self, Path},
};
use tracing::{Instrument, instrument};

use crate::{
    api::{
        rest::{FilterOptionsResponse, ListQuery, LoginRequest, LoginResponse, MessageResponse, SchoolLeaverListResponse, SchoolLeaverRequest, SchoolLeaverResponse, SearchQuery, SummaryQuery, SummaryResponse},
        state::AppState,
    },
    model::{apperror::ApplicationError, models::PaginationInput},
    service::validation::{SchoolLeaverFormType, validate_login, validate_search},
};

/**
 * Endpoint to log in. Successful logins receive a session token to present
 * as a bearer credential on every other endpoint.
 */
#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "login", trace_id = get_trace_id(&http_request), result))]
#[post("/api/v1_0/login")]
pub async fn login(http_request: HttpRequest, request_body: web::Json<LoginRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let login_input = validate_login(request_body.username.as_ref(), request_body.password.as_ref())?;
    let user = app_state.user_service.authenticate(&login_input).instrument(span).await?;
    let session = app_state.session_service.create_session(&user.username)?;
    Ok(HttpResponse::Ok().json(LoginResponse::new(session.token, session.username)))
}

/**
 * Endpoint to log out, discarding the presented session token.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "logout", trace_id = get_trace_id(&http_request), result))]
#[post("/api/v1_0/logout")]
pub async fn logout(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    app_state.session_service.invalidate(&http_request)?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Logout successful")))
}

/**
 * Endpoint to retrieve a page of school leaver records.
 */
#[instrument(skip(http_request, app_state), fields(service = "listSchoolLeavers", trace_id = get_trace_id(&http_request), result))]
#[get("/api/v1_0/school-leavers")]
pub async fn school_leavers_list(http_request: HttpRequest, query: web::Query<ListQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let _ = app_state.session_service.validate(&http_request)?;
    let (_, sort) = validate_search(None, None, None, query.sort_by.as_ref(), query.sort_dir.as_ref())?;
    let pagination = PaginationInput::clamped(query.page, query.size);
    let page = app_state.school_leaver_service.get_school_leaver_list(pagination, sort).instrument(span).await?;
    Ok(HttpResponse::Ok().json(SchoolLeaverListResponse::from(page)))
}

/**
 * Endpoint to create a new school leaver record.
 */
#[instrument(skip(http_request, request_body, app_state), fields(service = "createSchoolLeaver", trace_id = get_trace_id(&http_request), result))]
#[post("/api/v1_0/school-leavers")]
pub async fn school_leaver_create(http_request: HttpRequest, request_body: web::Json<SchoolLeaverRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let _ = app_state.session_service.validate(&http_request)?;
    let form = SchoolLeaverFormType::from(request_body.into_inner());
    let created = app_state.school_leaver_service.create_school_leaver(&form).instrument(span).await?;
    Ok(HttpResponse::Created().json(SchoolLeaverResponse::new(created, Some("School leaver record created successfully".to_string()))))
}

/**
 * Endpoint to search school leaver records. Criteria are combined with AND
 * semantics; an empty criteria set behaves like the plain list.
 */
#[instrument(skip(http_request, app_state), fields(service = "searchSchoolLeavers", trace_id = get_trace_id(&http_request), result))]
#[get("/api/v1_0/school-leavers/search")]
pub async fn school_leavers_search(http_request: HttpRequest, query: web::Query<SearchQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let _ = app_state.session_service.validate(&http_request)?;
    let (criteria, sort) = validate_search(query.statistic_code.as_ref(), query.quarter.as_ref(), query.sex.as_ref(), query.sort_by.as_ref(), query.sort_dir.as_ref())?;
    let pagination = PaginationInput::clamped(query.page, query.size);
    let page = app_state.school_leaver_service.search_school_leavers(&criteria, pagination, sort).instrument(span).await?;
    Ok(HttpResponse::Ok().json(SchoolLeaverListResponse::from(page)))
}

/**
 * Endpoint to compute the aggregate summary, optionally scoped to one
 * statistic code.
 */
#[instrument(skip(http_request, app_state), fields(service = "schoolLeaverSummary", trace_id = get_trace_id(&http_request), result))]
#[get("/api/v1_0/school-leavers/summary")]
pub async fn school_leavers_summary(http_request: HttpRequest, query: web::Query<SummaryQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let _ = app_state.session_service.validate(&http_request)?;
    let summary = app_state.school_leaver_service.get_summary(query.statistic_code.as_deref()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(SummaryResponse::from(summary)))
}

/**
 * Endpoint to retrieve the distinct filter option values.
 */
#[instrument(skip(http_request, app_state), fields(service = "schoolLeaverFilterOptions", trace_id = get_trace_id(&http_request), result))]
#[get("/api/v1_0/school-leavers/filter-options")]
pub async fn school_leavers_filter_options(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let _ = app_state.session_service.validate(&http_request)?;
    let options = app_state.school_leaver_service.get_filter_options().instrument(span).await?;
    Ok(HttpResponse::Ok().json(FilterOptionsResponse::from(options)))
}

/**
 * Endpoint to retrieve a single school leaver record by ID.
 */
#[instrument(skip(http_request, app_state), fields(service = "getSchoolLeaver", trace_id = get_trace_id(&http_request), result))]
#[get("/api/v1_0/school-leavers/{id}")]
pub async fn school_leaver_get(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let _ = app_state.session_service.validate(&http_request)?;
    let id = path.into_inner();
    let detail = app_state.school_leaver_service.get_school_leaver(id).instrument(span).await?;
    Ok(HttpResponse::Ok().json(SchoolLeaverResponse::new(detail, None)))
}

/**
 * Endpoint to replace an existing school leaver record.
 */
#[instrument(skip(http_request, request_body, app_state), fields(service = "updateSchoolLeaver", trace_id = get_trace_id(&http_request), result))]
#[put("/api/v1_0/school-leavers/{id}")]
pub async fn school_leaver_update(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<SchoolLeaverRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let _ = app_state.session_service.validate(&http_request)?;
    let id = path.into_inner();
    let form = SchoolLeaverFormType::from(request_body.into_inner());
    let updated = app_state.school_leaver_service.update_school_leaver(id, &form).instrument(span).await?;
    Ok(HttpResponse::Ok().json(SchoolLeaverResponse::new(updated, Some("School leaver record updated successfully".to_string()))))
}

/**
 * Endpoint to delete a school leaver record.
 */
#[instrument(skip(http_request, app_state), fields(service = "deleteSchoolLeaver", trace_id = get_trace_id(&http_request), result))]
#[delete("/api/v1_0/school-leavers/{id}")]
pub async fn school_leaver_delete(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let _ = app_state.session_service.validate(&http_request)?;
    let id = path.into_inner();
    app_state.school_leaver_service.delete_school_leaver(id).instrument(span).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("School leaver record deleted successfully")))
}

/**
 * Retrieves the trace ID from the HTTP request headers.
 * If the trace ID is not present, a new UUID is generated.
 */
fn get_trace_id(http_request: &HttpRequest) -> String {
    http_request.headers().get("X-Trace-ID").and_then(|v| v.to_str().ok().map(std::string::ToString::to_string)).unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

#[cfg(test)]
mod test {
    use actix_web::test::TestRequest;

    use super::*;

    #[actix_web::test]
    async fn test_get_trace_id_exists() {
        let request = TestRequest::default().insert_header(("X-Trace-ID", "test")).to_http_request();
        let trace_id = get_trace_id(&request);
        assert_eq!(trace_id, "test");
    }

    #[actix_web::test]
    async fn test_get_trace_id_not_exists() {
        let request = TestRequest::default().to_http_request();
        let trace_id = get_trace_id(&request);
        assert!(!trace_id.is_empty());
    }
}
