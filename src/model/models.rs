use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/**
 * Default page size when the caller does not supply one.
 */
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/**
 * Upper bound for the page size. Larger requests are clamped, not rejected.
 */
pub const MAX_PAGE_SIZE: i64 = 100;

/**
 * A single school leaver statistic observation as stored.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct SchoolLeaverDetailType {
    pub id: i64,
    pub statistic_code: String,
    pub statistic_label: String,
    pub quarter: String,
    pub sex: String,
    pub unit: String,
    pub value: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/**
 * Validated input for creating or updating a school leaver record.
 *
 * Instances are only constructed by the validation layer, so every field
 * already satisfies the documented constraints and the statistic code is
 * uppercased.
 */
#[derive(Debug, Clone)]
pub struct SchoolLeaverInputType {
    pub statistic_code: String,
    pub statistic_label: String,
    pub quarter: String,
    pub sex: String,
    pub unit: String,
    pub value: Decimal,
}

/**
 * Optional search criteria, combined with AND semantics.
 */
#[derive(Debug, Clone, Default)]
pub struct SearchCriteriaType {
    /**
     * Substring match on the statistic code.
     */
    pub statistic_code: Option<String>,
    /**
     * Exact quarter match.
     */
    pub quarter: Option<String>,
    /**
     * Exact sex match.
     */
    pub sex: Option<String>,
}

impl SearchCriteriaType {
    pub fn is_empty(&self) -> bool {
        self.statistic_code.is_none() && self.quarter.is_none() && self.sex.is_none()
    }
}

/**
 * Columns the caller is allowed to sort on. Anything else is rejected by the
 * validation layer rather than silently defaulted.
 */
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SortField {
    Id,
    StatisticCode,
    StatisticLabel,
    Quarter,
    Sex,
    Unit,
    Value,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    /**
     * Resolves the wire name of a sort field to the enum.
     *
     * # Returns
     * `None` for unknown names.
     */
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "id" => Some(SortField::Id),
            "statisticCode" => Some(SortField::StatisticCode),
            "statisticLabel" => Some(SortField::StatisticLabel),
            "quarter" => Some(SortField::Quarter),
            "sex" => Some(SortField::Sex),
            "unit" => Some(SortField::Unit),
            "value" => Some(SortField::Value),
            "createdAt" => Some(SortField::CreatedAt),
            "updatedAt" => Some(SortField::UpdatedAt),
            _ => None,
        }
    }

    /**
     * The database column backing the sort field. Only these fixed strings
     * are ever interpolated into a query.
     */
    pub fn column(self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::StatisticCode => "statistic_code",
            SortField::StatisticLabel => "statistic_label",
            SortField::Quarter => "quarter",
            SortField::Sex => "sex",
            SortField::Unit => "unit",
            SortField::Value => "value",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
        }
    }
}

/**
 * Sort direction, defaults to descending.
 */
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn keyword(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/**
 * Validated sort parameters.
 */
#[derive(Debug, Clone, Copy, Default)]
pub struct SortInput {
    pub sort_by: Option<SortField>,
    pub direction: SortDirection,
}

impl SortInput {
    /**
     * Builds the ORDER BY clause body. When the caller did not request a
     * specific column the default ordering is quarter descending then
     * statistic code ascending.
     */
    pub fn order_clause(&self) -> String {
        match self.sort_by {
            Some(field) => format!("{} {}", field.column(), self.direction.keyword()),
            None => "quarter DESC, statistic_code ASC".to_string(),
        }
    }
}

/**
 * Pagination parameters after clamping.
 */
#[derive(Debug, Clone, Copy)]
pub struct PaginationInput {
    /**
     * Zero based page number.
     */
    pub page: i64,
    /**
     * Page size, 1..=MAX_PAGE_SIZE.
     */
    pub size: i64,
}

impl PaginationInput {
    /**
     * Clamps raw pagination parameters into their valid ranges. Out of range
     * values are adjusted silently.
     */
    pub fn clamped(page: Option<i64>, size: Option<i64>) -> Self {
        let page = page.unwrap_or(0).max(0);
        let size = size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        PaginationInput { page, size }
    }

    pub fn offset(&self) -> i64 {
        self.page * self.size
    }
}

/**
 * Page metadata exposed alongside every paginated result.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct PageInfoType {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_elements: i64,
    pub size: i64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl PageInfoType {
    /**
     * Derives page metadata from the pagination input and the total number
     * of matching rows.
     */
    pub fn new(pagination: &PaginationInput, total_elements: i64) -> Self {
        // Rounded-up division; size is clamped to >= 1.
        let total_pages = if total_elements == 0 { 0 } else { (total_elements + pagination.size - 1) / pagination.size };
        PageInfoType {
            current_page: pagination.page,
            total_pages,
            total_elements,
            size: pagination.size,
            has_next: pagination.page + 1 < total_pages,
            has_previous: pagination.page > 0 && total_pages > 0,
        }
    }
}

/**
 * One page of school leaver records plus metadata.
 */
#[derive(Debug)]
pub struct SchoolLeaverPageType {
    pub elements: Vec<SchoolLeaverDetailType>,
    pub pagination: PageInfoType,
}

impl SchoolLeaverPageType {
    pub fn new(elements: Vec<SchoolLeaverDetailType>, pagination: PageInfoType) -> Self {
        SchoolLeaverPageType { elements, pagination }
    }
}

/**
 * Aggregate summary over the record store.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryOutputType {
    pub count: i64,
    pub average: Decimal,
    pub max: Decimal,
    pub min: Decimal,
    pub sum: Decimal,
}

/**
 * Distinct values currently present per filterable column, used to populate
 * UI filter dropdowns.
 */
#[derive(Debug)]
pub struct FilterOptionsOutputType {
    pub statistic_codes: Vec<String>,
    pub quarters: Vec<String>,
    pub sexes: Vec<String>,
    pub units: Vec<String>,
}

/**
 * A user row as stored, password included in clear text.
 */
#[derive(Debug, Clone)]
pub struct UserDetailType {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/**
 * Validated login input.
 */
#[derive(Debug, Clone)]
pub struct LoginInputType {
    pub username: String,
    pub password: String,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pagination_clamps_oversized_page_size() {
        let pagination = PaginationInput::clamped(Some(0), Some(500));
        assert_eq!(pagination.size, 100);
    }

    #[test]
    fn test_pagination_clamps_negative_page() {
        let pagination = PaginationInput::clamped(Some(-3), Some(0));
        assert_eq!(pagination.page, 0);
        assert_eq!(pagination.size, 1);
    }

    #[test]
    fn test_pagination_defaults() {
        let pagination = PaginationInput::clamped(None, None);
        assert_eq!(pagination.page, 0);
        assert_eq!(pagination.size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_page_info_middle_page() {
        let pagination = PaginationInput { page: 1, size: 10 };
        let info = PageInfoType::new(&pagination, 25);
        assert_eq!(info.total_pages, 3);
        assert!(info.has_next);
        assert!(info.has_previous);
    }

    #[test]
    fn test_page_info_empty_store() {
        let pagination = PaginationInput { page: 0, size: 10 };
        let info = PageInfoType::new(&pagination, 0);
        assert_eq!(info.total_pages, 0);
        assert!(!info.has_next);
        assert!(!info.has_previous);
    }

    #[test]
    fn test_page_info_rounds_partial_page_up() {
        let pagination = PaginationInput { page: 0, size: 3 };
        let info = PageInfoType::new(&pagination, 7);
        assert_eq!(info.total_pages, 3);
        assert!(info.has_next);
    }

    #[test]
    fn test_page_info_exact_boundary() {
        let pagination = PaginationInput { page: 1, size: 10 };
        let info = PageInfoType::new(&pagination, 20);
        assert_eq!(info.total_pages, 2);
        assert!(!info.has_next);
    }

    #[test]
    fn test_sort_field_unknown_name() {
        assert!(SortField::from_name("password").is_none());
        assert!(SortField::from_name("value; DROP TABLE school_leavers").is_none());
    }

    #[test]
    fn test_order_clause_default() {
        let sort = SortInput::default();
        assert_eq!(sort.order_clause(), "quarter DESC, statistic_code ASC");
    }

    #[test]
    fn test_order_clause_explicit() {
        let sort = SortInput { sort_by: SortField::from_name("statisticCode"), direction: SortDirection::Asc };
        assert_eq!(sort.order_clause(), "statistic_code ASC");
    }
}
