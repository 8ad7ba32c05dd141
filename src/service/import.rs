use std::fs;
use std::str::FromStr;

use rust_decimal::Decimal;
use tracing::instrument;

use crate::{
    model::apperror::{ApplicationError, ErrorType},
    service::{school_leavers::SchoolLeaverService, validation::SchoolLeaverFormType},
};

/**
 * Imports school leaver records from a comma-delimited file. Lines carry six
 * positional fields in record order: code, label, quarter, sex, unit, value.
 * Malformed or invalid lines are logged and skipped; the import never aborts
 * on a bad line.
 *
 * # Arguments
 * `service`: The school leaver service used to validate and store each row.
 * `path`: Path to the CSV file.
 * `has_header`: Whether the first line is a header row to skip.
 *
 * # Returns
 * The number of records imported.
 */
#[instrument(skip(service), fields(result))]
pub async fn import_from_csv(service: &SchoolLeaverService, path: &str, has_header: bool) -> Result<u64, ApplicationError> {
    let contents = fs::read_to_string(path).map_err(|err| ApplicationError::new(ErrorType::Application, format!("Failed to read CSV file {path}: {err}")))?;
    let mut imported: u64 = 0;
    for (index, line) in contents.lines().enumerate() {
        if has_header && index == 0 {
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }
        let Some(form) = parse_line(line) else {
            tracing::warn!("Skipping malformed CSV line {}: {}", index + 1, line);
            continue;
        };
        match service.create_school_leaver(&form).await {
            Ok(_) => imported += 1,
            Err(err) if err.error_type == ErrorType::Validation => {
                tracing::warn!("Skipping invalid CSV line {}: {}", index + 1, err);
            }
            Err(err) => return Err(err),
        }
    }
    tracing::info!("Successfully imported {} records from CSV file: {}", imported, path);
    Ok(imported)
}

/**
 * Parses one CSV line into a raw form. Returns `None` when the line has
 * fewer than six fields or a non-numeric value.
 */
fn parse_line(line: &str) -> Option<SchoolLeaverFormType> {
    let fields = parse_fields(line);
    if fields.len() < 6 {
        return None;
    }
    let value = Decimal::from_str(fields[5].trim()).ok()?;
    Some(SchoolLeaverFormType {
        statistic_code: Some(fields[0].trim().to_string()),
        statistic_label: Some(fields[1].trim().to_string()),
        quarter: Some(fields[2].trim().to_string()),
        sex: Some(fields[3].trim().to_string()),
        unit: Some(fields[4].trim().to_string()),
        value: Some(value),
    })
}

/**
 * Splits a CSV line on commas, honoring double-quoted fields. Quotes toggle
 * quoting and are not part of the field value.
 */
fn parse_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for character in line.chars() {
        match character {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(character),
        }
    }
    fields.push(current);
    fields
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_fields_plain() {
        let fields = parse_fields("SL001,Total School Leavers,Q12023,Male,Count,650.50");
        assert_eq!(fields.len(), 6);
        assert_eq!(fields[0], "SL001");
        assert_eq!(fields[5], "650.50");
    }

    #[test]
    fn test_parse_fields_quoted_comma() {
        let fields = parse_fields("SL002,\"Leavers, employed\",Q12023,Female,Percent,65.75");
        assert_eq!(fields.len(), 6);
        assert_eq!(fields[1], "Leavers, employed");
    }

    #[test]
    fn test_parse_line_insufficient_fields() {
        assert!(parse_line("SL001,label,Q12023").is_none());
    }

    #[test]
    fn test_parse_line_bad_value() {
        assert!(parse_line("SL001,label,Q12023,Male,Count,abc").is_none());
    }

    #[test]
    fn test_parse_line_trims_fields() {
        let form = parse_line(" SL001 , Total School Leavers , Q12023 , Male , Count , 650.50 ").unwrap();
        assert_eq!(form.statistic_code.unwrap(), "SL001");
        assert_eq!(form.value.unwrap(), Decimal::new(65050, 2));
    }
}
