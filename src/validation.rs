use std::path::Path;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;

/// Validation utilities for CLI and configuration input
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate a calendar-day range given on the command line
    pub fn validate_date_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<()> {
        match (start, end) {
            (Some(start_date), Some(end_date)) => {
                if start_date > end_date {
                    return Err(anyhow!("Start date cannot be after end date"));
                }

                // Warn about very large date ranges; leads are few, so this is informational only
                let days = (end_date - start_date).num_days();
                if days > 365 * 5 {
                    tracing::warn!(days, "Large date range requested");
                }
                Ok(())
            },
            (None, None) => Ok(()),
            _ => Err(anyhow!("Date range needs both --from and --to")),
        }
    }

    /// Parse a `YYYY-MM-DD` day
    pub fn parse_day(value: &str) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
            .map_err(|e| anyhow!("Invalid date {value:?} (expected YYYY-MM-DD): {e}"))
    }

    /// Validate a search term
    pub fn validate_search_term(term: &str) -> Result<()> {
        if term.chars().count() > 200 {
            return Err(anyhow!("Search term too long (max 200 characters)"));
        }

        if term.contains('\0') || term.contains('\r') || term.contains('\n') {
            return Err(anyhow!("Search term contains invalid characters"));
        }

        Ok(())
    }

    /// Validate backend URL
    pub fn validate_backend_url(url: &str) -> Result<()> {
        if url.trim().is_empty() {
            return Err(anyhow!("Backend URL cannot be empty"));
        }

        if !url.starts_with("https://") && !url.starts_with("http://") {
            return Err(anyhow!("Backend URL must start with http:// or https://"));
        }

        if url.len() > 1000 {
            return Err(anyhow!("Backend URL too long"));
        }

        Ok(())
    }

    /// Validate the backend table name
    pub fn validate_table_name(table: &str) -> Result<()> {
        if table.trim().is_empty() {
            return Err(anyhow!("Table name cannot be empty"));
        }

        if table.len() > 63 {
            return Err(anyhow!("Table name too long (max 63 characters)"));
        }

        // Table names go straight into the REST path
        if !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(anyhow!("Table name contains invalid characters"));
        }

        Ok(())
    }

    /// Validate finder result limit
    pub fn validate_finder_limit(limit: usize) -> Result<()> {
        if limit == 0 {
            return Err(anyhow!("Finder limit must be greater than 0"));
        }

        if limit > 1000 {
            return Err(anyhow!("Finder limit too large (max 1,000)"));
        }

        Ok(())
    }

    /// Validate export path
    pub fn validate_file_path(path: &Path) -> Result<()> {
        let path_str = path.to_string_lossy();
        if path_str.is_empty() {
            return Err(anyhow!("File path cannot be empty"));
        }

        // Check for path traversal attempts
        if path_str.contains("..") || path_str.contains('~') {
            return Err(anyhow!("File path contains potentially dangerous characters"));
        }

        if path_str.len() > 4096 {
            return Err(anyhow!("File path too long (max 4096 characters)"));
        }

        Ok(())
    }

    /// Sanitize text input
    #[must_use]
    pub fn sanitize_text(text: &str) -> String {
        text.chars()
            .filter(|c| !c.is_control() || *c == '\t')
            .collect::<String>()
            .trim()
            .to_string()
    }
}
