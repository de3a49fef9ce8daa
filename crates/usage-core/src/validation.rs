//! Input validation for catalog and statistics requests
//!
//! Rejects obviously bad inputs before they reach TMDB or the database:
//! - Empty or excessively long search queries
//! - Page numbers outside the range TMDB serves
//! - Non-positive subject ids
//! - Statistics windows that would fan out into too many queries

use crate::{Result, UsageError};

/// Maximum length for search queries
pub const MAX_SEARCH_QUERY_LEN: usize = 500;

/// Highest page TMDB will return for list and search endpoints
pub const MAX_PAGE: u32 = 500;

/// Longest daily series the statistics endpoint will compute
pub const MAX_WINDOW_DAYS: u32 = 365;

/// Largest popularity ranking the statistics endpoint will compute
pub const MAX_TOP_SUBJECTS: usize = 100;

/// Validate a free-text search query
///
/// Requirements:
/// - Not empty after trimming
/// - <= 500 characters
pub fn validate_search_query(query: &str) -> Result<()> {
    if query.trim().is_empty() {
        return Err(UsageError::ValidationError(
            "Search query cannot be empty".to_string(),
        ));
    }

    let len = query.chars().count();
    if len > MAX_SEARCH_QUERY_LEN {
        return Err(UsageError::ValidationError(format!(
            "Search query too long: {} > {} characters",
            len, MAX_SEARCH_QUERY_LEN
        )));
    }

    Ok(())
}

/// Validate a 1-based page number
pub fn validate_page(page: u32) -> Result<()> {
    if page == 0 || page > MAX_PAGE {
        return Err(UsageError::ValidationError(format!(
            "Page must be between 1 and {}, got {}",
            MAX_PAGE, page
        )));
    }
    Ok(())
}

/// Validate a catalog subject id
pub fn validate_subject_id(subject_id: i64) -> Result<()> {
    if subject_id <= 0 {
        return Err(UsageError::ValidationError(format!(
            "Subject id must be positive, got {}",
            subject_id
        )));
    }
    Ok(())
}

/// Validate the length of a daily usage window
pub fn validate_window_days(window_days: u32) -> Result<()> {
    if window_days == 0 || window_days > MAX_WINDOW_DAYS {
        return Err(UsageError::ValidationError(format!(
            "Window must be between 1 and {} days, got {}",
            MAX_WINDOW_DAYS, window_days
        )));
    }
    Ok(())
}

/// Validate the size of a popularity ranking
pub fn validate_top_n(n: usize) -> Result<()> {
    if n == 0 || n > MAX_TOP_SUBJECTS {
        return Err(UsageError::ValidationError(format!(
            "Ranking size must be between 1 and {}, got {}",
            MAX_TOP_SUBJECTS, n
        )));
    }
    Ok(())
}
