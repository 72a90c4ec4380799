//! Query Builder pagination operations

use super::builder::QueryBuilder;

/// Largest LIMIT/OFFSET PostgreSQL accepts (BIGINT)
pub const MAX_WINDOW: u64 = i64::MAX as u64;

impl QueryBuilder {
    /// Add LIMIT clause; zero means no limit
    pub fn limit(mut self, count: u64) -> Self {
        self.limit_count = if count == 0 { None } else { Some(count.min(MAX_WINDOW)) };
        self
    }

    /// Add OFFSET clause
    pub fn offset(mut self, count: u64) -> Self {
        self.offset_value = if count == 0 { None } else { Some(count.min(MAX_WINDOW)) };
        self
    }

    /// Add pagination (LIMIT + OFFSET); pages start at 1
    pub fn paginate(self, per_page: u64, page: u64) -> Self {
        let offset = page.saturating_sub(1).saturating_mul(per_page);
        self.limit(per_page).offset(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paginate() {
        let query = QueryBuilder::table("users").paginate(15, 3);
        assert_eq!(query.limit_count(), Some(15));
        assert_eq!(query.offset_value(), Some(30));

        let query = QueryBuilder::table("users").paginate(15, 0);
        assert_eq!(query.offset_value(), None);
    }

    #[test]
    fn test_paginate_huge_page_saturates() {
        let query = QueryBuilder::table("users").paginate(10, u64::MAX);
        assert_eq!(query.limit_count(), Some(10));
        assert_eq!(query.offset_value(), Some(MAX_WINDOW));

        let (sql, _) = query.to_sql_with_params().unwrap();
        assert!(sql.ends_with(&format!("LIMIT 10 OFFSET {}", i64::MAX)));
    }

    #[test]
    fn test_zero_limit_is_unlimited() {
        assert_eq!(QueryBuilder::table("users").limit(0).limit_count(), None);
    }
}
