//! Conditional chaining for QueryBuilder

use super::builder::QueryBuilder;

impl QueryBuilder {
    /// Apply `callback` only when `condition` holds; otherwise return the
    /// query unchanged
    pub fn when<F>(self, condition: bool, callback: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        if condition {
            callback(self)
        } else {
            self
        }
    }

    /// Apply `callback` with the contained value when `value` is `Some`
    pub fn when_some<T, F>(self, value: Option<T>, callback: F) -> Self
    where
        F: FnOnce(Self, T) -> Self,
    {
        match value {
            Some(value) => callback(self, value),
            None => self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_false_branch_leaves_query_untouched() {
        let base = QueryBuilder::table("users").where_eq("status", "active");
        let query = base.clone().when(false, |q| q.where_eq("role", "admin"));
        assert_eq!(query, base);

        let query = base.clone().when(true, |q| q.where_eq("role", "admin"));
        assert_eq!(query.conditions().len(), 2);
    }

    #[test]
    fn test_when_some() {
        let query = QueryBuilder::table("users")
            .when_some(Some(3), |q, id| q.where_eq("id", id))
            .when_some(None::<i64>, |q, id| q.where_eq("parent_id", id));
        assert_eq!(query.conditions().len(), 1);
    }
}
