//! Model handle - generic CRUD helper over a model reference
//!
//! Every read goes through [`ModelHandle::build_query`]: the model's scope,
//! then the field selection, the condition set, the eager-load relations and
//! finally the ordering, which falls back to primary key descending. Each
//! terminal operation builds a fresh query and hands it to the executor
//! exactly once.
//!
//! Argument order is `condition, fields, order` for every operation.

use std::sync::Arc;

use serde_json::Value;

use crate::conditions::{Conditions, Fields, Ordering};
use crate::error::{ModelError, ModelResult};
use crate::executor::QueryExecutor;
use crate::model::{Model, ModelRef};
use crate::pagination::{PageRequest, Paginator};
use crate::params::ParamSource;
use crate::query::QueryBuilder;
use crate::record::{key_string, ColumnValues, Record};
use crate::registry::ModelRegistry;
use crate::relations::attach_relations;

/// Step used by [`ModelHandle::increase_by_one`]
pub const DEFAULT_STEP: i64 = 1;

#[derive(Debug, Clone)]
pub struct ModelHandle {
    model: ModelRef,
    with: Vec<String>,
}

impl ModelHandle {
    /// Instantiate the model registered under `name`
    pub fn from_type_name(
        registry: &ModelRegistry,
        name: &str,
        executor: Arc<dyn QueryExecutor>,
    ) -> ModelResult<Self> {
        Ok(Self::from_instance(registry.instantiate(name, executor)?))
    }

    /// Adopt an existing model reference
    pub fn from_instance(model: ModelRef) -> Self {
        Self {
            model,
            with: Vec::new(),
        }
    }

    /// Same as [`ModelHandle::from_instance`], for chaining
    pub fn instance(model: ModelRef) -> Self {
        Self::from_instance(model)
    }

    /// Handle for a typed model
    pub fn of<M: Model>(executor: Arc<dyn QueryExecutor>) -> Self {
        Self::from_instance(ModelRef::of::<M>(executor))
    }

    pub fn model(&self) -> &ModelRef {
        &self.model
    }

    /// Swap the model reference. Filters accumulated by `when` go with the
    /// old reference.
    pub fn set_model(&mut self, model: ModelRef) {
        self.model = model;
    }

    /// Relations eager loaded by `list`, `page_list`, `info` and
    /// `by_primary_key`. `column`, `value` and `value_by_primary_key` return
    /// bare columns and never load them. When a narrowed field selection is
    /// used, each relation's parent key column is selected as well and shows
    /// up in the returned records.
    pub fn with(&self) -> &[String] {
        &self.with
    }

    pub fn set_with<I, S>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with = relations.into_iter().map(Into::into).collect();
        self
    }

    /// Compose the query shared by the read operations
    pub fn build_query<F>(&self, condition: &Conditions, fields: F, order: &Ordering) -> QueryBuilder
    where
        F: Into<Fields>,
    {
        self.compose(condition, fields.into(), order, &self.with)
    }

    /// `build_query` with an explicit relation list. The parent key of each
    /// known relation is added to a narrowed selection so related rows can
    /// be matched.
    fn compose(
        &self,
        condition: &Conditions,
        fields: Fields,
        order: &Ordering,
        relations: &[String],
    ) -> QueryBuilder {
        let definition = self.model.definition();
        let fields = relations
            .iter()
            .filter_map(|name| definition.find_relation(name))
            .fold(fields, |fields, relation| fields.including(relation.parent_key()));

        let mut query = self.model.query().select_fields(&fields);
        if !condition.is_empty() {
            query = query.where_all(condition);
        }

        let default_order;
        let order = if order.is_empty() {
            default_order = Ordering::desc(self.model.primary_key_name());
            &default_order
        } else {
            order
        };

        if !relations.is_empty() {
            query = query.with(relations);
        }
        query.order(order)
    }

    /// Matching records; `limit` 0 means no limit
    pub async fn list<F>(
        &self,
        condition: &Conditions,
        fields: F,
        order: &Ordering,
        limit: u64,
    ) -> ModelResult<Vec<Record>>
    where
        F: Into<Fields>,
    {
        let query = self.build_query(condition, fields, order).limit(limit);
        tracing::debug!(
            "list on {} ({} condition(s), limit {})",
            self.model.table_name(),
            query.conditions().len(),
            limit
        );
        self.fetch_all(&query).await
    }

    /// Values of `column` for every matching record.
    ///
    /// With an empty `key` the result is a list in query order; otherwise
    /// it is indexed by the `key` column. A single column yields scalars,
    /// `*` or several columns yield records.
    pub async fn column(
        &self,
        condition: &Conditions,
        column: &str,
        key: &str,
        order: &Ordering,
    ) -> ModelResult<ColumnValues> {
        let fields = Fields::parse(column);
        let selection = if key.is_empty() {
            fields.clone()
        } else {
            fields.clone().including(key)
        };

        let query = self.compose(condition, selection, order, &[]);
        tracing::debug!("column '{}' on {}", column, self.model.table_name());
        let records = self.model.executor().fetch_all(&query).await?;

        let single = match &fields {
            Fields::Columns(columns) if columns.len() == 1 => Some(columns[0].as_str()),
            _ => None,
        };
        let extract = |record: &Record| -> Value {
            match single {
                Some(name) => record.get(name).cloned().unwrap_or(Value::Null),
                None => record.project(&fields).into(),
            }
        };

        if key.is_empty() {
            return Ok(ColumnValues::List(records.iter().map(extract).collect()));
        }
        Ok(ColumnValues::keyed(records.iter().map(|record| {
            let index = record.get(key).map(key_string).unwrap_or_default();
            (index, extract(record))
        })))
    }

    /// One page of matching records with the total count
    pub async fn page_list<F>(
        &self,
        condition: &Conditions,
        fields: F,
        order: &Ordering,
        page: PageRequest,
    ) -> ModelResult<Paginator<Record>>
    where
        F: Into<Fields>,
    {
        let query = self.build_query(condition, fields, order);
        let total = self.model.executor().count(&query.filter_only()).await?;
        tracing::debug!(
            "page_list on {} (page {}, per_page {}, total {})",
            self.model.table_name(),
            page.page(),
            page.per_page(),
            total
        );

        let items = self
            .fetch_all(&query.paginate(page.per_page(), page.page()))
            .await?;
        Ok(Paginator::new(items, total, page))
    }

    /// First matching record
    pub async fn info<F>(
        &self,
        condition: &Conditions,
        fields: F,
        order: &Ordering,
    ) -> ModelResult<Option<Record>>
    where
        F: Into<Fields>,
    {
        let query = self.build_query(condition, fields, order);
        self.fetch_one(&query).await
    }

    /// Record whose primary key equals `pk`
    pub async fn by_primary_key<P, F>(&self, pk: P, fields: F) -> ModelResult<Option<Record>>
    where
        P: Into<Value>,
        F: Into<Fields>,
    {
        let condition = self.primary_key_condition(pk);
        self.info(&condition, fields, &Ordering::none()).await
    }

    /// Value of `field` on the record whose primary key equals `pk`
    pub async fn value_by_primary_key<P>(&self, pk: P, field: &str) -> ModelResult<Option<Value>>
    where
        P: Into<Value>,
    {
        let condition = self.primary_key_condition(pk);
        self.value(&condition, field).await
    }

    /// Value of `field` on the first matching record.
    ///
    /// `None` means no record matched; a matching record whose column is
    /// NULL gives `Some(Value::Null)`.
    pub async fn value(&self, condition: &Conditions, field: &str) -> ModelResult<Option<Value>> {
        let query = self.compose(condition, Fields::from(field), &Ordering::none(), &[]);
        let record = self.model.executor().fetch_optional(&query).await?;
        Ok(record.map(|r| r.get(field).cloned().unwrap_or(Value::Null)))
    }

    /// Number of matching records
    pub async fn count(&self, condition: &Conditions) -> ModelResult<u64> {
        let query = self.filter_query(condition);
        self.model.executor().count(&query).await
    }

    /// Delete matching records; true when at least one was removed
    pub async fn delete(&self, condition: &Conditions) -> ModelResult<bool> {
        let query = self.filter_query(condition);
        self.require_condition(&query, "delete")?;

        let removed = self.model.executor().delete(&query).await?;
        tracing::debug!("Deleted {} row(s) from {}", removed, self.model.table_name());
        Ok(removed > 0)
    }

    /// Whether any record matches
    pub async fn check_unique(&self, condition: &Conditions) -> ModelResult<bool> {
        Ok(self.count(condition).await? > 0)
    }

    /// Add `step` to `column` on matching records; true when at least one
    /// record was affected
    pub async fn increase(&self, column: &str, condition: &Conditions, step: i64) -> ModelResult<bool> {
        let query = self.filter_query(condition);
        self.require_condition(&query, "increase")?;

        let affected = self.model.executor().increment(&query, column, step).await?;
        tracing::debug!(
            "Increased {} by {} on {} row(s) of {}",
            column,
            step,
            affected,
            self.model.table_name()
        );
        Ok(affected > 0)
    }

    pub async fn increase_by_one(&self, column: &str, condition: &Conditions) -> ModelResult<bool> {
        self.increase(column, condition, DEFAULT_STEP).await
    }

    /// Filter on `field = value` when the request carries `field` and its
    /// value is not listed in `except`
    pub fn when(self, field: &str, params: &dyn ParamSource, except: &[Value]) -> Self {
        self.when_with(field, params, except, |query, value| query.where_eq(field, value))
    }

    /// Like [`ModelHandle::when`], but `callback` builds the filter. It runs
    /// once, only when the parameter applies, and its result becomes the
    /// new scope.
    pub fn when_with<F>(mut self, field: &str, params: &dyn ParamSource, except: &[Value], callback: F) -> Self
    where
        F: FnOnce(QueryBuilder, Value) -> QueryBuilder,
    {
        let value = params
            .param(field)
            .filter(|value| !except.iter().any(|excluded| loosely_equal(excluded, value)));

        if value.is_some() {
            tracing::debug!("Applying request filter on '{}'", field);
        }
        self.model = self.model.scoped(|scope| scope.when_some(value, callback));
        self
    }

    fn primary_key_condition<P: Into<Value>>(&self, pk: P) -> Conditions {
        Conditions::new().eq(self.model.primary_key_name(), pk)
    }

    /// Scope plus `condition`, without selection, ordering or relations
    fn filter_query(&self, condition: &Conditions) -> QueryBuilder {
        self.model.query().filter_only().where_all(condition)
    }

    fn require_condition(&self, query: &QueryBuilder, operation: &'static str) -> ModelResult<()> {
        if query.has_conditions() {
            return Ok(());
        }
        tracing::warn!(
            "Refusing to {} on {} without a condition",
            operation,
            self.model.table_name()
        );
        Err(ModelError::MissingCondition {
            operation,
            table: self.model.table_name().to_string(),
        })
    }

    async fn fetch_all(&self, query: &QueryBuilder) -> ModelResult<Vec<Record>> {
        let mut records = self.model.executor().fetch_all(query).await?;
        self.load_relations(query, &mut records).await?;
        Ok(records)
    }

    async fn fetch_one(&self, query: &QueryBuilder) -> ModelResult<Option<Record>> {
        match self.model.executor().fetch_optional(query).await? {
            Some(record) => {
                let mut records = [record];
                self.load_relations(query, &mut records).await?;
                let [record] = records;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn load_relations(&self, query: &QueryBuilder, records: &mut [Record]) -> ModelResult<()> {
        if query.relations().is_empty() || records.is_empty() {
            return Ok(());
        }
        attach_relations(
            self.model.executor().as_ref(),
            self.model.definition(),
            records,
            query.relations(),
        )
        .await
    }
}

/// Equality as request values see it: `"1"` equals `1`, `"true"` equals `true`
fn loosely_equal(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => false,
        _ => key_string(a) == key_string(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::MemoryExecutor;
    use crate::model::ModelDefinition;
    use crate::params::RequestParams;
    use crate::query::{OrderDirection, QueryOperator};
    use serde_json::json;

    fn handle() -> ModelHandle {
        let definition = ModelDefinition::new("Post", "posts").primary_key("post_id");
        ModelHandle::from_instance(ModelRef::new(definition, Arc::new(MemoryExecutor::new())))
    }

    #[test]
    fn test_build_query_defaults() {
        let query = handle().build_query(
            &Conditions::from([("status", "active")]),
            "*",
            &Ordering::none(),
        );

        assert_eq!(query.table_name(), "posts");
        assert!(query.selects_all());
        assert_eq!(query.conditions().len(), 1);
        assert_eq!(query.conditions()[0].column, "status");
        assert_eq!(query.conditions()[0].value, Some(json!("active")));
        assert_eq!(query.ordering(), [("post_id".to_string(), OrderDirection::Desc)]);
        assert!(query.relations().is_empty());
    }

    #[test]
    fn test_build_query_explicit_order_and_relations() {
        let handle = handle().set_with(["author"]);
        let query = handle.build_query(
            &Conditions::new(),
            "title, post_id",
            &Ordering::parse("sort asc").unwrap(),
        );

        assert_eq!(query.selected_fields(), ["title".to_string(), "post_id".to_string()]);
        assert!(!query.has_conditions());
        assert_eq!(query.ordering(), [("sort".to_string(), OrderDirection::Asc)]);
        assert_eq!(query.relations(), ["author".to_string()]);
        // Building does not consume the relation list
        assert_eq!(handle.with(), ["author".to_string()]);
    }

    #[test]
    fn test_narrowed_selection_keeps_relation_parent_key() {
        let definition = ModelDefinition::new("Post", "posts")
            .relation(crate::relations::Relation::belongs_to("author", "users", "author_id", "id"));
        let handle = ModelHandle::from_instance(ModelRef::new(definition, Arc::new(MemoryExecutor::new())))
            .set_with(["author"]);

        let query = handle.build_query(&Conditions::new(), "title", &Ordering::none());
        assert_eq!(query.selected_fields(), ["title".to_string(), "author_id".to_string()]);

        let query = handle.build_query(&Conditions::new(), "*", &Ordering::none());
        assert!(query.selects_all());
    }

    #[test]
    fn test_when_absent_param_leaves_scope_untouched() {
        let before = handle();
        let after = before
            .clone()
            .when("category", &RequestParams::new(), &[]);
        assert_eq!(after.model().scope(), before.model().scope());
    }

    #[test]
    fn test_when_except_skips_filter() {
        let params = RequestParams::from_query("category=all");
        let handle = handle()
            .when("category", &params, &[json!("all")])
            .when("category", &params, &[json!("all")]);
        assert!(!handle.model().has_scope());
    }

    #[test]
    fn test_when_applies_equality_and_accumulates() {
        let params = RequestParams::from_query("category=books&status=1");
        let handle = handle()
            .when("category", &params, &[])
            .when("status", &params, &[json!(0)]);

        let scope = handle.model().scope();
        assert_eq!(scope.conditions().len(), 2);
        assert_eq!(scope.conditions()[0].value, Some(json!("books")));

        // Later queries inherit the scope
        let query = handle.build_query(&Conditions::from([("id", 1)]), "*", &Ordering::none());
        assert_eq!(query.conditions().len(), 3);
    }

    #[test]
    fn test_when_with_callback_runs_once_with_value() {
        let params = RequestParams::from_query("min_age=18");
        let mut calls = 0;
        let handle = handle().when_with("min_age", &params, &[], |query, value| {
            calls += 1;
            query.where_op("age", QueryOperator::GreaterThanOrEqual, value)
        });
        assert_eq!(calls, 1);
        assert_eq!(handle.model().scope().conditions()[0].operator, QueryOperator::GreaterThanOrEqual);

        let mut calls = 0;
        let _ = handle.when_with("missing", &params, &[], |query, _| {
            calls += 1;
            query
        });
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_set_model_discards_scope() {
        let params = RequestParams::from_query("category=books");
        let mut handle = handle().when("category", &params, &[]);
        assert!(handle.model().has_scope());

        handle.set_model(ModelRef::new(
            ModelDefinition::new("Post", "posts"),
            Arc::new(MemoryExecutor::new()),
        ));
        assert!(!handle.model().has_scope());
    }

    #[test]
    fn test_loosely_equal() {
        assert!(loosely_equal(&json!("1"), &json!(1)));
        assert!(loosely_equal(&json!("all"), &json!("all")));
        assert!(loosely_equal(&json!(true), &json!("true")));
        assert!(!loosely_equal(&json!(null), &json!("null")));
        assert!(!loosely_equal(&json!("1"), &json!(2)));
    }

    #[test]
    fn test_from_type_name() {
        let mut registry = ModelRegistry::new();
        registry.register(ModelDefinition::new("Post", "posts"));
        let executor: Arc<dyn QueryExecutor> = Arc::new(MemoryExecutor::new());

        let handle = ModelHandle::from_type_name(&registry, "Post", executor.clone()).unwrap();
        assert_eq!(handle.model().table_name(), "posts");

        let err = ModelHandle::from_type_name(&registry, "Nope", executor).unwrap_err();
        assert!(matches!(err, ModelError::UnknownModel(_)));
    }
}
