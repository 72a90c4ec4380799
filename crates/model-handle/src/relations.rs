//! Relation definitions and eager-load attachment
//!
//! Each requested relation costs one extra query: related rows are fetched
//! with a single `IN` over the parents' keys and grouped back onto the
//! parents under the relation name.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{ModelError, ModelResult};
use crate::executor::QueryExecutor;
use crate::model::ModelDefinition;
use crate::query::QueryBuilder;
use crate::record::{key_string, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    HasOne,
    HasMany,
    BelongsTo,
}

/// A named link from a model to rows of another table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub name: String,
    pub kind: RelationKind,
    pub related_table: String,
    /// Column holding the reference (on the related table for has-one/many,
    /// on the parent for belongs-to)
    pub foreign_key: String,
    /// Column being referenced (on the parent for has-one/many, on the
    /// related table for belongs-to)
    pub local_key: String,
}

impl Relation {
    pub fn has_one(name: &str, related_table: &str, foreign_key: &str, local_key: &str) -> Self {
        Self::build(name, RelationKind::HasOne, related_table, foreign_key, local_key)
    }

    pub fn has_many(name: &str, related_table: &str, foreign_key: &str, local_key: &str) -> Self {
        Self::build(name, RelationKind::HasMany, related_table, foreign_key, local_key)
    }

    pub fn belongs_to(name: &str, related_table: &str, foreign_key: &str, owner_key: &str) -> Self {
        Self::build(name, RelationKind::BelongsTo, related_table, foreign_key, owner_key)
    }

    fn build(name: &str, kind: RelationKind, related_table: &str, foreign_key: &str, local_key: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            related_table: related_table.to_string(),
            foreign_key: foreign_key.to_string(),
            local_key: local_key.to_string(),
        }
    }

    /// Column read from each parent record
    pub fn parent_key(&self) -> &str {
        match self.kind {
            RelationKind::BelongsTo => &self.foreign_key,
            RelationKind::HasOne | RelationKind::HasMany => &self.local_key,
        }
    }

    /// Column matched on the related table
    pub fn related_key(&self) -> &str {
        match self.kind {
            RelationKind::BelongsTo => &self.local_key,
            RelationKind::HasOne | RelationKind::HasMany => &self.foreign_key,
        }
    }
}

/// Load every relation in `names` and attach it to `records`
pub async fn attach_relations(
    executor: &dyn QueryExecutor,
    definition: &ModelDefinition,
    records: &mut [Record],
    names: &[String],
) -> ModelResult<()> {
    for name in names {
        let relation = definition.find_relation(name).ok_or_else(|| {
            ModelError::Relationship(format!(
                "Model '{}' has no relation named '{}'",
                definition.name(),
                name
            ))
        })?;
        attach_relation(executor, relation, records).await?;
    }
    Ok(())
}

async fn attach_relation(
    executor: &dyn QueryExecutor,
    relation: &Relation,
    records: &mut [Record],
) -> ModelResult<()> {
    let mut keys: Vec<Value> = Vec::new();
    for record in records.iter() {
        if let Some(key) = record.get(relation.parent_key()).filter(|k| !k.is_null()) {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
    }

    let mut grouped: HashMap<String, Vec<Value>> = HashMap::new();
    if !keys.is_empty() {
        tracing::debug!(
            "Eager loading '{}' from {} for {} key(s)",
            relation.name,
            relation.related_table,
            keys.len()
        );
        let query = QueryBuilder::table(&relation.related_table)
            .where_in(relation.related_key(), keys)
            .order_by(relation.related_key());
        for related in executor.fetch_all(&query).await? {
            let key = related
                .get(relation.related_key())
                .map(key_string)
                .unwrap_or_default();
            grouped.entry(key).or_default().push(related.into());
        }
    }

    for record in records.iter_mut() {
        let matches = record
            .get(relation.parent_key())
            .filter(|k| !k.is_null())
            .and_then(|k| grouped.get(&key_string(k)))
            .cloned()
            .unwrap_or_default();

        let attached = match relation.kind {
            RelationKind::HasMany => Value::Array(matches),
            RelationKind::HasOne | RelationKind::BelongsTo => {
                matches.into_iter().next().unwrap_or(Value::Null)
            }
        };
        record.insert(&relation.name, attached);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::MemoryExecutor;
    use serde_json::json;

    fn records(values: Vec<Value>) -> Vec<Record> {
        values
            .into_iter()
            .map(|v| Record::try_from(v).unwrap())
            .collect()
    }

    fn blog() -> (MemoryExecutor, ModelDefinition) {
        let executor = MemoryExecutor::new();
        executor
            .seed(
                "comments",
                vec![
                    json!({"id": 1, "post_id": 1, "body": "first"}),
                    json!({"id": 2, "post_id": 1, "body": "second"}),
                    json!({"id": 3, "post_id": 2, "body": "other"}),
                ],
            )
            .unwrap();
        executor
            .seed("users", vec![json!({"id": 10, "name": "Ada"})])
            .unwrap();

        let definition = ModelDefinition::new("Post", "posts")
            .relation(Relation::has_many("comments", "comments", "post_id", "id"))
            .relation(Relation::has_one("latest", "comments", "post_id", "id"))
            .relation(Relation::belongs_to("author", "users", "user_id", "id"));
        (executor, definition)
    }

    #[tokio::test]
    async fn test_has_many_and_belongs_to() {
        let (executor, definition) = blog();
        let mut posts = records(vec![
            json!({"id": 1, "user_id": 10}),
            json!({"id": 2, "user_id": 99}),
            json!({"id": 3, "user_id": null}),
        ]);

        attach_relations(
            &executor,
            &definition,
            &mut posts,
            &["comments".to_string(), "author".to_string()],
        )
        .await
        .unwrap();

        assert_eq!(posts[0].get("comments").unwrap().as_array().unwrap().len(), 2);
        assert_eq!(posts[1].get("comments").unwrap().as_array().unwrap().len(), 1);
        assert_eq!(posts[2].get("comments"), Some(&json!([])));

        assert_eq!(posts[0].get("author").unwrap()["name"], json!("Ada"));
        assert_eq!(posts[1].get("author"), Some(&Value::Null));
        assert_eq!(posts[2].get("author"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn test_has_one_takes_first() {
        let (executor, definition) = blog();
        let mut posts = records(vec![json!({"id": 1})]);
        attach_relations(&executor, &definition, &mut posts, &["latest".to_string()])
            .await
            .unwrap();
        assert_eq!(posts[0].get("latest").unwrap()["body"], json!("first"));
    }

    #[tokio::test]
    async fn test_unknown_relation() {
        let (executor, definition) = blog();
        let mut posts = records(vec![json!({"id": 1})]);
        let err = attach_relations(&executor, &definition, &mut posts, &["tags".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::Relationship(_)));
    }
}
