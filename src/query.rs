//! Filter compilation. Request filters are flat `field=value` clauses; dotted
//! fields (`author.name`) reach one hop across a reference and collapse into
//! an id membership condition before the main query runs.

use crate::error::AppError;
use crate::schema::{CollectionSchema, FieldDescriptor, FieldKind};
use crate::store::{doc_id, resolve_collection, CollectionResolver, Document, FindOptions};
use futures_util::future::try_join_all;
use serde_json::Value;

/// One filter clause as it arrives on the request.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterClause {
    pub field: String,
    pub value: String,
}

impl FilterClause {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        FilterClause {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// A compiled condition a backend can evaluate.
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    Eq { field: String, value: Value },
    In { field: String, values: Vec<Value> },
}

/// Conjunction of conditions; empty means match-all.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    conditions: Vec<Condition>,
}

impl Query {
    pub fn new(conditions: Vec<Condition>) -> Self {
        Query { conditions }
    }

    pub fn match_all() -> Self {
        Query::default()
    }

    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Query::new(vec![Condition::Eq {
            field: field.into(),
            value,
        }])
    }

    pub fn in_values(field: impl Into<String>, values: Vec<Value>) -> Self {
        Query::new(vec![Condition::In {
            field: field.into(),
            values,
        }])
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions.iter().all(|c| c.matches(doc))
    }
}

impl Condition {
    fn matches(&self, doc: &Document) -> bool {
        match self {
            Condition::Eq { field, value } => match doc.get(field) {
                Some(actual) => values_equal(actual, value),
                None => value.is_null(),
            },
            Condition::In { field, values } => doc
                .get(field)
                .map_or(false, |actual| values.iter().any(|v| values_equal(actual, v))),
        }
    }
}

// Numbers compare numerically so an integer document value matches a filter
// parsed as a float.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(p), Some(q)) => p == q,
            _ => x == y,
        },
        _ => a == b,
    }
}

fn coerce_value(descriptor: &FieldDescriptor, raw: &str) -> Result<Value, AppError> {
    match descriptor.kind {
        FieldKind::Number => raw
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "filter value for numeric field {} is not a number: {raw}",
                    descriptor.name
                ))
            }),
        FieldKind::Boolean => match raw {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(AppError::Validation(format!(
                "filter value for boolean field {} must be true or false: {raw}",
                descriptor.name
            ))),
        },
        _ => Ok(Value::String(raw.to_string())),
    }
}

fn plain_conditions(
    schema: &CollectionSchema,
    clauses: &[&FilterClause],
) -> Result<Vec<Condition>, AppError> {
    clauses
        .iter()
        .map(|clause| {
            let descriptor = schema.descriptor(&clause.field).ok_or_else(|| {
                AppError::Validation(format!(
                    "unknown filter field {} on {}",
                    clause.field, schema.collection
                ))
            })?;
            Ok(Condition::Eq {
                field: clause.field.clone(),
                value: coerce_value(descriptor, &clause.value)?,
            })
        })
        .collect()
}

async fn relationship_condition(
    resolver: &dyn CollectionResolver,
    schema: &CollectionSchema,
    prefix: &str,
    sub: &str,
    value: &str,
) -> Result<Condition, AppError> {
    let descriptor = schema.descriptor(prefix).ok_or_else(|| {
        AppError::Schema(format!(
            "no field {prefix} on {} to filter through",
            schema.collection
        ))
    })?;
    let target = descriptor.reference.as_deref().ok_or_else(|| {
        AppError::Schema(format!(
            "field {prefix} on {} is not a reference",
            schema.collection
        ))
    })?;
    let related = resolve_collection(resolver, target)?;
    let sub_clause = FilterClause::new(sub, value);
    let conditions = plain_conditions(related.schema(), &[&sub_clause])?;
    let matched = related
        .find(&Query::new(conditions), &FindOptions::id_only())
        .await?;
    let ids = matched
        .iter()
        .filter_map(doc_id)
        .map(|id| Value::String(id.to_string()))
        .collect();
    Ok(Condition::In {
        field: prefix.to_string(),
        values: ids,
    })
}

/// Compile request clauses into a [`Query`] against `schema`. Relationship
/// clauses resolve their id sets concurrently; the first failure wins.
pub async fn build_search_query(
    resolver: &dyn CollectionResolver,
    schema: &CollectionSchema,
    clauses: &[FilterClause],
) -> Result<Query, AppError> {
    let mut plain: Vec<&FilterClause> = Vec::new();
    let mut related: Vec<(&str, &str, &FilterClause)> = Vec::new();
    for clause in clauses {
        match clause.field.split_once('.') {
            Some((prefix, sub)) => related.push((prefix, sub, clause)),
            None => plain.push(clause),
        }
    }

    let lookups = related.iter().map(|(prefix, sub, clause)| {
        relationship_condition(resolver, schema, prefix, sub, &clause.value)
    });
    let mut conditions = try_join_all(lookups).await?;
    conditions.extend(plain_conditions(schema, &plain)?);
    Ok(Query::new(conditions))
}
