use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use crate::error::RepoError;
use crate::{Dao, Document, FieldFilter, QueryParams, SortOrder, is_sortable};

const UNIQUE_CONSTRAINT: &str = "documents_local_username_key";

#[derive(Debug)]
pub struct MemoryDao<T> {
    documents: RwLock<BTreeMap<Uuid, (u64, T)>>,
    sequence: std::sync::atomic::AtomicU64,
}

impl<T> Default for MemoryDao<T> {
    fn default() -> Self {
        Self {
            documents: RwLock::new(BTreeMap::new()),
            sequence: std::sync::atomic::AtomicU64::new(0),
        }
    }
}

fn matches(document: &Value, filter: Option<&FieldFilter>) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    let pointer = format!("/{}", filter.path().join("/"));
    document.pointer(&pointer) == Some(&filter.value)
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => {
            let (a, b) = (a.as_f64().unwrap_or_default(), b.as_f64().unwrap_or_default());
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn check_unique<T: Document>(
    documents: &BTreeMap<Uuid, (u64, T)>,
    document: &T,
) -> Result<(), RepoError> {
    let Some(key) = document.unique_key() else {
        return Ok(());
    };
    let taken = documents
        .values()
        .any(|(_, other)| other.id() != document.id() && other.unique_key().as_ref() == Some(&key));
    if taken {
        warn!("Duplicate key {key} in {}", T::COLLECTION);
        return Err(RepoError::UniqueViolation(
            T::COLLECTION.to_string(),
            UNIQUE_CONSTRAINT.to_string(),
        ));
    }
    Ok(())
}

impl<T: Document> MemoryDao<T> {
    fn next_sequence(&self) -> u64 {
        self.sequence
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
    }
}

#[async_trait]
impl<T: Document> Dao<T> for MemoryDao<T> {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<T>, RepoError> {
        let documents = self.documents.read().await;
        Ok(documents.get(&id).map(|(_, document)| document.clone()))
    }

    async fn save(&self, document: &T) -> Result<T, RepoError> {
        let mut documents = self.documents.write().await;
        check_unique(&*documents, document)?;
        let sequence = match documents.get(&document.id()) {
            Some((sequence, _)) => *sequence,
            None => self.next_sequence(),
        };
        documents.insert(document.id(), (sequence, document.clone()));
        Ok(document.clone())
    }

    async fn update(&self, document: &T) -> Result<Option<T>, RepoError> {
        let mut documents = self.documents.write().await;
        if !documents.contains_key(&document.id()) {
            return Ok(None);
        }
        check_unique(&*documents, document)?;
        Ok(documents.get_mut(&document.id()).map(|(_, stored)| {
            *stored = document.clone();
            document.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepoError> {
        Ok(self.documents.write().await.remove(&id).is_some())
    }

    async fn find_all(&self, params: &QueryParams) -> Result<Vec<T>, RepoError> {
        let documents = self.documents.read().await;

        let mut selected = Vec::new();
        for (sequence, document) in documents.values() {
            let value = serde_json::to_value(document)?;
            if matches(&value, params.filter.as_ref()) {
                selected.push((*sequence, value, document));
            }
        }
        // Insertion order when no sort is requested.
        selected.sort_by_key(|(sequence, _, _)| *sequence);

        let sorting: Vec<_> = params
            .sorting
            .iter()
            .filter(|(field, _)| {
                let sortable = is_sortable::<T>(field);
                if !sortable {
                    warn!("Ignoring sort on unknown field {field} of {}", T::COLLECTION);
                }
                sortable
            })
            .collect();

        selected.sort_by(|(_, a, _), (_, b, _)| {
            sorting
                .iter()
                .map(|(field, order)| {
                    let ordering = compare(
                        a.get(field.as_str()).unwrap_or(&Value::Null),
                        b.get(field.as_str()).unwrap_or(&Value::Null),
                    );
                    match order {
                        SortOrder::Ascending => ordering,
                        SortOrder::Descending => ordering.reverse(),
                    }
                })
                .find(|ordering| *ordering != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });

        Ok(selected
            .into_iter()
            .skip(params.skip.unwrap_or(0))
            .take(params.limit.unwrap_or(usize::MAX))
            .map(|(_, _, document)| document.clone())
            .collect())
    }

    async fn count(&self, filter: Option<&FieldFilter>) -> Result<u64, RepoError> {
        let documents = self.documents.read().await;
        let mut total = 0;
        for (_, document) in documents.values() {
            if matches(&serde_json::to_value(document)?, filter) {
                total += 1;
            }
        }
        Ok(total)
    }
}
