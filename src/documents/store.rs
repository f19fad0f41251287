use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

type Collections = BTreeMap<String, BTreeMap<String, Map<String, Value>>>;

/// A record from the document store: an id and plain key/value fields
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Decode the fields into a typed record
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, DocumentError> {
        serde_json::from_value(Value::Object(self.fields.clone())).map_err(|e| {
            DocumentError::Decode {
                id: self.id.clone(),
                reason: e.to_string(),
            }
        })
    }
}

/// Serialize a record into document fields. Records must serialize to a
/// JSON object.
pub fn fields_of<T: Serialize>(record: &T) -> Result<Map<String, Value>, DocumentError> {
    match serde_json::to_value(record) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(DocumentError::Format(format!(
            "expected an object, got {}",
            other
        ))),
        Err(e) => Err(DocumentError::Format(e.to_string())),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("document file is not valid: {0}")]
    Format(String),
    #[error("document '{id}' has unexpected fields: {reason}")]
    Decode { id: String, reason: String },
}

/// Access to the backing document collections
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// One document by id, if present
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, DocumentError>;

    /// Every document in a collection, ordered by id
    async fn list(&self, collection: &str) -> Result<Vec<Document>, DocumentError>;

    /// Create or replace `collection/id`
    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), DocumentError>;

    /// Store a new document under a generated id and return the id
    async fn add(&self, collection: &str, fields: Map<String, Value>)
        -> Result<String, DocumentError>;
}

/// Document store backed by a JSON value of the form
/// `{ "<collection>": { "<id>": { ...fields } } }`. A store loaded from a
/// file writes every change back to that file.
#[derive(Debug, Default)]
pub struct JsonDocumentStore {
    collections: RwLock<Collections>,
    path: Option<PathBuf>,
    next_seq: AtomicU64,
}

impl JsonDocumentStore {
    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        let collections: Collections = serde_json::from_value(value)
            .map_err(|e| DocumentError::Format(e.to_string()))?;
        Ok(Self {
            collections: RwLock::new(collections),
            ..Default::default()
        })
    }

    pub async fn load(path: &Path) -> Result<Self, DocumentError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| DocumentError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let value: Value =
            serde_json::from_str(&content).map_err(|e| DocumentError::Format(e.to_string()))?;

        let mut store = Self::from_value(value)?;
        debug!(
            "Loaded {} document collections from {}",
            store.collections.read().len(),
            path.display()
        );
        store.path = Some(path.to_path_buf());
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // Ids sort by creation time
    fn generate_id(&self) -> String {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        format!("{:013x}{:04x}", Utc::now().timestamp_micros(), seq & 0xffff)
    }

    async fn persist(&self) -> Result<(), DocumentError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let content = serde_json::to_string_pretty(&*self.collections.read())
            .map_err(|e| DocumentError::Format(e.to_string()))?;
        tokio::fs::write(path, content)
            .await
            .map_err(|source| DocumentError::Write {
                path: path.clone(),
                source,
            })?;
        debug!("Saved documents to {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for JsonDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, DocumentError> {
        Ok(self
            .collections
            .read()
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Document::new(id, fields.clone())))
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, DocumentError> {
        Ok(self
            .collections
            .read()
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), DocumentError> {
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
        self.persist().await
    }

    async fn add(
        &self,
        collection: &str,
        fields: Map<String, Value>,
    ) -> Result<String, DocumentError> {
        let id = {
            let mut collections = self.collections.write();
            let docs = collections.entry(collection.to_string()).or_default();
            let mut id = self.generate_id();
            while docs.contains_key(&id) {
                id = self.generate_id();
            }
            docs.insert(id.clone(), fields);
            id
        };
        self.persist().await?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserProfile;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample() -> Value {
        json!({
            "users": {
                "u1": { "full_name": "Dana Driver", "customer_name": "Acme", "email": "dana@acme.test" }
            },
            "group_phone_numbers": {
                "G2": {},
                "G1": {}
            }
        })
    }

    #[tokio::test]
    async fn test_get_and_decode() {
        let store = JsonDocumentStore::from_value(sample()).unwrap();

        let doc = store.get("users", "u1").await.unwrap().unwrap();
        let user: UserProfile = doc.decode().unwrap();

        assert_eq!(user.full_name, "Dana Driver");
        assert_eq!(user.email.as_deref(), Some("dana@acme.test"));
        assert!(store.get("users", "missing").await.unwrap().is_none());
        assert!(store.get("nothing", "u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_id() {
        let store = JsonDocumentStore::from_value(sample()).unwrap();

        let ids: Vec<String> = store
            .list("group_phone_numbers")
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();

        assert_eq!(ids, vec!["G1", "G2"]);
        assert!(store.list("serviceRequests").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("docs.json");
        std::fs::write(&path, sample().to_string()).unwrap();

        let store = JsonDocumentStore::load(&path).await.unwrap();

        assert!(store.get("users", "u1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_bad_files_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("docs.json");
        std::fs::write(&path, r#"{ "users": ["not", "a", "map"] }"#).unwrap();

        assert!(matches!(
            JsonDocumentStore::load(&path).await,
            Err(DocumentError::Format(_))
        ));
        assert!(matches!(
            JsonDocumentStore::load(&dir.path().join("missing.json")).await,
            Err(DocumentError::Read { .. })
        ));
    }

    #[tokio::test]
    async fn test_set_replaces_a_document() {
        let store = JsonDocumentStore::from_value(sample()).unwrap();
        let fields = fields_of(&json!({ "full_name": "Dana D.", "customer_name": "Acme" })).unwrap();

        store.set("users", "u1", fields).await.unwrap();

        let user: UserProfile = store.get("users", "u1").await.unwrap().unwrap().decode().unwrap();
        assert_eq!(user.full_name, "Dana D.");
        assert_eq!(user.email, None);
        assert!(store.path().is_none());
    }

    #[tokio::test]
    async fn test_add_generates_distinct_ids() {
        let store = JsonDocumentStore::default();

        let first = store.add("serviceRequests", Map::new()).await.unwrap();
        let second = store.add("serviceRequests", Map::new()).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(store.list("serviceRequests").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_writes_are_saved_to_the_loaded_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("docs.json");
        std::fs::write(&path, sample().to_string()).unwrap();

        let store = JsonDocumentStore::load(&path).await.unwrap();
        let id = store
            .add("serviceRequests", fields_of(&json!({ "issue": "Horn" })).unwrap())
            .await
            .unwrap();

        let reloaded = JsonDocumentStore::load(&path).await.unwrap();
        let doc = reloaded.get("serviceRequests", &id).await.unwrap().unwrap();
        assert_eq!(doc.fields["issue"], "Horn");
        assert!(reloaded.get("users", "u1").await.unwrap().is_some());
    }

    #[test]
    fn test_fields_of_requires_an_object() {
        assert!(matches!(fields_of(&json!([1, 2])), Err(DocumentError::Format(_))));
    }
}
