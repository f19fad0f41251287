/// Document store module - Gateway
mod store;

pub use store::{fields_of, Document, DocumentError, DocumentStore, JsonDocumentStore};
