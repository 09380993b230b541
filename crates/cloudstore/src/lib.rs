//! Storage clients for the practice service.
//!
//! Two narrow seams: [`KvStore`] for profile/student records and
//! [`ObjectStore`] for recordings and handwriting captures. Each has an
//! in-memory, a local filesystem and an AWS backend.

mod error;
mod kv;
mod object;
mod memory;
mod fs;
mod sigv4;
mod dynamo;
mod s3;

pub use error::{StoreError, Result};
pub use kv::{KvStore, TableSpec, ItemKey, Item, to_item};
pub use object::{ObjectStore, validate_key};
pub use memory::{MemoryKv, MemoryObjects, StoredObject};
pub use fs::{FileKv, FsObjects};
pub use sigv4::{Credentials, RequestSigner, signing_key};
pub use dynamo::{DynamoKv, to_attribute, from_attribute};
pub use s3::S3Objects;
