//! Port trait definitions (Hexagonal Architecture)
//!
//! Interfaces the executor needs from its external collaborators:
//! - ObjectStoreClient / ObjectStoreFactory: object storage I/O
//! - CredentialSource: scheme-specific credential providers
//! - BatchDecoder: file-format decoding

pub mod credential_source;
pub mod decoder;
pub mod errors;
pub mod object_store;

pub use credential_source::{CredentialSource, CredentialSourceConstructor};
pub use decoder::BatchDecoder;
pub use errors::{DecodeError, StoreError};
pub use object_store::{ObjectStoreClient, ObjectStoreFactory};
