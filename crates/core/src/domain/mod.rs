// Domain Layer - Pure business logic and entities

pub mod block_list;
pub mod delay;
pub mod duplicate;
pub mod error;
pub mod locale;
pub mod post_date;
pub mod record;
pub mod status;

// Re-exports
pub use block_list::{BlockList, BlockListEntry};
pub use delay::{DelayAlgorithm, DelayPolicy};
pub use duplicate::{DuplicateAssociation, DuplicateRegistry, MatchType, RegistryEntry};
pub use error::DomainError;
pub use locale::{Language, Locale};
pub use post_date::parse_post_date;
pub use record::{
    qualify_key_id, split_tags, FieldValue, JobField, KeyId, Record, RecordSet, KEY_ID_SEPARATOR,
    TAG_SEPARATOR,
};
pub use status::JobStatus;
