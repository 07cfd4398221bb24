//! ConfigStore: parse, merge and serialize the relay's persisted `.env` configuration.

pub mod document;
pub mod normalize;
pub mod schema;
pub mod serializer;

pub use document::{ConfigDocument, ConfigEntry, ParseReport};
pub use normalize::{normalize_boolean, normalize_number, normalize_text, resolve};
pub use schema::{FieldDef, RelayProfile, ValueKind};
pub use serializer::{render_document, serialize};
