//! CV Builder Core - document model, editing and print hand-off
//!
//! # Flow
//! 1. Actions are reduced into a new document (`reducer`)
//! 2. The store persists it after a quiet period (`store`, `persistence`)
//! 3. Validation and completion are derived, never stored (`validation`)
//! 4. Templates turn the document into a visual tree (`templates`, `render`)
//! 5. The export pipeline wraps the tree for printing (`pipeline`, `print`)

pub mod config;
pub mod document;
pub mod hashing;
pub mod ids;
pub mod persistence;
pub mod pipeline;
pub mod print;
pub mod reducer;
pub mod render;
pub mod scheduler;
pub mod store;
pub mod templates;
pub mod validation;

pub use config::{Config, ConfigError};
pub use document::{CvDocument, SectionKind, Settings};
pub use hashing::{canonical_json, document_hash};
pub use ids::{IdGenerator, SequentialIds, TimeRandomIds};
pub use persistence::{FileStore, ImportError, KeyValueStore, LoadOutcome, MemoryStore, StorageError};
pub use pipeline::{ExportBundle, ExportPipeline, ExportedFile, PipelineError};
pub use print::{PageSpec, PrintAuthority, PrintDocument};
pub use reducer::{reduce, CvAction};
pub use render::Node;
pub use scheduler::{Debouncer, LatestRequest, RequestTicket, TaskHandle};
pub use store::{Clock, CvStore, SystemClock};
pub use templates::{CvTemplate, RenderedCv, TemplateError, TemplateId, TemplateInfo, TemplateRegistry};
pub use validation::{
    completion_percentage, CompletionReport, ValidationReport, ValidationRule, ValidationViolation,
    Validator, ViolationSeverity,
};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
