pub mod recorder;

pub use recorder::{AuditEntry, AuditRecord, AuditRecorder};
