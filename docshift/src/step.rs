//! Single version step: migrate, persist, report.

use std::sync::Arc;

use crate::document::Document;
use crate::errors::MigrateError;
use crate::registry::FunctionRegistry;
use crate::store::DocumentStore;

/// Result of one applied step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    pub document: Document,
    /// Version declared by the persisted document.
    pub version: u64,
}

/// Applies one migration step to one document and persists the result.
pub struct StepRunner {
    functions: Arc<FunctionRegistry>,
    store: Arc<dyn DocumentStore>,
    type_field: String,
    version_field: String,
}

impl StepRunner {
    pub fn new(
        functions: Arc<FunctionRegistry>,
        store: Arc<dyn DocumentStore>,
        type_field: impl Into<String>,
        version_field: impl Into<String>,
    ) -> Self {
        Self {
            functions,
            store,
            type_field: type_field.into(),
            version_field: version_field.into(),
        }
    }

    /// Run the migration producing `version` and save its output under `doc_id`.
    ///
    /// Success is only reported once the write is confirmed. A migration that
    /// leaves the version field out gets it stamped with `version` before the
    /// write.
    pub async fn apply_step(&self, version: u64, doc: Document, doc_id: &str) -> Result<StepOutput, MigrateError> {
        let doc_type = doc.doc_type(&self.type_field).unwrap_or_default().to_string();

        let migration = self
            .functions
            .get(&doc_type, version)
            .ok_or_else(|| MigrateError::MissingMigration {
                doc_type: doc_type.clone(),
                version,
            })?;

        let mut migrated = migration
            .migrate(doc)
            .await
            .map_err(|source| MigrateError::Migration {
                doc_type: doc_type.clone(),
                version,
                source,
            })?;

        if !migrated.contains(&self.version_field) {
            migrated.set_version(&self.version_field, version);
        }

        self.store
            .upsert(doc_id, &migrated)
            .await
            .map_err(|source| MigrateError::Persistence {
                key: doc_id.to_string(),
                source,
            })?;

        let new_version = migrated.version(&self.version_field);
        log::debug!("{doc_type} '{doc_id}' migrated to v{new_version}");
        Ok(StepOutput {
            document: migrated,
            version: new_version,
        })
    }
}
