//! Per-document upgrade chain.

use std::sync::Arc;

use serde::Serialize;

use crate::document::Document;
use crate::errors::MigrateError;
use crate::resolver::VersionResolver;
use crate::step::StepRunner;

/// Result of upgrading one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpgradeOutcome {
    pub document: Document,
    /// Steps applied; 0 when the document was already current.
    pub steps: u64,
}

impl UpgradeOutcome {
    fn unchanged(document: Document) -> Self {
        Self { document, steps: 0 }
    }

    pub fn upgraded(&self) -> bool {
        self.steps > 0
    }
}

/// Walks a document from its current version to the latest, one step at a
/// time.
///
/// Steps never overlap: step N+1 starts only after step N's output has been
/// persisted. The first failing step aborts the chain; steps already written
/// stay written.
pub struct ChainExecutor {
    resolver: Arc<VersionResolver>,
    steps: StepRunner,
    type_field: String,
    version_field: String,
}

impl ChainExecutor {
    pub fn new(
        resolver: Arc<VersionResolver>,
        steps: StepRunner,
        type_field: impl Into<String>,
        version_field: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            steps,
            type_field: type_field.into(),
            version_field: version_field.into(),
        }
    }

    pub async fn upgrade(&self, doc: Document, doc_id: &str) -> Result<UpgradeOutcome, MigrateError> {
        let Some(doc_type) = doc.doc_type(&self.type_field).map(str::to_owned) else {
            log::debug!("'{doc_id}' has no '{}' field; nothing to migrate", self.type_field);
            return Ok(UpgradeOutcome::unchanged(doc));
        };

        let latest = self.resolver.resolve(&doc_type).await;
        if latest == 0 {
            return Ok(UpgradeOutcome::unchanged(doc));
        }

        let current = doc.version(&self.version_field);
        if current >= latest {
            return Ok(UpgradeOutcome::unchanged(doc));
        }

        log::debug!("upgrading {doc_type} '{doc_id}' from v{current} to v{latest}");
        let mut doc = doc;
        for version in current + 1..=latest {
            let output = self.steps.apply_step(version, doc, doc_id).await?;
            if output.version != version {
                log::warn!(
                    "{doc_type} '{doc_id}' migration v{version} left '{}' at v{}; stored as returned",
                    self.version_field,
                    output.version
                );
            }
            doc = output.document;
        }

        Ok(UpgradeOutcome {
            document: doc,
            steps: latest - current,
        })
    }
}
