//! Full catalog builds across deployment spaces and decision services.

use crate::catalog::{ServiceContext, ToolCatalogBuilder};
use crate::error::{OpenApiToolsError, Result};
use crate::schema::ExpandOptions;
use crate::snapshot::CatalogSnapshot;
use crate::source::DecisionServiceSource;
use std::collections::HashSet;

/// What to scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogScope {
    pub deployment_spaces: Vec<String>,
    /// Explicit service ids. `None` discovers them from deployment space metadata.
    pub decision_service_ids: Option<Vec<String>>,
    pub expand_options: ExpandOptions,
    /// Look up `mcpToolName.<operation>` in decision metadata.
    pub name_overrides: bool,
}

impl Default for CatalogScope {
    fn default() -> Self {
        Self {
            deployment_spaces: vec!["development".to_string()],
            decision_service_ids: None,
            expand_options: ExpandOptions::default(),
            name_overrides: true,
        }
    }
}

/// How a failed service discovery call is handled.
///
/// Failures of a single service (document or metadata fetch) are skipped under both policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log and continue with the remaining deployment spaces (startup).
    SkipFailedSources,
    /// Fail the whole build (reconciliation, where a failed build means "no change").
    AbortOnFailure,
}

/// Build the catalog for every service of every deployment space in `scope`.
///
/// One name set is threaded through the whole build, so names are unique catalog-wide.
///
/// # Errors
///
/// Returns [`OpenApiToolsError::NamingConflict`] whenever an operation cannot be named, and
/// [`OpenApiToolsError::RemoteFetch`] for a failed discovery call under
/// [`FailurePolicy::AbortOnFailure`].
pub async fn assemble_catalog(
    source: &dyn DecisionServiceSource,
    scope: &CatalogScope,
    policy: FailurePolicy,
) -> Result<CatalogSnapshot> {
    let mut builder = ToolCatalogBuilder::new(scope.expand_options);
    if scope.name_overrides {
        builder = builder.with_name_overrides(source);
    }

    let mut existing_names: HashSet<String> = HashSet::new();
    let mut descriptors = Vec::new();

    for space in &scope.deployment_spaces {
        let service_ids = match &scope.decision_service_ids {
            Some(ids) => ids.clone(),
            None => match source.list_decision_service_ids(space).await {
                Ok(ids) => ids,
                Err(e) => match policy {
                    FailurePolicy::SkipFailedSources => {
                        tracing::warn!(
                            deployment_space = %space,
                            error = %e,
                            "Skipping deployment space: decision service discovery failed"
                        );
                        continue;
                    }
                    FailurePolicy::AbortOnFailure => {
                        return Err(OpenApiToolsError::RemoteFetch {
                            context: format!("decision services of deployment space '{space}'"),
                            source: e,
                        });
                    }
                },
            },
        };
        tracing::debug!(deployment_space = %space, services = ?service_ids, "decision services");

        for service_id in &service_ids {
            let document = match source.fetch_openapi_document(space, service_id).await {
                Ok(doc) => doc,
                Err(e) => {
                    tracing::warn!(
                        "Skipping decision service '{}' in '{}': {}",
                        service_id,
                        space,
                        e
                    );
                    continue;
                }
            };

            let service = ServiceContext {
                deployment_space: space,
                decision_service_id: service_id,
            };
            match builder.build(&document, service, &mut existing_names).await {
                Ok(built) => {
                    tracing::info!(
                        "Discovered {} tools from decision service '{}' in '{}'",
                        built.len(),
                        service_id,
                        space
                    );
                    descriptors.extend(built);
                }
                Err(e @ OpenApiToolsError::NamingConflict { .. }) => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        "Skipping decision service '{}' in '{}': {}",
                        service_id,
                        space,
                        e
                    );
                }
            }
        }
    }

    Ok(CatalogSnapshot::new(descriptors))
}
