//! Instantiates and initialises one backend per run-configuration entry.

use super::{BuildError, InitFailurePolicy};
use crate::backend::{Backend, BackendError, BackendRegistry};
use crate::config::RunConfiguration;

/// A backend whose `initialise` failed and was skipped.
#[derive(Debug)]
pub struct InitFailure {
    pub identifier: String,
    pub display_name: String,
    pub error: BackendError,
}

/// What happened to entries that did not make it into the pipeline.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Identifiers with no registered backend.
    pub unresolved: Vec<String>,
    /// Entries whose initialisation failed under [`InitFailurePolicy::Skip`].
    pub init_failures: Vec<InitFailure>,
    /// Display names claimed by more than one entry; the later entry won.
    pub replaced: Vec<String>,
}

impl BuildReport {
    /// True when every configured entry produced its own backend.
    pub fn is_clean(&self) -> bool {
        self.unresolved.is_empty() && self.init_failures.is_empty() && self.replaced.is_empty()
    }
}

/// Initialised backends keyed by display name, in configuration order.
pub struct BuiltPipeline {
    backends: Vec<(String, Box<dyn Backend>)>,
    report: BuildReport,
}

impl BuiltPipeline {
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Display names in configuration order.
    pub fn names(&self) -> Vec<&str> {
        self.backends.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    /// Hand the backends to an executor.
    pub fn into_backends(self) -> Vec<Box<dyn Backend>> {
        self.backends.into_iter().map(|(_, backend)| backend).collect()
    }

    pub fn into_parts(self) -> (Vec<Box<dyn Backend>>, BuildReport) {
        let backends = self.backends.into_iter().map(|(_, backend)| backend).collect();
        (backends, self.report)
    }

    fn insert(&mut self, backend: Box<dyn Backend>) {
        let name = backend.backend_name().to_string();
        match self.backends.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => {
                tracing::warn!(
                    "Display name '{}' is used by more than one backend; keeping the later one",
                    name
                );
                *slot = backend;
                self.report.replaced.push(name);
            }
            None => self.backends.push((name, backend)),
        }
    }
}

impl std::fmt::Debug for BuiltPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltPipeline")
            .field("backends", &self.names())
            .field("report", &self.report)
            .finish()
    }
}

/// Builds a [`BuiltPipeline`] from a [`RunConfiguration`].
///
/// Unknown identifiers are skipped and recorded unless `strict` is set.
/// Initialisation failures follow the configured [`InitFailurePolicy`].
#[derive(Debug, Clone, Copy)]
pub struct PipelineBuilder<'a> {
    registry: &'a BackendRegistry,
    init_failure: InitFailurePolicy,
    strict: bool,
}

impl<'a> PipelineBuilder<'a> {
    pub fn new(registry: &'a BackendRegistry) -> Self {
        Self {
            registry,
            init_failure: InitFailurePolicy::default(),
            strict: false,
        }
    }

    pub fn init_failure(mut self, policy: InitFailurePolicy) -> Self {
        self.init_failure = policy;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn build(&self, config: &RunConfiguration) -> Result<BuiltPipeline, BuildError> {
        let mut pipeline = BuiltPipeline {
            backends: Vec::with_capacity(config.len()),
            report: BuildReport::default(),
        };

        for (identifier, args) in config.entries() {
            let Some(mut backend) = self.registry.create(identifier) else {
                if self.strict {
                    return Err(BuildError::UnknownBackend(identifier.to_string()));
                }
                tracing::warn!("No backend registered as '{}', skipping", identifier);
                pipeline.report.unresolved.push(identifier.to_string());
                continue;
            };

            if let Err(error) = backend.initialise(args.clone()) {
                match self.init_failure {
                    InitFailurePolicy::Abort => {
                        return Err(BuildError::Initialise {
                            identifier: identifier.to_string(),
                            source: error,
                        });
                    }
                    InitFailurePolicy::Skip => {
                        tracing::warn!(
                            "Failed to initialise backend '{}' ({}): {}",
                            identifier,
                            args.display_name,
                            error
                        );
                        pipeline.report.init_failures.push(InitFailure {
                            identifier: identifier.to_string(),
                            display_name: args.display_name.clone(),
                            error,
                        });
                        continue;
                    }
                }
            }

            tracing::debug!(
                "Initialised backend '{}' as '{}'",
                identifier,
                backend.backend_name()
            );
            pipeline.insert(backend);
        }

        Ok(pipeline)
    }
}
