//! Ordered, named text passes applied across a batch of strings.

use std::fmt;
use std::sync::Arc;

use super::error::{PassError, PipelineError};

/// Uniform transform signature: the current text plus the pass's extra
/// arguments (possibly none).
pub type TransformFn = Arc<dyn Fn(&str, &[String]) -> Result<String, PassError> + Send + Sync>;

/// A transform together with the extra arguments it is called with.
#[derive(Clone)]
pub struct TextPass {
    transform: TransformFn,
    args: Vec<String>,
}

impl TextPass {
    /// Create a pass with no extra arguments.
    pub fn new<F>(transform: F) -> Self
    where
        F: Fn(&str, &[String]) -> Result<String, PassError> + Send + Sync + 'static,
    {
        Self {
            transform: Arc::new(transform),
            args: Vec::new(),
        }
    }

    /// Create a pass from an infallible single-argument function.
    pub fn simple(transform: fn(&str) -> String) -> Self {
        Self::new(move |text, _| Ok(transform(text)))
    }

    pub(crate) fn from_shared(transform: TransformFn, args: Vec<String>) -> Self {
        Self { transform, args }
    }

    /// Set the extra arguments passed after the text.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Apply the pass to one string.
    pub fn apply(&self, text: &str) -> Result<String, PassError> {
        (self.transform)(text, &self.args)
    }
}

impl fmt::Debug for TextPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextPass").field("args", &self.args).finish()
    }
}

/// Input to [`TextPipeline::run_pipeline`]: a single string becomes a
/// one-element batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch(pub Vec<String>);

impl From<&str> for Batch {
    fn from(text: &str) -> Self {
        Batch(vec![text.to_string()])
    }
}

impl From<String> for Batch {
    fn from(text: String) -> Self {
        Batch(vec![text])
    }
}

impl From<Vec<String>> for Batch {
    fn from(texts: Vec<String>) -> Self {
        Batch(texts)
    }
}

impl From<Vec<&str>> for Batch {
    fn from(texts: Vec<&str>) -> Self {
        Batch(texts.into_iter().map(str::to_string).collect())
    }
}

/// Ordered mapping from pass id to pass.
///
/// Passes run in insertion order. Strings emptied by a pass (a language
/// filter, say) stay in the batch and flow through the remaining passes;
/// dropping empties is the writer's job.
#[derive(Debug, Clone, Default)]
pub struct TextPipeline {
    passes: Vec<(String, TextPass)>,
}

impl TextPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pass.
    ///
    /// An id that is already present keeps its position and has its pass
    /// replaced.
    pub fn add_pass(&mut self, pass_id: impl Into<String>, pass: TextPass) {
        let pass_id = pass_id.into();
        match self.passes.iter_mut().find(|(id, _)| *id == pass_id) {
            Some((_, existing)) => *existing = pass,
            None => self.passes.push((pass_id, pass)),
        }
    }

    /// Append several passes, in iteration order.
    pub fn add_passes<I, S>(&mut self, passes: I)
    where
        I: IntoIterator<Item = (S, TextPass)>,
        S: Into<String>,
    {
        for (pass_id, pass) in passes {
            self.add_pass(pass_id, pass);
        }
    }

    /// Builder-style [`add_pass`](Self::add_pass).
    pub fn with_pass(mut self, pass_id: impl Into<String>, pass: TextPass) -> Self {
        self.add_pass(pass_id, pass);
        self
    }

    /// Remove a pass, returning it if it was present.
    pub fn remove_pass(&mut self, pass_id: &str) -> Option<TextPass> {
        let index = self.passes.iter().position(|(id, _)| id == pass_id)?;
        Some(self.passes.remove(index).1)
    }

    pub fn contains(&self, pass_id: &str) -> bool {
        self.passes.iter().any(|(id, _)| id == pass_id)
    }

    /// Pass ids in execution order.
    pub fn pass_ids(&self) -> Vec<&str> {
        self.passes.iter().map(|(id, _)| id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Run every pass over the batch and return the transformed batch.
    pub fn run_pipeline(&self, input: impl Into<Batch>) -> Result<Vec<String>, PipelineError> {
        let Batch(mut batch) = input.into();
        self.run_in_place(&mut batch)?;
        Ok(batch)
    }

    /// Run every pass over the batch in place.
    ///
    /// Pass N is applied to every element before pass N+1 starts. On error
    /// the batch holds whatever the passes before the failure produced.
    pub fn run_in_place(&self, batch: &mut [String]) -> Result<(), PipelineError> {
        for (pass_id, pass) in &self.passes {
            tracing::trace!("Running pass '{}' over {} item(s)", pass_id, batch.len());
            for text in batch.iter_mut() {
                *text = pass.apply(text).map_err(|source| PipelineError::Pass {
                    pass: pass_id.clone(),
                    source,
                })?;
            }
        }
        Ok(())
    }
}
