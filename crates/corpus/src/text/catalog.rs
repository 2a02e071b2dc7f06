//! Name-indexed catalog of transforms, for pipelines declared in data.

use std::collections::HashMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::error::PassError;
use super::passes;
use super::pipeline::{TextPass, TextPipeline, TransformFn};

/// One pass in a declarative pipeline.
///
/// ```json
/// { "name": "strip_markers", "transform": "replace_regex_pattern", "args": ["\\[.*?\\]", ""] }
/// ```
///
/// `transform` defaults to `name`, so `{ "name": "to_lowercase" }` is enough
/// for argument-free passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl PassSpec {
    /// A pass named after its transform, without extra arguments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: None,
            args: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: impl Into<String>) -> Self {
        self.transform = Some(transform.into());
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Catalog name of the transform this pass uses.
    pub fn transform_name(&self) -> &str {
        self.transform.as_deref().unwrap_or(&self.name)
    }
}

/// Turns a pass's extra arguments into its transform. Runs once, when the
/// pipeline is built.
pub type PrepareFn = Arc<dyn Fn(&[String]) -> Result<TransformFn, PassError> + Send + Sync>;

/// A catalog transform and the number of extra arguments it accepts.
#[derive(Clone)]
pub struct CatalogEntry {
    pub arity: RangeInclusive<usize>,
    pub summary: &'static str,
    prepare: PrepareFn,
}

impl CatalogEntry {
    /// Validate `args` and produce the transform they configure.
    pub fn prepare(&self, args: &[String]) -> Result<TransformFn, PassError> {
        (self.prepare)(args)
    }

    /// Human-readable arity, e.g. `0`, `1` or `2-3`.
    pub fn arity_label(&self) -> String {
        if self.arity.start() == self.arity.end() {
            self.arity.start().to_string()
        } else {
            format!("{}-{}", self.arity.start(), self.arity.end())
        }
    }
}

impl fmt::Debug for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogEntry")
            .field("arity", &self.arity)
            .field("summary", &self.summary)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PassCatalog {
    entries: HashMap<String, CatalogEntry>,
}

fn arg<'a>(name: &str, args: &'a [String], index: usize) -> Result<&'a str, PassError> {
    args.get(index).map(String::as_str).ok_or_else(|| PassError::Arity {
        transform: name.to_string(),
        expected: format!("at least {}", index + 1),
        got: args.len(),
    })
}

fn shared<F>(transform: F) -> TransformFn
where
    F: Fn(&str, &[String]) -> Result<String, PassError> + Send + Sync + 'static,
{
    Arc::new(transform)
}

impl PassCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding every transform in [`passes`].
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();

        catalog.register_prepared(
            "replace_regex_pattern",
            2..=3,
            "Replace regex matches (pattern, replacement[, flags])",
            |args| {
                let pattern = arg("replace_regex_pattern", args, 0)?;
                let replacement = arg("replace_regex_pattern", args, 1)?.to_string();
                let regex = passes::compile_pattern(pattern, args.get(2).map(String::as_str))?;
                Ok(shared(move |text, _| {
                    Ok(regex.replace_all(text, replacement.as_str()).into_owned())
                }))
            },
        );
        catalog.register(
            "replace_string",
            2..=2,
            "Replace literal text (to_replace, replace_with)",
            |text, args| {
                let to_replace = arg("replace_string", args, 0)?;
                let replace_with = arg("replace_string", args, 1)?;
                Ok(passes::replace_string(text, to_replace, replace_with))
            },
        );
        catalog.register(
            "remove_text_between_brackets",
            1..=1,
            "Drop (...) and [...] groups, collapse gaps to the replacement",
            |text, args| {
                let replacement = arg("remove_text_between_brackets", args, 0)?;
                Ok(passes::remove_text_between_brackets(text, replacement))
            },
        );
        catalog.register_prepared(
            "filter_language",
            1..=1,
            "Keep text in the given ISO 639-3 language, empty otherwise",
            |args| {
                let wanted = passes::language(arg("filter_language", args, 0)?)?;
                Ok(shared(move |text, _| Ok(passes::keep_language(text, wanted))))
            },
        );

        let simple: [(&str, fn(&str) -> String, &'static str); 13] = [
            ("to_lowercase", passes::to_lowercase, "Lowercase the text"),
            (
                "remove_non_alphanumeric",
                passes::remove_non_alphanumeric,
                "Keep letters, digits and common punctuation",
            ),
            (
                "each_sentence_on_new_line",
                passes::each_sentence_on_new_line,
                "Put every sentence on its own line",
            ),
            (
                "remove_excessive_newlines",
                passes::remove_excessive_newlines,
                "Limit blank lines to one",
            ),
            ("remove_tab_characters", passes::remove_tab_characters, "Remove tabs"),
            (
                "filter_out_non_dutch",
                passes::filter_out_non_dutch,
                "Keep Dutch text, empty otherwise",
            ),
            (
                "remove_first_sentence",
                passes::remove_first_sentence,
                "Remove the first line",
            ),
            (
                "remove_last_sentence",
                passes::remove_last_sentence,
                "Remove the last line",
            ),
            (
                "remove_special_unicode_character",
                passes::remove_special_unicode_character,
                "Remove U+009D",
            ),
            (
                "remove_quotation_marks",
                passes::remove_quotation_marks,
                "Remove quotes and apostrophes",
            ),
            (
                "remove_multiple_dots",
                passes::remove_multiple_dots,
                "Collapse runs of dots",
            ),
            (
                "remove_punctuation_if_not_preceded_by_text",
                passes::remove_punctuation_if_not_preceded_by_text,
                "Drop punctuation not following a letter",
            ),
            (
                "collapse_whitespace",
                passes::collapse_whitespace,
                "Collapse whitespace runs to one space",
            ),
        ];
        for (name, transform, summary) in simple {
            catalog.register(name, 0..=0, summary, move |text, _| Ok(transform(text)));
        }

        catalog
    }

    /// Add or replace a transform that reads its arguments on every call.
    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        arity: RangeInclusive<usize>,
        summary: &'static str,
        transform: F,
    ) where
        F: Fn(&str, &[String]) -> Result<String, PassError> + Send + Sync + 'static,
    {
        let transform = shared(transform);
        self.register_prepared(name, arity, summary, move |_| Ok(Arc::clone(&transform)));
    }

    /// Add or replace a transform whose arguments are checked and compiled
    /// once at build time.
    pub fn register_prepared<P>(
        &mut self,
        name: impl Into<String>,
        arity: RangeInclusive<usize>,
        summary: &'static str,
        prepare: P,
    ) where
        P: Fn(&[String]) -> Result<TransformFn, PassError> + Send + Sync + 'static,
    {
        self.entries.insert(
            name.into(),
            CatalogEntry {
                arity,
                summary,
                prepare: Arc::new(prepare),
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.get(name)
    }

    /// Transform names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a pass spec into a runnable pass.
    ///
    /// Checks the argument count, then lets the entry validate the
    /// arguments themselves (regex patterns, flags, language codes).
    pub fn instantiate(&self, spec: &PassSpec) -> Result<TextPass, PassError> {
        let transform_name = spec.transform_name();
        let entry = self
            .entries
            .get(transform_name)
            .ok_or_else(|| PassError::UnknownTransform(transform_name.to_string()))?;

        if !entry.arity.contains(&spec.args.len()) {
            return Err(PassError::Arity {
                transform: transform_name.to_string(),
                expected: entry.arity_label(),
                got: spec.args.len(),
            });
        }

        let transform = entry.prepare(&spec.args)?;
        Ok(TextPass::from_shared(transform, spec.args.clone()))
    }
}

impl TextPipeline {
    /// Build a pipeline from declarative specs, in order.
    pub fn from_specs(specs: &[PassSpec], catalog: &PassCatalog) -> Result<Self, PassError> {
        let mut pipeline = TextPipeline::new();
        for spec in specs {
            pipeline.add_pass(spec.name.clone(), catalog.instantiate(spec)?);
        }
        Ok(pipeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_registered() {
        let catalog = PassCatalog::with_builtins();
        assert_eq!(catalog.len(), 17);
        assert!(catalog.get("filter_out_non_dutch").is_some());
        assert_eq!(
            catalog.get("replace_regex_pattern").unwrap().arity_label(),
            "2-3"
        );
        assert_eq!(catalog.get("to_lowercase").unwrap().arity_label(), "0");
    }

    #[test]
    fn test_pipeline_from_specs() {
        let catalog = PassCatalog::with_builtins();
        let specs = vec![
            PassSpec::new("to_lowercase"),
            PassSpec::new("strip_intro")
                .with_transform("replace_regex_pattern")
                .with_args([r"\[intro\]\s*", ""]),
            PassSpec::new("remove_multiple_dots"),
        ];

        let pipeline = TextPipeline::from_specs(&specs, &catalog).unwrap();
        assert_eq!(
            pipeline.pass_ids(),
            vec!["to_lowercase", "strip_intro", "remove_multiple_dots"]
        );
        assert_eq!(
            pipeline.run_pipeline("[Intro] HALLO...").unwrap(),
            vec!["hallo."]
        );
    }

    #[test]
    fn test_unknown_transform() {
        let catalog = PassCatalog::with_builtins();
        let err = catalog.instantiate(&PassSpec::new("shout")).unwrap_err();
        assert!(matches!(err, PassError::UnknownTransform(name) if name == "shout"));
    }

    #[test]
    fn test_arity_checked_at_build() {
        let catalog = PassCatalog::with_builtins();

        let missing = PassSpec::new("replace_string").with_args(["only one"]);
        assert!(matches!(
            catalog.instantiate(&missing),
            Err(PassError::Arity { got: 1, .. })
        ));

        let extra = PassSpec::new("to_lowercase").with_args(["unexpected"]);
        assert!(matches!(
            catalog.instantiate(&extra),
            Err(PassError::Arity { got: 1, .. })
        ));
    }

    #[test]
    fn test_bad_arguments_fail_at_build() {
        let catalog = PassCatalog::with_builtins();
        let regex = |args: &[&str]| {
            vec![PassSpec::new("broken")
                .with_transform("replace_regex_pattern")
                .with_args(args.iter().copied())]
        };

        assert!(matches!(
            TextPipeline::from_specs(&regex(&["(", ""]), &catalog),
            Err(PassError::InvalidPattern(_))
        ));
        assert!(matches!(
            TextPipeline::from_specs(&regex(&["x", "", "q"]), &catalog),
            Err(PassError::UnknownFlag('q'))
        ));

        let language = vec![PassSpec::new("only")
            .with_transform("filter_language")
            .with_args(["zzz"])];
        assert!(matches!(
            TextPipeline::from_specs(&language, &catalog),
            Err(PassError::UnknownLanguage(code)) if code == "zzz"
        ));
    }

    #[test]
    fn test_compiled_pattern_runs_per_item() {
        let catalog = PassCatalog::with_builtins();
        let specs = vec![PassSpec::new("caps")
            .with_transform("replace_regex_pattern")
            .with_args(["^refrein:?", "", "im"])];
        let pipeline = TextPipeline::from_specs(&specs, &catalog).unwrap();

        assert_eq!(
            pipeline
                .run_pipeline(vec!["Refrein:\nla", "couplet\nREFREIN\nla"])
                .unwrap(),
            vec!["\nla", "couplet\n\nla"]
        );
    }

    #[test]
    fn test_custom_entry_reads_args_per_call() {
        let mut catalog = PassCatalog::new();
        catalog.register("suffix", 1..=1, "Append text", |text, args| {
            Ok(format!("{}{}", text, args[0]))
        });
        let specs = vec![PassSpec::new("suffix").with_args(["!"])];
        let pipeline = TextPipeline::from_specs(&specs, &catalog).unwrap();
        assert_eq!(pipeline.run_pipeline("hoi").unwrap(), vec!["hoi!"]);
    }

    #[test]
    fn test_spec_deserializes_with_defaults() {
        let spec: PassSpec = serde_json::from_str(r#"{"name": "to_lowercase"}"#).unwrap();
        assert_eq!(spec.transform_name(), "to_lowercase");
        assert!(spec.args.is_empty());

        let spec: PassSpec = serde_json::from_str(
            r#"{"name": "gaps", "transform": "remove_text_between_brackets", "args": ["\n"]}"#,
        )
        .unwrap();
        assert_eq!(spec.transform_name(), "remove_text_between_brackets");
        assert_eq!(spec.args, vec!["\n"]);
    }
}
