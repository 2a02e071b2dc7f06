//! End-to-end: registry -> builder -> executor -> writer.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use corpus::backend::DEFAULT_BACKEND_NAME;
use corpus::output::{output_path, save_to_path};
use corpus::text::{PassCatalog, PassSpec};
use corpus::{
    Backend, BackendError, BackendRegistry, ExecutorConfig, InitArgs, OutputFormat,
    PipelineBuilder, PipelineExecutor, RunConfiguration, TextContainer, TextPipeline,
};

#[derive(Debug, Deserialize)]
struct StubConfig {
    #[serde(default)]
    rows: Vec<String>,
    #[serde(default)]
    delay_ms: u64,
    #[serde(default)]
    fail: bool,
    #[serde(default)]
    passes: Vec<PassSpec>,
}

#[derive(Default)]
struct StubBackend {
    name: Option<String>,
    config: Option<StubConfig>,
}

#[async_trait]
impl Backend for StubBackend {
    fn initialise(&mut self, args: InitArgs) -> Result<(), BackendError> {
        self.config = Some(args.parse()?);
        self.name = Some(args.display_name);
        Ok(())
    }

    async fn run(&mut self) -> Result<Vec<String>, BackendError> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| BackendError::Other("not initialised".to_string()))?;
        tokio::time::sleep(Duration::from_millis(config.delay_ms)).await;
        if config.fail {
            return Err(BackendError::Upstream("stub failure".to_string()));
        }
        let pipeline = TextPipeline::from_specs(&config.passes, &PassCatalog::with_builtins())
            .map_err(|e| BackendError::InvalidArguments(e.to_string()))?;
        Ok(pipeline.run_pipeline(config.rows.clone())?)
    }

    fn backend_name(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_BACKEND_NAME)
    }
}

fn registry() -> BackendRegistry {
    let mut registry = BackendRegistry::new();
    registry.register_type::<StubBackend>("stub");
    registry.register_type::<StubBackend>("ok");
    registry.register_type::<StubBackend>("fail");
    registry
}

async fn collect(config: &RunConfiguration) -> corpus::ExecutionOutcome {
    let registry = registry();
    let pipeline = PipelineBuilder::new(&registry).build(config).unwrap();
    PipelineExecutor::new(ExecutorConfig {
        workers: 4,
        timeout: None,
    })
    .execute(pipeline.into_backends())
    .await
}

#[tokio::test]
async fn test_ok_and_failing_backend() {
    let config = RunConfiguration::from_json_str(
        r#"{
            "ok": {"name": "ok", "call_arguments": {"rows": ["hello"]}},
            "fail": {"name": "fail", "call_arguments": {"fail": true}}
        }"#,
    )
    .unwrap();

    let outcome = collect(&config).await;
    assert_eq!(outcome.container.column_names(), vec!["ok"]);
    assert_eq!(outcome.container.get("ok").unwrap(), ["hello".to_string()]);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].backend_name, "fail");
}

#[tokio::test]
async fn test_column_set_independent_of_completion_order() {
    // Failing backends finish both before and after the successful ones.
    let delays = [40, 5, 25, 0, 15, 30];
    let failing = [1, 4];

    let mut config = RunConfiguration::new();
    for (i, delay) in delays.iter().enumerate() {
        let blob = serde_json::json!({
            "rows": [format!("row {i}")],
            "delay_ms": delay,
            "fail": failing.contains(&i),
        });
        config.insert(format!("stub{i}"), InitArgs::new(format!("backend {i}"), blob.to_string()));
    }

    // Distinct identifiers keep every entry; all map to the same stub type.
    let mut registry = registry();
    for i in 0..delays.len() {
        registry.register_type::<StubBackend>(format!("stub{i}"));
    }
    let pipeline = PipelineBuilder::new(&registry).build(&config).unwrap();
    assert_eq!(pipeline.len(), delays.len());

    let outcome = PipelineExecutor::default()
        .execute(pipeline.into_backends())
        .await;

    let mut columns: Vec<&str> = outcome.container.column_names();
    columns.sort_unstable();
    assert_eq!(
        columns,
        vec!["backend 0", "backend 2", "backend 3", "backend 5"]
    );
    let mut failed: Vec<&str> = outcome
        .failures
        .iter()
        .map(|f| f.backend_name.as_str())
        .collect();
    failed.sort_unstable();
    assert_eq!(failed, vec!["backend 1", "backend 4"]);
}

#[tokio::test]
async fn test_backend_pipeline_runs_declared_passes() {
    let config = RunConfiguration::from_json_str(
        r#"{
            "stub": {
                "name": "Verhalen",
                "call_arguments": {
                    "rows": ["  Eerste   VERHAAL...  ", ""],
                    "passes": [
                        {"name": "collapse_whitespace"},
                        {"name": "to_lowercase"},
                        {"name": "remove_multiple_dots"}
                    ]
                }
            }
        }"#,
    )
    .unwrap();

    let outcome = collect(&config).await;
    assert_eq!(
        outcome.container.get("Verhalen").unwrap(),
        ["eerste verhaal.".to_string(), String::new()]
    );
}

#[tokio::test]
async fn test_unknown_backend_gives_partial_run() {
    let config = RunConfiguration::new()
        .with_backend("does_not_exist", "Missing", "{}")
        .with_backend("ok", "Present", r#"{"rows": ["x"]}"#);

    let registry = registry();
    let pipeline = PipelineBuilder::new(&registry).build(&config).unwrap();
    assert_eq!(pipeline.report().unresolved, vec!["does_not_exist"]);

    let outcome = PipelineExecutor::default()
        .execute(pipeline.into_backends())
        .await;
    assert_eq!(outcome.container.column_names(), vec!["Present"]);
    assert!(outcome.failures.is_empty());
}

fn ragged_container() -> TextContainer {
    let mut container = TextContainer::new();
    container.insert(
        "a",
        vec!["x".to_string(), String::new(), "y".to_string()],
    );
    container.insert("b", vec!["z".to_string()]);
    container
}

#[test]
fn test_save_csv_and_json() {
    let dir = tempfile::tempdir().unwrap();
    let container = ragged_container();

    let csv_path = output_path(&dir.path().join("nested"), "lyrics", OutputFormat::Csv);
    save_to_path(&container, OutputFormat::Csv, &csv_path).unwrap();
    let csv = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(csv, "a,b\nx,z\ny,\n");

    let json_path = output_path(dir.path(), "lyrics", OutputFormat::Json);
    save_to_path(&container, OutputFormat::Json, &json_path).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(json, serde_json::json!({"a": ["x", "y"], "b": ["z"]}));
}

#[test]
fn test_save_tsv() {
    let dir = tempfile::tempdir().unwrap();
    let path = output_path(dir.path(), "lyrics", OutputFormat::Tsv);
    save_to_path(&ragged_container(), OutputFormat::Tsv, &path).unwrap();
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "a\tb\nx\tz\ny\t\n"
    );
}
