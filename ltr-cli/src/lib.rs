//! The `ltr` command line: train, rerank, evaluate, config.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use ltr_eval::{
    EvaluationConfig, EvaluationHarness, JudgmentTable, RetrievalMethod, RunFileRetriever,
    read_benchmark_queries,
};
use ltr_rank::{
    ArtifactStore, Candidate, FsDocumentSource, LetorConfig, LetorService, Reranker,
    train_from_files,
};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "ltr")]
#[command(version, about = "Learning-to-rank reranking and retrieval evaluation")]
pub struct Cli {
    /// Default log directive (RUST_LOG takes precedence)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Path to the reranker config file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit the topic model and train the ranker, then save both artifacts
    Train {
        /// Query extraction file: `<id> <tokens...> <trailing>`
        #[arg(long)]
        queries: PathBuf,
        /// Document extraction file: `<id> <tokens...> <trailing>`
        #[arg(long)]
        documents: PathBuf,
        /// Graded judgments: `<query_id> <doc_id> <grade>`
        #[arg(long)]
        qrels: PathBuf,
        /// Override the artifact directory
        #[arg(long)]
        artifacts: Option<PathBuf>,
    },

    /// Rerank document references for a query
    Rerank {
        /// Query text
        #[arg(short, long)]
        query: String,
        /// Directory the references are relative to
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Document references in baseline order
        #[arg(required = true)]
        references: Vec<String>,
    },

    /// Compare baseline runs with their reranked versions
    Evaluate {
        /// Relevance judgments: `<query_id> <doc_id> ...`
        #[arg(long)]
        qrels: PathBuf,
        /// Benchmark queries: `<query_id> <tokens...>`
        #[arg(long)]
        queries: PathBuf,
        /// Baseline run per method, e.g. `bm25=runs/bm25.txt`
        #[arg(long = "run", value_parser = parse_run_spec, required = true)]
        runs: Vec<(RetrievalMethod, PathBuf)>,
        /// Directory the run references are relative to
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Evaluation config file (TOML)
        #[arg(long)]
        eval_config: Option<PathBuf>,
        /// Report location
        #[arg(long)]
        report: Option<PathBuf>,
        /// Retrieval depth
        #[arg(long)]
        depth: Option<usize>,
        /// Queries evaluated concurrently
        #[arg(long)]
        concurrency: Option<usize>,
        /// Print the report as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Print the evaluation config instead
        #[arg(long)]
        evaluation: bool,
        /// Evaluation config file to start from
        #[arg(long)]
        eval_config: Option<PathBuf>,
    },
}

/// Parse `<method>=<path>`.
pub fn parse_run_spec(spec: &str) -> Result<(RetrievalMethod, PathBuf), String> {
    let (method, path) =
        spec.split_once('=').ok_or_else(|| format!("expected <method>=<file>, got {spec:?}"))?;
    if path.is_empty() {
        return Err(format!("missing run file in {spec:?}"));
    }
    let method = method.parse::<RetrievalMethod>().map_err(|e| e.to_string())?;
    Ok((method, PathBuf::from(path)))
}

fn load_letor_config(path: Option<&Path>) -> anyhow::Result<LetorConfig> {
    match path {
        Some(path) => LetorConfig::from_file(path)
            .with_context(|| format!("loading reranker config {}", path.display())),
        None => Ok(LetorConfig::default()),
    }
}

fn load_eval_config(path: Option<&Path>) -> anyhow::Result<EvaluationConfig> {
    match path {
        Some(path) => EvaluationConfig::from_file(path)
            .with_context(|| format!("loading evaluation config {}", path.display())),
        None => Ok(EvaluationConfig::default()),
    }
}

/// Execute a parsed command line.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let letor = load_letor_config(cli.config.as_deref())?;
    match cli.command {
        Command::Train { queries, documents, qrels, artifacts } => {
            let mut config = letor;
            if let Some(dir) = artifacts {
                config.artifact_dir = dir;
            }
            train(config, queries, documents, qrels).await
        }
        Command::Rerank { query, root, references } => rerank(&letor, &query, root, references).await,
        Command::Evaluate {
            qrels,
            queries,
            runs,
            root,
            eval_config,
            report,
            depth,
            concurrency,
            json,
        } => {
            let mut config = load_eval_config(eval_config.as_deref())?;
            if let Some(report) = report {
                config.report_path = report;
            }
            if let Some(depth) = depth {
                config.depth = depth;
            }
            if let Some(concurrency) = concurrency {
                config.concurrency = concurrency;
            }
            evaluate(&letor, config, EvaluateInputs { qrels, queries, runs, root }, json).await
        }
        Command::Config { evaluation, eval_config } => {
            let text = if evaluation {
                load_eval_config(eval_config.as_deref())?.to_toml()?
            } else {
                letor.to_toml()?
            };
            print!("{text}");
            Ok(())
        }
    }
}

async fn train(
    config: LetorConfig,
    queries: PathBuf,
    documents: PathBuf,
    qrels: PathBuf,
) -> anyhow::Result<()> {
    let store = ArtifactStore::new(&config.artifact_dir);
    let models =
        tokio::task::spawn_blocking(move || train_from_files(&config, queries, documents, qrels))
            .await
            .context("training task panicked")??;
    store.save_topic_model(&models.topic_model)?;
    store.save_ranker(&models.ranker)?;
    info!(dir = %store.dir().display(), "saved artifacts");

    let summary = models.summary;
    println!(
        "trained on {} queries, {} examples ({} judgment rows dropped), train NDCG@10 = {:.4}",
        summary.groups, summary.examples, summary.dropped_rows, summary.train_ndcg
    );
    Ok(())
}

async fn rerank(
    config: &LetorConfig,
    query: &str,
    root: PathBuf,
    references: Vec<String>,
) -> anyhow::Result<()> {
    let store = ArtifactStore::new(&config.artifact_dir);
    let service = LetorService::open(&store, Arc::new(FsDocumentSource::new(root)))?;
    if !service.is_ready() {
        bail!("no trained models in {}; run `ltr train` first", store.dir().display());
    }
    let total = references.len();
    let candidates =
        references.into_iter().enumerate().map(|(i, r)| Candidate::new(r, (total - i) as f64)).collect();
    let outcome = service.rerank(query, candidates).await?;
    for (rank, doc) in outcome.ranked.iter().enumerate() {
        println!("{}\t{:.6}\t{}", rank + 1, doc.score, doc.reference);
    }
    for reference in &outcome.skipped {
        eprintln!("skipped\t{reference}");
    }
    Ok(())
}

struct EvaluateInputs {
    qrels: PathBuf,
    queries: PathBuf,
    runs: Vec<(RetrievalMethod, PathBuf)>,
    root: PathBuf,
}

async fn evaluate(
    letor: &LetorConfig,
    mut config: EvaluationConfig,
    inputs: EvaluateInputs,
    json: bool,
) -> anyhow::Result<()> {
    // A method named on the command line keeps the parameters the config file gives it.
    let mut retriever = RunFileRetriever::new();
    let mut methods = Vec::with_capacity(inputs.runs.len());
    for (parsed, path) in inputs.runs {
        let method =
            config.methods.iter().find(|m| m.name() == parsed.name()).copied().unwrap_or(parsed);
        retriever = retriever.with_run_file(method, &path)?;
        methods.push(method);
    }
    config.methods = methods;

    let judgments = JudgmentTable::from_file(&inputs.qrels)?;
    let queries = read_benchmark_queries(&inputs.queries)?;
    let store = ArtifactStore::new(&letor.artifact_dir);
    let service = LetorService::open(&store, Arc::new(FsDocumentSource::new(inputs.root)))?;

    let harness =
        EvaluationHarness::new(config, Arc::new(retriever), Arc::new(service), Arc::new(judgments))?;
    let report = harness.run(&queries).await?;
    if json {
        report.write_to(&harness.config().report_path)?;
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.publish(&harness.config().report_path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_specs_parse() {
        let (method, path) = parse_run_spec("bm25=runs/bm25.txt").unwrap();
        assert_eq!(method, RetrievalMethod::bm25());
        assert_eq!(path, PathBuf::from("runs/bm25.txt"));
        assert!(parse_run_spec("bm25").is_err());
        assert!(parse_run_spec("bm25=").is_err());
        assert!(parse_run_spec("dense=run.txt").is_err());
    }

    #[test]
    fn evaluate_requires_a_run() {
        let err = Cli::try_parse_from(["ltr", "evaluate", "--qrels", "q", "--queries", "x"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let cli = Cli::try_parse_from([
            "ltr", "evaluate", "--qrels", "q", "--queries", "x", "--run", "tfidf=a", "--run",
            "bm25=b", "--depth", "10",
        ])
        .unwrap();
        match cli.command {
            Command::Evaluate { runs, depth, .. } => {
                assert_eq!(runs.len(), 2);
                assert_eq!(runs[0].0, RetrievalMethod::TfIdf);
                assert_eq!(depth, Some(10));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from(["ltr", "rerank", "-q", "heart", "1.txt", "--config", "c.toml"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
        assert_eq!(cli.log_level, "info");
    }

    #[tokio::test]
    async fn rerank_without_models_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("letor.toml");
        std::fs::write(&config, format!("artifact_dir = {:?}\n", dir.path().join("none"))).unwrap();
        let args: Vec<std::ffi::OsString> = vec![
            "ltr".into(),
            "--config".into(),
            config.clone().into_os_string(),
            "rerank".into(),
            "-q".into(),
            "heart".into(),
            "1.txt".into(),
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        let err = run(cli).await.unwrap_err();
        assert!(err.to_string().contains("ltr train"));
    }
}
