// Score scenario runs from a request file
//
// Usage: score_scenarios <request.json> [output.json]
// The result is printed as JSON when no output path is given.

use anyhow::{bail, Context};
use scenario_scorer::{RequestFile, ScenarioScorer};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scenario_scorer=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut args = std::env::args().skip(1);
    let Some(request_path) = args.next().map(PathBuf::from) else {
        bail!("usage: score_scenarios <request.json> [output.json]");
    };
    let output_path = args.next().map(PathBuf::from);

    let file = RequestFile::load(&request_path)?;
    let scorer = ScenarioScorer::from_request_file(&file)?;
    let result = scorer
        .score(&file.request)
        .with_context(|| format!("Failed to score request {:?}", request_path))?;

    if let Some(error) = &result.scoring_error {
        tracing::warn!("Scores withheld: {}", error);
    }
    for (run, total) in &result.weighted_totals {
        tracing::info!("  run {}: total {:.4}", run, total);
    }

    let json = serde_json::to_string_pretty(&result).context("Failed to serialize result")?;
    match output_path {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write result: {:?}", path))?;
            tracing::info!("Result written to {:?}", path);
        }
        None => println!("{}", json),
    }
    Ok(())
}
