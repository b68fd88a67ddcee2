use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use autoname_resolver::{config::Config, pipeline::NameResolutionPipeline, schema::RawNameInput};

/// 標準入力の1行を1件として読む。タブ区切りの2列目があれば
/// 文脈ブランドヒントとして扱う。
fn input_from_line(line: &str) -> RawNameInput {
    match line.split_once('\t') {
        Some((text, hint)) if !hint.trim().is_empty() => {
            RawNameInput::title(text).with_brand_hint(hint.trim())
        }
        Some((text, _)) => RawNameInput::title(text),
        None => RawNameInput::title(line),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    autoname_resolver::observability::init().context("failed to initialize tracing")?;

    let config = Config::from_env().context("failed to load configuration")?;
    let pipeline =
        NameResolutionPipeline::from_config(&config).context("failed to build pipeline")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut inputs = Vec::new();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        inputs.push(input_from_line(&line));
    }

    info!(count = inputs.len(), "resolving batch");
    let results = pipeline.resolve_batch(inputs).await;

    for resolved in &results {
        println!(
            "{}\t{}\t{:.2}\t{}\t{}",
            resolved.brand,
            resolved.model,
            resolved.confidence,
            resolved.source,
            resolved.input.text
        );
    }

    Ok(())
}
