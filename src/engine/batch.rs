//! Batch driver for evaluation datasets.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::domain::{BatchItem, BatchMetrics, PromptRecord};
use crate::engine::Pipeline;
use crate::error::WrapperResult;

/// Load a JSONL prompt dataset, skipping lines that fail to parse.
pub fn load_prompts(path: &Path) -> WrapperResult<Vec<PromptRecord>> {
    let file = fs::File::open(path)?;
    let mut prompts = Vec::new();

    for (idx, line) in BufReader::new(file).split(b'\n').enumerate() {
        let line = line?;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match serde_json::from_slice::<PromptRecord>(&line) {
            Ok(record) => prompts.push(record),
            Err(e) => tracing::warn!(
                path = %path.display(),
                line = idx + 1,
                error = %e,
                "Skipping malformed prompt record"
            ),
        }
    }

    Ok(prompts)
}

/// Run every prompt through `pipeline`, one after another.
///
/// Stops at the first run that fails.
pub fn run_batch(pipeline: &Pipeline, prompts: &[PromptRecord]) -> WrapperResult<Vec<BatchItem>> {
    let mut items = Vec::with_capacity(prompts.len());

    for record in prompts {
        let outcome = pipeline.run(&record.text)?;
        items.push(BatchItem {
            prompt: record.text.clone(),
            category: record.category.clone(),
            final_output: outcome.final_output,
            calls: outcome.call_count,
        });
    }

    tracing::info!(
        prompts = items.len(),
        policy = pipeline.policy().name(),
        "Batch complete"
    );

    Ok(items)
}

/// Summarise batch results against the pipeline's own refusal and keywords.
pub fn batch_metrics(pipeline: &Pipeline, items: &[BatchItem]) -> BatchMetrics {
    BatchMetrics::compute(items, pipeline.safe_refusal(), pipeline.banned_keywords())
}
