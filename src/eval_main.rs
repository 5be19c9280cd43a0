use std::sync::Arc;

use rag_chatbot::core::config::AppPaths;
use rag_chatbot::core::logging;
use rag_chatbot::eval::EvaluationHarness;
use rag_chatbot::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    logging::init(&paths, "eval.log");
    let state = AppState::initialize(paths).await?;

    let settings = &state.settings.evaluation;
    let harness = EvaluationHarness::new(&state.pipeline, settings.concurrency);
    let report = harness.run(settings).await?;

    tracing::info!(
        bleu = report.answers.bleu,
        rouge_l = report.answers.rouge_l,
        ndcg = report.retrieval.ndcg,
        hit_rate = report.retrieval.hit_rate,
        mrr = report.retrieval.mrr,
        "evaluation finished"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
