//! `quarry ask`: answer one question.

use super::setup;
use std::path::Path;

pub async fn run(
    config_path: Option<&Path>,
    question: String,
    max_steps: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = setup::load_config(config_path)?;
    let agent = setup::build_agent(&config, max_steps).await?;

    let outcome = agent.run(&question).await;
    println!("{}", outcome.answer);
    if !outcome.succeeded() {
        tracing::warn!(state = %outcome.state, steps = outcome.steps, "No final answer");
    }
    Ok(())
}
