//! `quarry run`: answer a list of tasks against the loaded dataset.

use super::setup;
use std::path::Path;

pub async fn run(
    config_path: Option<&Path>,
    tasks: Vec<String>,
    max_steps: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = setup::load_config(config_path)?;
    let tasks = if tasks.is_empty() {
        config.tasks.clone()
    } else {
        tasks
    };
    if tasks.is_empty() {
        return Err("No tasks given and none configured.".into());
    }

    let agent = setup::build_agent(&config, max_steps).await?;

    let total = tasks.len();
    for (i, task) in tasks.iter().enumerate() {
        println!("\n=== Task {}/{}: {} ===", i + 1, total, task);
        let outcome = agent.run(task).await;
        println!("{}", outcome.answer);
        tracing::info!(
            state = %outcome.state,
            steps = outcome.steps,
            tool_calls = outcome.tool_calls,
            "Task {} finished",
            i + 1
        );
    }
    Ok(())
}
