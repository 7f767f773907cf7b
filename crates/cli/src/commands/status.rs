//! `folio status`: configuration summary and component health.

use folio_agent::{Assistant, ComponentHealth, HealthStatus, Runtime};
use folio_config::AppConfig;

use super::load_config;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;

    println!("Folio status");
    println!("============");
    println!("  Config dir:      {}", AppConfig::config_dir().display());
    println!("  Database:        {}", config.database_path().display());
    println!("  Provider:        {}", config.default_provider);
    println!("  Model:           {}", config.model_for(&config.default_provider));
    println!("  Embeddings:      {} / {}", config.embedding_provider(), config.search.embedding_model);
    println!("  Min similarity:  {}", config.search.min_similarity);
    println!("  Top k:           {}", config.search.top_k);
    println!("  Max iterations:  {} (reduced {})", config.agent.max_iterations, config.agent.reduced_max_iterations);
    println!("  Memory:          {}", config.memory.backend);
    println!("  Records:         {}", config.records.backend);

    let runtime = Runtime::from_config(&config).await?;
    let assistant = Assistant::new(runtime);
    let report = assistant.health().await;

    println!();
    println!("  Health: {}", match report.status {
        HealthStatus::Healthy => "healthy",
        HealthStatus::Degraded => "degraded",
    });
    print_component("provider", &report.provider);
    print_component("faq index", &report.index);
    print_component("records", &report.records);
    print_component("memory", &report.memory);

    assistant.runtime().shutdown().await;
    Ok(())
}

fn print_component(label: &str, health: &ComponentHealth) {
    let mark = if health.healthy { "ok  " } else { "DOWN" };
    match &health.detail {
        Some(detail) => println!("    [{mark}] {label:<10} {} ({detail})", health.backend),
        None => println!("    [{mark}] {label:<10} {}", health.backend),
    }
}
