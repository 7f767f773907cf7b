//! `folio faq`: manage and query the shared FAQ index.

use folio_agent::Runtime;

use super::load_config;

async fn runtime() -> Result<Runtime, Box<dyn std::error::Error>> {
    let config = load_config()?;
    Ok(Runtime::from_config(&config).await?)
}

pub async fn index(
    text: &str,
    id: Option<String>,
    topic: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = runtime().await?;
    let extra = topic.map(|t| {
        let mut map = serde_json::Map::new();
        map.insert("topic".into(), t.into());
        map
    });

    let id = runtime.toolkit.index.index(text, id, extra).await?;
    println!("Indexed passage {id}");
    runtime.shutdown().await;
    Ok(())
}

pub async fn search(
    query: &str,
    top_k: Option<usize>,
    min_similarity: Option<f32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = runtime().await?;
    let defaults = runtime.settings.search;
    let top_k = top_k.unwrap_or(defaults.top_k);
    let min_similarity = min_similarity.unwrap_or(defaults.min_similarity);

    let outcome = runtime
        .toolkit
        .index
        .search(query, top_k, min_similarity)
        .await;

    println!("Search: \"{query}\" (top_k={top_k}, min_similarity={min_similarity})");
    if let Some(error) = &outcome.error {
        println!("  Search failed: {error}");
    } else {
        println!(
            "  {} of {} matches cleared the threshold",
            outcome.found_documents, outcome.total_matches
        );
        if let Some(message) = &outcome.message {
            println!("  {message}");
        }
        for (i, doc) in outcome.documents.iter().enumerate() {
            let preview: String = doc.text.chars().take(100).collect();
            println!("  {:>2}. [{:.3}] {} {}", i + 1, doc.similarity, doc.doc_id, preview);
        }
    }

    runtime.shutdown().await;
    Ok(())
}

pub async fn delete(id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = runtime().await?;
    if runtime.toolkit.index.delete(id).await {
        println!("Deleted passage {id}");
    } else {
        println!("No FAQ passage with id {id}");
    }
    runtime.shutdown().await;
    Ok(())
}

pub async fn count() -> Result<(), Box<dyn std::error::Error>> {
    let runtime = runtime().await?;
    println!(
        "{} passages in '{}'",
        runtime.toolkit.index.count().await,
        runtime.toolkit.index.partition()
    );
    runtime.shutdown().await;
    Ok(())
}

pub async fn clear() -> Result<(), Box<dyn std::error::Error>> {
    let runtime = runtime().await?;
    let removed = runtime.toolkit.index.clear().await?;
    println!(
        "Removed {removed} passages from '{}'",
        runtime.toolkit.index.partition()
    );
    runtime.shutdown().await;
    Ok(())
}
