//! `folio seed`: load the demo authors' records and the FAQ passages.

use folio_agent::seed::{DEMO_FAQS, demo_records, seed_faqs};
use folio_memory::{SimilarityIndex, SqliteDatabase};
use std::sync::Arc;

use super::load_config;

pub async fn run(skip_faqs: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;

    if config.records.backend != "sqlite" || config.search.store != "sqlite" {
        println!(
            "  Note: records backend is '{}' and FAQ store is '{}'; only SQLite data outlives this command.",
            config.records.backend, config.search.store
        );
    }

    let path = config.database_path();
    let db = SqliteDatabase::open(&path).await?;
    println!("Seeding {}", path.display());

    let records = db.records();
    let demo = demo_records();
    for record in &demo {
        records.upsert(record).await?;
        println!("  + {} record for {}", record.record_type, record.owner_id);
    }
    println!("  {} records loaded", demo.len());

    if skip_faqs {
        println!("  Skipped FAQ passages");
    } else {
        let router = folio_providers::build_from_config(&config)?;
        let embedder = router.embedder(&config.search.embedding_model)?;
        let index = SimilarityIndex::new(Arc::new(embedder), Arc::new(db.vectors()))
            .with_partition(&config.search.partition);

        let count = seed_faqs(&index).await?;
        println!("  {count} FAQ passages indexed:");
        for entry in DEMO_FAQS {
            println!("    - {} ({})", entry.id, entry.topic);
        }
        println!("  {} passages now in '{}'", index.count().await, index.partition());
    }

    db.close().await;
    println!("Done. Try: folio chat --user alice -m \"What's my book status?\"");
    Ok(())
}
