//! `folio init`: write a default config file.

use folio_config::AppConfig;

pub async fn run(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("Folio setup");
    println!("===========\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("  Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() && !force {
        println!("  Config file exists: {} (use --force to overwrite)", config_path.display());
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("  Wrote default config: {}", config_path.display());
    }

    println!();
    println!("  Next steps:");
    println!("    1. Set an API key: GEMINI_API_KEY, OPENAI_API_KEY, or FOLIO_API_KEY");
    println!("    2. Load demo data:  folio seed");
    println!("    3. Ask something:   folio chat --user alice -m \"What's my book status?\"");

    Ok(())
}
