pub mod chat;
pub mod faq;
pub mod init;
pub mod seed;
pub mod status;

use folio_config::AppConfig;

pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    AppConfig::load().map_err(|e| format!("Failed to load config: {e}").into())
}
