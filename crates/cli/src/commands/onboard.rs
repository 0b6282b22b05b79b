//! `intellicore onboard`: First-time setup.

use anyhow::Context;
use intellicore_config::AppConfig;

pub async fn run() -> anyhow::Result<()> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");
    let knowledge_dir = config_dir.join("knowledge");

    println!("🔬 IntelliCore — First-Time Setup");
    println!("=================================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create {}", config_dir.display()))?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if !knowledge_dir.exists() {
        std::fs::create_dir_all(&knowledge_dir)
            .with_context(|| format!("Failed to create {}", knowledge_dir.display()))?;
        println!("✅ Created knowledge directory: {}", knowledge_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        println!("✅ Created config.toml at: {}", config_path.display());
        println!("\n📝 Next steps:");
        println!("   1. Edit {} and add your API key", config_path.display());
        println!("   2. Optionally add google_api_key and google_cse_id under [search]");
        println!("   3. Run: intellicore ingest ./docs");
        println!("   4. Run: intellicore run \"Research ...\"\n");
    }

    println!("🎉 Setup complete!\n");
    Ok(())
}
