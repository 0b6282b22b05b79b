//! `intellicore status`: Show system status.

use intellicore_config::AppConfig;
use intellicore_core::checkpoint::CheckpointStore;
use intellicore_core::knowledge::VectorIndex;

use super::runtime;

pub async fn run() -> anyhow::Result<()> {
    let config = runtime::load_config()?;

    println!("🔬 IntelliCore Status");
    println!("====================");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Data dir:     {}", config.data_dir().display());
    println!("  Endpoint:     {}", config.base_url);
    println!("  Model:        {}", config.default_model);
    println!("  Embeddings:   {}", config.embedding_model);
    println!("  Temperature:  {}", config.temperature);
    println!("  API key:      {}", if config.has_api_key() { "set" } else { "missing" });
    println!(
        "  Research:     max {} iterations, on failure: {:?}",
        config.research.max_iterations, config.research.on_failure
    );

    println!("\n  Tools:");
    println!(
        "    search:          {}",
        if config.search.is_configured() { "configured" } else { "not configured" }
    );
    println!(
        "    knowledge_base:  {}",
        if config.has_api_key() { "available" } else { "no embedding backend" }
    );
    if config.research.calculator {
        println!("    calculator:      enabled");
    }

    let index = runtime::open_index(&config);
    match index.len().await {
        Ok(n) => println!("\n  Knowledge base: {n} chunks in '{}'", config.knowledge_base.collection),
        Err(e) => println!("\n  Knowledge base: unreadable ({e})"),
    }

    println!(
        "  Checkpoints:    {:?} at {}",
        config.checkpoint.backend,
        config.checkpoint_path().display()
    );
    match runtime::open_store(&config).await {
        Ok(store) => match store.list_sessions().await {
            Ok(sessions) if sessions.is_empty() => println!("    (no sessions)"),
            Ok(sessions) => {
                for session in sessions {
                    println!("    - {session}");
                }
            }
            Err(e) => println!("    unreadable ({e})"),
        },
        Err(e) => println!("    unavailable ({e:#})"),
    }

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file — run `intellicore onboard` first");
    }

    Ok(())
}
