//! `patentrag init` — First-time setup.

use patentrag_config::AppConfig;

pub fn run() -> anyhow::Result<()> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");
    let data_dir = AppConfig::data_dir();

    println!("PatentRAG — First-Time Setup");
    println!("============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)?;
        println!("Created data directory: {}", data_dir.display());
    }

    if config_path.exists() {
        println!("\nConfig already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run init.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("Created config.toml at: {}", config_path.display());
        println!("\nNext steps:");
        println!("   1. Set MISTRAL_API_KEY or edit {}", config_path.display());
        println!(
            "   2. Put your patent records at {}",
            AppConfig::default().data.records_path.display()
        );
        println!("   3. Run: patentrag index");
        println!("   4. Run: patentrag chat\n");
    }

    Ok(())
}
