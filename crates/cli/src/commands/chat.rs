//! `patentrag chat` — Interactive or single-message question answering.

use super::{build_encoder, load_config, require_api_key};
use anyhow::Context;
use patentrag_agent::{
    counter_for, ConversationState, Generator, LlmQueryRewriter, Orchestrator,
    OrchestratorSettings,
};
use patentrag_config::AppConfig;
use patentrag_providers::build_from_config;
use patentrag_retrieval::{ChunkIndex, Corpus, PassageRetriever};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

/// Load the corpus and index and wire the orchestrator over them.
fn build_orchestrator(config: &AppConfig) -> anyhow::Result<Orchestrator> {
    let router = build_from_config(config);
    let provider = router
        .default()
        .context("No default provider configured")?;

    let corpus = Arc::new(Corpus::load(&config.data.records_path).with_context(|| {
        format!(
            "Cannot load records from {}",
            config.data.records_path.display()
        )
    })?);
    let index = ChunkIndex::load(&config.data.index_path).with_context(|| {
        format!(
            "Cannot load the index from {}. Run `patentrag index` first",
            config.data.index_path.display()
        )
    })?;
    let (chunks, vectors) = index.into_parts()?;
    info!(
        records = corpus.len(),
        chunks = chunks.len(),
        "Corpus and index loaded"
    );

    let encoder = build_encoder(config, &router)?;
    let search = Arc::new(PassageRetriever::new(
        corpus.clone(),
        Arc::new(chunks),
        encoder,
        Arc::new(vectors),
    ));
    let generator = Generator::new(provider, &config.default_model);
    let rewriter = Arc::new(LlmQueryRewriter::new(generator.clone()));
    let counter = counter_for(&config.context.tokenizer)?;
    info!(
        model = generator.model(),
        tokenizer = %config.context.tokenizer,
        "Generator ready"
    );

    Ok(Orchestrator::new(
        corpus,
        search,
        generator,
        rewriter,
        counter,
        OrchestratorSettings::from_config(config),
    ))
}

pub async fn run(message: Option<String>) -> anyhow::Result<()> {
    let config = load_config()?;
    require_api_key(&config)?;

    let orchestrator = build_orchestrator(&config)?;
    let mut session = ConversationState::new(config.conversation.max_turns);

    if let Some(msg) = message {
        // Single message mode
        eprint!("  Thinking...");
        let answer = orchestrator.ask(&mut session, &msg).await;
        eprint!("\r              \r");
        println!("{}", answer?);
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        PatentRAG — Interactive Mode          ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", config.default_model);
    println!("  Encoder:   {} ({})", config.embedding.provider, config.embedding.model);
    println!("  Tokenizer: {}", config.context.tokenizer);
    println!("  Memory:    last {} exchanges", config.conversation.max_turns);
    println!();
    println!("  Type your question and press Enter.");
    println!("  Type 'reset' to forget the conversation, 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;

    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        match input {
            "" => {}
            "exit" | "quit" => break,
            "reset" => {
                session.clear();
                println!("  (conversation cleared)");
                println!();
            }
            question => {
                eprint!("  ...");
                match orchestrator.ask(&mut session, question).await {
                    Ok(answer) => {
                        eprint!("\r     \r");
                        println!();
                        for line in answer.lines() {
                            println!("  PatentRAG > {line}");
                        }
                        println!();
                    }
                    Err(e) => {
                        eprint!("\r     \r");
                        eprintln!("  [Error] {e}");
                        println!();
                    }
                }
            }
        }
        prompt()?;
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}
