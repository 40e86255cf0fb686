//! `unipath chat` — Talk to the counsellor from the terminal.
//!
//! History is kept for the session and resubmitted every turn, the same way
//! the dashboard's chat widget does.

use std::io::Write;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use unipath_agent::CounselAgent;
use unipath_config::AppConfig;
use unipath_core::domain::ChatTurn;
use unipath_core::event::EventBus;

pub async fn run(
    config: AppConfig,
    user_id: &str,
    provider: Option<&str>,
    message: Option<String>,
) -> anyhow::Result<()> {
    let provider_name = provider.unwrap_or(&config.default_provider);
    if !config.has_credentials_for(provider_name) {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    GOOGLE_API_KEY   = '...'   (Gemini, the default provider)");
        eprintln!("    OPENAI_API_KEY   = 'sk-...'");
        eprintln!("    UNIPATH_API_KEY  = '...'   (generic)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        anyhow::bail!("No API key found. See above for setup instructions.");
    }

    let store = super::open_store(&config).await?;
    let agent = CounselAgent::from_config_with_provider(
        &config,
        provider,
        store.clone(),
        Arc::new(EventBus::default()),
    )?;

    if store.get_profile(user_id).await?.is_none() {
        eprintln!("  ⚠️  No profile for '{user_id}'; the counsellor will see an empty profile.");
        eprintln!("     Run `unipath seed --demo-user {user_id}` to create one.");
    }

    if let Some(msg) = message {
        eprint!("  Thinking...");
        let reply = agent.respond(user_id, &[ChatTurn::user(msg)]).await?;
        eprint!("\r              \r");
        println!("{reply}");
        return Ok(());
    }

    println!();
    println!("  UniPath Counsellor — Interactive Mode");
    println!();
    println!("  Student:   {user_id}");
    println!("  Provider:  {}", agent.provider_name());
    println!("  Model:     {}", agent.model());
    println!("  Tools:     {}", agent.tools().names().join(", "));
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut history: Vec<ChatTurn> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    prompt()?;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            prompt()?;
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        history.push(ChatTurn::user(line));
        eprint!("  ...");

        match agent.respond_detailed(user_id, &history).await {
            Ok(outcome) => {
                eprint!("\r     \r");
                if !outcome.tools_executed.is_empty() {
                    println!("  [tools: {}]", outcome.tools_executed.join(" → "));
                }
                for line in outcome.reply.lines() {
                    println!("  Counsellor > {line}");
                }
                println!();
                history.push(ChatTurn::assistant(outcome.reply));
            }
            Err(e) => {
                eprint!("\r     \r");
                eprintln!("  [Error] {e}");
                println!();
                // Drop the unanswered turn so the next request still ends with a user message.
                history.pop();
            }
        }

        prompt()?;
    }

    println!();
    println!("  Goodbye! Good luck with your applications.");
    println!();
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}
