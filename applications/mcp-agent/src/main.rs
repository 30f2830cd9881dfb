use futures::StreamExt;
use mcp_agent::{config::Config, llm, AgentOrchestrator, McpClient, Message};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they do not interleave with streamed answers
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mcp_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting mcp-agent");

    let config_path =
        std::env::var("APP_CONFIG").unwrap_or_else(|_| "config/config.yaml".to_string());
    let config = Config::load(&config_path)?;
    info!("Configuration loaded from: {}", config_path);

    let client = McpClient::new(
        &config.mcp.server_url,
        config.mcp.timeout(),
        config.mcp.health_timeout(),
    )?;
    let completion = llm::from_config(&config.llm)?;
    let agent = AgentOrchestrator::new(
        completion,
        Arc::new(client),
        config.agent.system_prompt.clone(),
    );

    if agent.validate_connection().await {
        info!("MCP server reachable at {}", config.mcp.server_url);
    } else {
        warn!(
            "MCP server at {} is not responding; answers will be given without tools",
            config.mcp.server_url
        );
    }

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut history: Vec<Message> = Vec::new();

    stdout
        .write_all(b"Ask about posts, comments or users. /reset clears history, /quit exits.\n")
        .await?;

    loop {
        stdout.write_all(b"\n> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        match input {
            "" => continue,
            "/quit" => break,
            "/reset" => {
                history.clear();
                info!("Conversation history cleared");
                continue;
            }
            _ => {}
        }

        let mut fragments = agent.stream_message(input, &history);
        let mut answer = String::new();
        let mut failed = false;

        while let Some(fragment) = fragments.next().await {
            failed |= fragment.starts_with(mcp_agent::agent::ERROR_FRAGMENT_PREFIX);
            stdout.write_all(fragment.as_bytes()).await?;
            stdout.flush().await?;
            answer.push_str(&fragment);
        }
        stdout.write_all(b"\n").await?;

        // A failed turn stays out of the context
        if !failed {
            history.push(Message::user(input));
            history.push(Message::assistant(answer));
        }
    }

    info!("Goodbye");
    Ok(())
}
