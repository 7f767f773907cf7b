//! `folio chat`: interactive or single-message chat.

use folio_agent::{Assistant, ChatRequest, ChatResponse, Runtime};
use folio_core::error::Error;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use super::load_config;

pub struct ChatOptions {
    pub user: Option<String>,
    pub verbose_trace: bool,
    pub json: bool,
}

pub async fn run(
    message: Option<String>,
    options: ChatOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let runtime = Runtime::from_config(&config).await?;
    let assistant = Assistant::new(runtime);
    let user = options.user.as_deref();
    debug!(user = user.unwrap_or("anonymous"), single = message.is_some(), "Starting chat");

    if let Some(msg) = message {
        let request = ChatRequest::new(msg).verbose(options.verbose_trace);
        let response = assistant.chat(user, request).await?;
        print_response(&response, &options)?;
    } else {
        println!();
        println!("  Folio: interactive mode");
        println!("  -----------------------");
        println!("  Signed in as: {}", user.unwrap_or("anonymous"));
        println!("  Model:        {}", assistant.runtime().settings.model);
        println!("  Type your question and press Enter. Type 'exit' to quit.");
        println!();

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        prompt()?;

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if matches!(line, "exit" | "quit") {
                break;
            }
            if line.is_empty() {
                prompt()?;
                continue;
            }

            let request = ChatRequest::new(line).verbose(options.verbose_trace);
            match assistant.chat(user, request).await {
                Ok(response) => print_response(&response, &options)?,
                Err(Error::InvalidQuery(reason)) => eprintln!("  [Invalid] {reason}"),
                Err(e) => eprintln!("  [Error] {e}"),
            }
            prompt()?;
        }

        println!();
        println!("  Goodbye!");
    }

    assistant.runtime().shutdown().await;
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}

fn print_response(
    response: &ChatResponse,
    options: &ChatOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    if options.json {
        println!("{}", serde_json::to_string_pretty(response)?);
        return Ok(());
    }

    println!();
    for line in response.answer.lines() {
        println!("  Assistant > {line}");
    }

    if let Some(steps) = &response.reasoning_steps {
        println!();
        println!("  Reasoning ({} tool calls):", steps.len());
        for (i, step) in steps.iter().enumerate() {
            println!("    {}. {} {}", i + 1, step.tool, step.input);
            for line in step.output.lines() {
                println!("       | {line}");
            }
        }
    }
    println!();
    Ok(())
}
