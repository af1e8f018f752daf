//! Asks a model about the weather and time in Tokyi, answers its tool calls
//! with mocked data and streams the final answer to stdout.

#[macro_use]
extern crate tracing;

use std::io::{self, Write as _};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tooldemo::{BuiltinTools, DemoConfig};
use tooldemo_core::{Conversation, DriverBuilder, RunOutcome, Stage};
use tooldemo_openai_model::OpenAIProvider;

const PROMPT: &str = "What's the weather and current time in Tokyi?";

const BAR_CHAR: &str = "▎";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let config = DemoConfig::from_env();
    if config.uses_fallback_api_key() {
        warn!("no API key configured, the gateway may reject requests");
    }
    debug!("{config:?}");
    let model_provider = OpenAIProvider::new(config.openai_config());

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")?
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    let progress_bar = ProgressBar::new_spinner();
    progress_bar.set_style(progress_style);
    progress_bar.enable_steady_tick(Duration::from_millis(100));

    let driver =
        DriverBuilder::with_model_provider(model_provider, BuiltinTools::new())
            .with_max_tokens(config.max_tokens)
            .with_followup_temperature(config.followup_temperature)
            .stream_first_response(config.stream_first_response)
            .on_stage({
                let progress_bar = progress_bar.clone();
                move |stage| match stage {
                    Stage::AwaitingFirstResponse => {
                        progress_bar.set_message("🤔 Thinking...");
                    }
                    Stage::Dispatching => {
                        progress_bar.set_message("🔧 Running tools...");
                    }
                    Stage::AwaitingFollowup => {
                        progress_bar.set_message("💬 Answering...");
                    }
                    Stage::Streaming | Stage::Done => {
                        progress_bar.finish_and_clear();
                    }
                    Stage::Start => {}
                }
            })
            .on_tool_call({
                let progress_bar = progress_bar.clone();
                move |tool_call, result| {
                    progress_bar.suspend(|| {
                        let bar = BAR_CHAR.bright_yellow();
                        let status = match result {
                            Ok(_) => "ok".bright_green().to_string(),
                            Err(err) => err.bright_red().to_string(),
                        };
                        eprintln!(
                            "{bar}🔧 {}{} {status}",
                            tool_call.name.bright_white().bold(),
                            tool_call.arguments.dimmed(),
                        );
                    });
                }
            })
            .build();

    let mut conversation = Conversation::with_user_message(PROMPT);
    let mut stdout = io::stdout().lock();
    let outcome = driver.run(&mut conversation, &mut stdout).await;
    progress_bar.finish_and_clear();

    match outcome? {
        RunOutcome::NoToolCalls { content } => {
            info!("the model answered without calling any tools");
            write!(stdout, "{content}")?;
        }
        RunOutcome::Answered { transcript } => {
            debug!("streamed {} bytes", transcript.len());
        }
    }
    writeln!(stdout)?;
    Ok(())
}
