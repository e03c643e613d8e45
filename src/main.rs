use std::sync::{Arc, Mutex};

use agent_chat::logging::init_tracing;
use agent_chat::{
    lock_unpoisoned, AgentChatClient, AgentStep, ChatSession, ConversationStore, EnvConfig,
    ExecutionMode, StepStatus, TurnOptions, TurnOutcome, TurnState,
};
use agent_stream::{all_tool_ids, is_known_tool};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use conversation_store::{Role, Settings};

#[derive(Debug, Parser)]
#[command(name = "agent-chat", version, about = "Chat with a multi-step agent backend")]
struct Cli {
    /// Log debug output to stderr (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start a new conversation and make it current.
    New,
    /// List conversations, newest first.
    List,
    /// Print a conversation's messages with their agent steps.
    Show {
        /// Defaults to the current conversation.
        id: Option<String>,
    },
    /// Send a prompt and stream the agent's work.
    Send {
        prompt: String,
        /// Target conversation; defaults to the current one, or a new one.
        #[arg(short, long)]
        conversation: Option<String>,
        #[arg(short, long, value_enum, default_value_t = ModeArg::Agent)]
        mode: ModeArg,
        /// Enable only these tools (repeatable). Defaults to every known tool.
        #[arg(short, long = "tool")]
        tools: Vec<String>,
    },
    /// Delete one conversation.
    Delete { id: String },
    /// Delete every conversation.
    DeleteAll,
    /// Show or change backend settings.
    Settings {
        #[arg(long)]
        backend: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long, env = "AGENT_CHAT_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },
    /// Switch between the dark and light theme.
    Theme,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Agent,
    Crew,
}

impl From<ModeArg> for ExecutionMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Agent => ExecutionMode::Agent,
            ModeArg::Crew => ExecutionMode::Crew,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = EnvConfig::from_env()?;
    let store = ConversationStore::load(&config.state_path);
    let store = Arc::new(Mutex::new(store));

    match cli.command {
        Command::New => {
            let mut store = lock_unpoisoned(&store);
            let id = store.new_conversation();
            save(&store)?;
            println!("{id}");
        }
        Command::List => list_conversations(&lock_unpoisoned(&store)),
        Command::Show { id } => show_conversation(&lock_unpoisoned(&store), id.as_deref())?,
        Command::Send {
            prompt,
            conversation,
            mode,
            tools,
        } => {
            let conversation_id = resolve_conversation(&store, conversation)?;
            let options = TurnOptions {
                mode: mode.into(),
                enabled_tools: if tools.is_empty() {
                    all_tool_ids()
                } else {
                    tools
                },
            };
            for tool in options.enabled_tools.iter().filter(|tool| !is_known_tool(tool)) {
                tracing::warn!(tool = %tool, "sending unknown tool id");
            }

            let client = AgentChatClient::new(config.api_config())?;
            let session = Arc::new(ChatSession::new(client, Arc::clone(&store)));
            let outcome = send_with_interrupt(&session, &conversation_id, &prompt, options).await?;
            print_outcome(&outcome);
            if let TurnState::Errored(message) = &outcome.state {
                bail!("turn failed: {message}");
            }
        }
        Command::Delete { id } => {
            let mut store = lock_unpoisoned(&store);
            if !store.delete_conversation(&id) {
                bail!("no conversation with id '{id}'");
            }
            save(&store)?;
        }
        Command::DeleteAll => {
            let mut store = lock_unpoisoned(&store);
            store.delete_all();
            save(&store)?;
        }
        Command::Settings {
            backend,
            model,
            api_key,
        } => {
            let mut store = lock_unpoisoned(&store);
            let current = store.settings().clone();
            let changed = backend.is_some() || model.is_some() || api_key.is_some();
            let settings = Settings {
                backend: backend.unwrap_or(current.backend),
                model: model.or(current.model),
                api_key: api_key.unwrap_or(current.api_key),
            };
            if changed {
                store.update_settings(settings);
                save(&store)?;
            }
            print_settings(store.settings());
        }
        Command::Theme => {
            let mut store = lock_unpoisoned(&store);
            let theme = store.toggle_theme();
            save(&store)?;
            println!("{theme:?}");
        }
    }

    Ok(())
}

/// Run the turn while Ctrl-C cancels it instead of killing the process, so
/// the partial reply is kept.
async fn send_with_interrupt(
    session: &Arc<ChatSession>,
    conversation_id: &str,
    prompt: &str,
    options: TurnOptions,
) -> Result<TurnOutcome> {
    let interrupt = tokio::spawn({
        let session = Arc::clone(session);
        let conversation_id = conversation_id.to_string();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                session.cancel(&conversation_id);
            }
        }
    });

    let outcome = session
        .send_message(conversation_id, prompt, options)
        .await;
    interrupt.abort();
    Ok(outcome?)
}

fn resolve_conversation(
    store: &Arc<Mutex<ConversationStore>>,
    requested: Option<String>,
) -> Result<String> {
    let mut store = lock_unpoisoned(store);
    let id = match requested {
        Some(id) => {
            store
                .select(&id)
                .with_context(|| format!("cannot send to conversation '{id}'"))?;
            id
        }
        None => {
            let current = store
                .current_conversation()
                .map(|conversation| conversation.id.clone());
            match current {
                Some(id) => id,
                None => store.new_conversation(),
            }
        }
    };
    save(&store)?;
    Ok(id)
}

fn list_conversations(store: &ConversationStore) {
    let current = store.state().current_conversation_id.as_deref();
    for conversation in store.sorted_conversations() {
        let marker = if Some(conversation.id.as_str()) == current {
            "*"
        } else {
            " "
        };
        println!(
            "{marker} {}  {}  ({} messages)",
            conversation.id,
            conversation.title,
            conversation.messages.len()
        );
    }
}

fn show_conversation(store: &ConversationStore, id: Option<&str>) -> Result<()> {
    let conversation = match id {
        Some(id) => store.conversation(id),
        None => store.current_conversation(),
    }
    .context("no such conversation")?;

    println!("# {}", conversation.title);
    for message in &conversation.messages {
        match message.role {
            Role::User => println!("\n> {}", message.content),
            Role::Assistant => {
                print_steps(&message.steps);
                println!("\n{}", message.content);
                print_sources(&message.sources);
            }
        }
    }
    Ok(())
}

fn print_outcome(outcome: &TurnOutcome) {
    print_steps(outcome.run.steps());
    match &outcome.state {
        TurnState::Completed => println!("\n{}", outcome.run.final_reply()),
        TurnState::Aborted => println!("\n(cancelled)"),
        TurnState::Errored(message) => println!("\n**Error:** {message}"),
        TurnState::Idle | TurnState::Sending | TurnState::Streaming => {}
    }
    print_sources(outcome.run.sources());
    if outcome.skipped_records > 0 {
        eprintln!("skipped {} malformed stream record(s)", outcome.skipped_records);
    }
}

fn print_steps(steps: &[AgentStep]) {
    for step in steps {
        let tool = step.tool.as_deref().unwrap_or("?");
        let marker = match step.status {
            StepStatus::Running => "…",
            StepStatus::Completed => "✓",
            StepStatus::Error => "✗",
        };
        println!("  {marker} [{}] {tool}", step.id);
        if let Some(error) = &step.error {
            println!("      {error}");
        }
    }
}

fn print_sources(sources: &[String]) {
    if sources.is_empty() {
        return;
    }
    println!("\nSources:");
    for source in sources {
        println!("  {source}");
    }
}

fn print_settings(settings: &Settings) {
    println!("backend: {}", settings.backend);
    println!("model:   {}", settings.model.as_deref().unwrap_or("(default)"));
    let key = if settings.api_key.is_empty() {
        "(unset)"
    } else {
        "(set)"
    };
    println!("api key: {key}");
}

fn save(store: &ConversationStore) -> Result<()> {
    store.save().context("failed to save chat state")
}
