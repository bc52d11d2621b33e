use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::{catalog::BrewingStyle, session_commands, timer::commands, AppState};

/// Guided tea brewing with multi-steep session tracking
#[derive(Parser, Debug)]
#[clap(version, about)]
pub struct Cli {
    /// directory holding settings and saved sessions
    #[clap(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// list the built-in teas and their brewing parameters
    Teas,

    /// brew a catalog tea with guided timers
    Brew {
        /// catalog id, e.g. `green` or `oolong-dark`
        tea: String,

        /// western or gongfu; defaults to the configured style
        #[clap(short, long)]
        style: Option<BrewingStyle>,
    },

    /// manage multi-steep sessions
    #[clap(subcommand)]
    Session(SessionCommand),
}

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// start a new session and make it active
    Create(CreateArgs),

    /// show saved sessions
    List,

    Delete { id: String },

    Pause { id: String },

    Resume { id: String },

    /// brew the session's current steep interactively
    Brew { id: String },
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    pub name: String,

    #[clap(short, long, default_value = "Oolong")]
    pub tea_type: String,

    #[clap(short = 'n', long, default_value_t = 5)]
    pub steeps: u32,

    /// per-steep seconds, comma separated; defaults to 10, 15, 20, ...
    #[clap(long, value_delimiter = ',')]
    pub steep_times: Vec<u32>,

    /// water temperature in °C
    #[clap(short = 'w', long, default_value_t = 95)]
    pub temperature: u32,

    #[clap(long)]
    pub no_mindfulness: bool,

    /// mindfulness theme; defaults to the configured theme
    #[clap(long)]
    pub theme: Option<String>,

    #[clap(long)]
    pub notes: Option<String>,
}

pub async fn dispatch(state: &AppState, command: Command) -> Result<()> {
    match command {
        Command::Teas => commands::list_teas(state),
        Command::Brew { tea, style } => commands::brew_tea(state, &tea, style).await,
        Command::Session(SessionCommand::Create(args)) => {
            session_commands::create_session(state, args).await
        }
        Command::Session(SessionCommand::List) => session_commands::list_sessions(state).await,
        Command::Session(SessionCommand::Delete { id }) => {
            session_commands::delete_session(state, &id).await
        }
        Command::Session(SessionCommand::Pause { id }) => {
            session_commands::pause_session(state, &id).await
        }
        Command::Session(SessionCommand::Resume { id }) => {
            session_commands::resume_session(state, &id).await
        }
        Command::Session(SessionCommand::Brew { id }) => commands::brew_session(state, &id).await,
    }
}
