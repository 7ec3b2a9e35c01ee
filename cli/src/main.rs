use clap::{Parser, Subcommand};
use sous_cli::CliContext;
use sous_cli::commands;
use sous_cli::readline;
use std::io::Write;

#[tokio::main]
async fn main() -> Result<(), String> {
    sous_cli::logging::init();

    let session_id = std::env::var("SOUS_SESSION").unwrap_or_else(|_| "kitchen".to_string());
    let user = std::env::var("USER").unwrap_or_else(|_| "cook".to_string());
    let ctx = CliContext::new(session_id, user);
    commands::install_chime(&ctx);

    loop {
        let line = readline()?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match respond(line, &ctx) {
            Ok(quit) => {
                if quit {
                    break;
                }
            }
            Err(err) => {
                write!(std::io::stdout(), "{err}").map_err(|e| e.to_string())?;
                std::io::stdout().flush().map_err(|e| e.to_string())?;
            }
        }
    }

    Ok(())
}

#[derive(Parser)]
#[command(version, about = "sous kitchen timers")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a timer in the current session
    Add {
        id: String,
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        secs: i64,
    },
    /// Start an idle or paused timer
    Start { id: String },
    /// Pause a running timer
    Pause { id: String },
    /// Resume a paused timer
    Resume { id: String },
    /// Put a timer back to idle at its full duration
    Reset { id: String },
    /// Delete a timer
    Remove { id: String },
    /// Show all timers
    List,
    /// Toggle the completion chime for a timer
    Chime {
        id: String,
        #[arg(long)]
        off: bool,
    },
    /// Remove every timer in the current session
    ClearSession,
    Exit,
}

fn respond(line: &str, ctx: &CliContext) -> Result<bool, String> {
    let mut args = shlex::split(line).ok_or("error: Invalid quoting")?;
    args.insert(0, "sous".to_string());
    let cli = Cli::try_parse_from(args).map_err(|e| e.to_string())?;

    match &cli.command {
        Some(Commands::Add { id, name, secs }) => commands::add(ctx, id, name, *secs),
        Some(Commands::Start { id }) => commands::start(ctx, id),
        Some(Commands::Pause { id }) => commands::pause(ctx, id),
        Some(Commands::Resume { id }) => commands::resume(ctx, id),
        Some(Commands::Reset { id }) => commands::reset(ctx, id),
        Some(Commands::Remove { id }) => commands::remove(ctx, id),
        Some(Commands::List) => commands::list(ctx),
        Some(Commands::Chime { id, off }) => commands::chime(ctx, id, *off),
        Some(Commands::ClearSession) => commands::clear_session(ctx),
        Some(Commands::Exit) => {
            commands::exit(ctx);
            return Ok(true);
        }
        None => {}
    }

    Ok(false)
}
