pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::{CommandResult, GlobalArgs};

#[derive(Debug, Parser)]
#[command(
    name = "operis",
    about = "Operis management portal client",
    long_about = "Role-based command-line client for the Operis portal: proposals, \
                  payments, projects, chat, and the service catalog.",
    after_help = "Examples:\n  operis login --email sale@operis.vn --password ...\n  operis dashboard\n  operis proposal approve <project> deposit\n  operis chat watch <project>"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to operis.toml")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override the API base URL")]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Create a new customer account")]
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        full_name: String,
    },
    #[command(about = "Log in and store the session")]
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    #[command(about = "Clear the stored session")]
    Logout,
    #[command(about = "Show the cached profile")]
    Whoami,
    #[command(about = "Role-routed landing summary")]
    Dashboard,
    #[command(about = "Account administration (admin)")]
    Users {
        #[command(subcommand)]
        command: commands::users::UsersCommand,
    },
    #[command(about = "Project template administration (admin)")]
    Templates {
        #[command(subcommand)]
        command: commands::templates::TemplatesCommand,
    },
    #[command(about = "Service catalog and service requests")]
    Services {
        #[command(subcommand)]
        command: commands::services::ServicesCommand,
    },
    #[command(about = "Proposal negotiation and payments")]
    Proposal {
        #[command(subcommand)]
        command: commands::proposal::ProposalCommand,
    },
    #[command(about = "Project chat")]
    Chat {
        #[command(subcommand)]
        command: commands::chat::ChatCommand,
    },
    #[command(about = "Show the effective configuration")]
    Config,
    #[command(about = "Run readiness checks: config, session, API reachability")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let globals = GlobalArgs { config_path: cli.config.clone(), api_url: cli.api_url.clone() };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("failed to initialize async runtime: {error}");
            return ExitCode::from(2);
        }
    };

    let result: CommandResult = runtime.block_on(async {
        match cli.command {
            Command::Register { email, password, full_name } => {
                commands::auth::register(&globals, &email, &password, &full_name).await
            }
            Command::Login { email, password } => {
                commands::auth::login(&globals, &email, &password).await
            }
            Command::Logout => commands::auth::logout(&globals),
            Command::Whoami => commands::auth::whoami(&globals),
            Command::Dashboard => commands::dashboard::run(&globals).await,
            Command::Users { command } => commands::users::run(&globals, command).await,
            Command::Templates { command } => commands::templates::run(&globals, command).await,
            Command::Services { command } => commands::services::run(&globals, command).await,
            Command::Proposal { command } => commands::proposal::run(&globals, command).await,
            Command::Chat { command } => commands::chat::run(&globals, command).await,
            Command::Config => commands::config::run(&globals),
            Command::Doctor { json } => commands::doctor::run(&globals, json).await,
        }
    });

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
