use clap::Subcommand;
use uuid::Uuid;

use operis_api::endpoints::users;
use operis_core::domain::user::{Role, UserId};

use super::{api_failure, build_context, require_role, CommandResult, GlobalArgs};

#[derive(Debug, Subcommand)]
pub enum UsersCommand {
    #[command(about = "List portal accounts, optionally filtered by a search term")]
    List {
        #[arg(long)]
        search: Option<String>,
    },
    #[command(about = "Show one account")]
    Show { id: Uuid },
    #[command(about = "Update an account's name, role, or active flag")]
    Update {
        id: Uuid,
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        active: Option<bool>,
    },
    #[command(about = "Delete an account")]
    Delete { id: Uuid },
}

pub async fn run(globals: &GlobalArgs, command: UsersCommand) -> CommandResult {
    let context = match build_context(globals, "users") {
        Ok(context) => context,
        Err(failure) => return failure,
    };
    if let Err(failure) = require_role(&context.client, &[Role::Admin], "users") {
        return failure;
    }

    match command {
        UsersCommand::List { search } => {
            match users::list(&context.client, search.as_deref()).await {
                Ok(accounts) => {
                    let mut lines = vec![format!("{} account(s)", accounts.len())];
                    for account in accounts {
                        lines.push(format!(
                            "- {} <{}> [{}]{}",
                            account.full_name,
                            account.email,
                            account.role,
                            if account.is_active { "" } else { " (inactive)" }
                        ));
                    }
                    CommandResult::listing(lines.join("\n"))
                }
                Err(error) => api_failure("users", error),
            }
        }
        UsersCommand::Show { id } => match users::get(&context.client, UserId(id)).await {
            Ok(account) => CommandResult::listing(format!(
                "{} <{}>\nrole: {}\nactive: {}",
                account.full_name, account.email, account.role, account.is_active
            )),
            Err(error) => api_failure("users", error),
        },
        UsersCommand::Update { id, full_name, role, active } => {
            let update = users::UserUpdate { full_name, role, is_active: active };
            match users::update(&context.client, UserId(id), &update).await {
                Ok(account) => CommandResult::success(
                    "users",
                    format!("updated {} ({})", account.full_name, account.role),
                ),
                Err(error) => api_failure("users", error),
            }
        }
        UsersCommand::Delete { id } => match users::delete(&context.client, UserId(id)).await {
            Ok(()) => CommandResult::success("users", format!("deleted {id}")),
            Err(error) => api_failure("users", error),
        },
    }
}
