use clap::Subcommand;
use uuid::Uuid;

use operis_api::endpoints::templates;
use operis_core::domain::template::{ProjectTemplate, TemplateId};
use operis_core::domain::user::Role;

use super::{api_failure, build_context, require_role, CommandResult, GlobalArgs};

#[derive(Debug, Subcommand)]
pub enum TemplatesCommand {
    #[command(about = "List project templates")]
    List,
    #[command(about = "Show one template")]
    Show { id: Uuid },
    #[command(about = "Create a template from a structured TOML file")]
    Create {
        #[arg(long)]
        file: std::path::PathBuf,
    },
    #[command(about = "Replace a template from a structured TOML file")]
    Update {
        id: Uuid,
        #[arg(long)]
        file: std::path::PathBuf,
    },
    #[command(about = "Delete a template")]
    Delete { id: Uuid },
}

fn read_template(path: &std::path::Path) -> Result<ProjectTemplate, CommandResult> {
    let raw = std::fs::read_to_string(path).map_err(|error| {
        CommandResult::failure(
            "templates",
            "input",
            format!("could not read {}: {error}", path.display()),
            2,
        )
    })?;

    // Parse and validate up front; a malformed template is reported,
    // never silently ignored.
    let template: ProjectTemplate = toml::from_str(&raw).map_err(|error| {
        CommandResult::failure(
            "templates",
            "input",
            format!("invalid template file: {error}"),
            2,
        )
    })?;
    template.validate().map_err(|error| {
        CommandResult::failure("templates", "validation", error.to_string(), 2)
    })?;
    Ok(template)
}

fn render(template: &ProjectTemplate) -> String {
    let mut lines = vec![
        format!("{} ({})", template.name, template.id),
        format!(
            "category: {} · active: {}",
            template.category.as_deref().unwrap_or("-"),
            template.is_active
        ),
    ];
    if let Some(description) = &template.description {
        lines.push(description.clone());
    }
    for phase in &template.phases {
        lines.push(format!("phase: {} · {} day(s) · {}", phase.name, phase.days, phase.amount));
    }
    for slot in &template.team {
        lines.push(format!("team: {} x{}", slot.role, slot.headcount));
    }
    lines.join("\n")
}

pub async fn run(globals: &GlobalArgs, command: TemplatesCommand) -> CommandResult {
    let context = match build_context(globals, "templates") {
        Ok(context) => context,
        Err(failure) => return failure,
    };
    if let Err(failure) = require_role(&context.client, &[Role::Admin], "templates") {
        return failure;
    }

    match command {
        TemplatesCommand::List => match templates::list(&context.client).await {
            Ok(template_list) => {
                let mut lines = vec![format!("{} template(s)", template_list.len())];
                for template in template_list {
                    lines.push(format!(
                        "- {} [{}] {} phase(s)",
                        template.name,
                        template.category.as_deref().unwrap_or("-"),
                        template.phases.len()
                    ));
                }
                CommandResult::listing(lines.join("\n"))
            }
            Err(error) => api_failure("templates", error),
        },
        TemplatesCommand::Show { id } => {
            match templates::get(&context.client, TemplateId(id)).await {
                Ok(template) => CommandResult::listing(render(&template)),
                Err(error) => api_failure("templates", error),
            }
        }
        TemplatesCommand::Create { file } => {
            let template = match read_template(&file) {
                Ok(template) => template,
                Err(failure) => return failure,
            };
            match templates::create(&context.client, &template).await {
                Ok(created) => CommandResult::success(
                    "templates",
                    format!("created template {} ({})", created.name, created.id),
                ),
                Err(error) => api_failure("templates", error),
            }
        }
        TemplatesCommand::Update { id, file } => {
            let template = match read_template(&file) {
                Ok(template) => template,
                Err(failure) => return failure,
            };
            match templates::update(&context.client, TemplateId(id), &template).await {
                Ok(updated) => CommandResult::success(
                    "templates",
                    format!("updated template {}", updated.name),
                ),
                Err(error) => api_failure("templates", error),
            }
        }
        TemplatesCommand::Delete { id } => {
            match templates::delete(&context.client, TemplateId(id)).await {
                Ok(()) => CommandResult::success("templates", format!("deleted {id}")),
                Err(error) => api_failure("templates", error),
            }
        }
    }
}
