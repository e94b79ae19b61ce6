use operis_api::endpoints::{projects, proposals, services, templates, users};
use operis_api::workflow::payment_stage;
use operis_core::domain::user::Role;

use super::{api_failure, build_context, require_role, CliContext, CommandResult, GlobalArgs};

/// Role-routed landing summary: the command-line rendition of the four
/// role dashboards.
pub async fn run(globals: &GlobalArgs) -> CommandResult {
    let context = match build_context(globals, "dashboard") {
        Ok(context) => context,
        Err(failure) => return failure,
    };
    let profile = match require_role(&context.client, &[], "dashboard") {
        Ok(profile) => profile,
        Err(failure) => return failure,
    };

    let mut lines = vec![format!(
        "{} · {} ({})",
        profile.role.dashboard(),
        profile.full_name,
        profile.role
    )];

    let body = match profile.role {
        Role::Admin => admin_summary(&context).await,
        Role::Sales => sales_summary(&context).await,
        Role::Developer => developer_summary(&context).await,
        Role::Customer => customer_summary(&context).await,
    };

    match body {
        Ok(mut section) => {
            lines.append(&mut section);
            CommandResult::listing(lines.join("\n"))
        }
        Err(error) => api_failure("dashboard", error),
    }
}

async fn admin_summary(
    context: &CliContext,
) -> Result<Vec<String>, operis_api::error::ApiError> {
    let accounts = users::list(&context.client, None).await?;
    let catalog = services::list(&context.client).await?;
    let requests = services::list_requests(&context.client).await?;
    let template_list = templates::list(&context.client).await?;

    Ok(vec![
        format!("accounts: {}", accounts.len()),
        format!(
            "services: {} ({} active)",
            catalog.len(),
            catalog.iter().filter(|service| service.is_active).count()
        ),
        format!("open service requests: {}", requests.len()),
        format!("project templates: {}", template_list.len()),
    ])
}

async fn sales_summary(
    context: &CliContext,
) -> Result<Vec<String>, operis_api::error::ApiError> {
    let project_list = projects::list(&context.client).await?;
    let mut lines = vec![format!("projects: {}", project_list.len())];

    for project in project_list.iter().take(10) {
        let latest = proposals::list(&context.client, project.id).await?.into_iter().next();
        let proposal_state = match &latest {
            Some(proposal) => {
                format!("{:?} · {}", proposal.status, payment_stage(proposal))
            }
            None => "no proposal yet".to_string(),
        };
        lines.push(format!("- {} [{:?}] · {proposal_state}", project.name, project.status));
    }
    Ok(lines)
}

async fn developer_summary(
    context: &CliContext,
) -> Result<Vec<String>, operis_api::error::ApiError> {
    let project_list = projects::list(&context.client).await?;
    let mut lines = vec![format!("assigned projects: {}", project_list.len())];

    for project in project_list.iter().take(10) {
        let unread = projects::unread_count(&context.client, project.id).await.unwrap_or(0);
        lines.push(format!(
            "- {} [{:?}] · {unread} unread message(s)",
            project.name, project.status
        ));
    }
    Ok(lines)
}

async fn customer_summary(
    context: &CliContext,
) -> Result<Vec<String>, operis_api::error::ApiError> {
    let project_list = projects::list(&context.client).await?;
    let mut lines = vec![format!("your projects: {}", project_list.len())];

    for project in project_list.iter().take(10) {
        let latest = proposals::list(&context.client, project.id).await?.into_iter().next();
        let line = match &latest {
            Some(proposal) => format!(
                "- {} · proposal {:?}, approvals {}/5, {}",
                project.name,
                proposal.status,
                proposal.customer_approvals.approved_count(),
                payment_stage(proposal)
            ),
            None => format!("- {} · waiting for the sales proposal", project.name),
        };
        lines.push(line);
    }
    Ok(lines)
}
