use clap::Subcommand;
use uuid::Uuid;

use operis_api::endpoints::services;
use operis_core::domain::service::ServiceRequestId;
use operis_core::domain::user::Role;

use super::{api_failure, build_context, require_role, CommandResult, GlobalArgs};

#[derive(Debug, Subcommand)]
pub enum ServicesCommand {
    #[command(about = "List the service catalog")]
    List,
    #[command(about = "Show one catalog entry")]
    Show { slug: String },
    #[command(about = "Request a service (customer)")]
    Request {
        slug: String,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        budget: Option<rust_decimal::Decimal>,
    },
    #[command(about = "List service requests (admin/sales)")]
    Requests,
    #[command(about = "Update a service request's status (admin/sales)")]
    UpdateRequest {
        id: Uuid,
        #[arg(long)]
        status: String,
        #[arg(long)]
        notes: Option<String>,
    },
}

pub async fn run(globals: &GlobalArgs, command: ServicesCommand) -> CommandResult {
    let context = match build_context(globals, "services") {
        Ok(context) => context,
        Err(failure) => return failure,
    };

    match command {
        ServicesCommand::List => {
            if let Err(failure) = require_role(&context.client, &[], "services") {
                return failure;
            }
            match services::list(&context.client).await {
                Ok(catalog) => {
                    let mut lines = vec![format!("{} service(s)", catalog.len())];
                    for service in catalog {
                        lines.push(format!(
                            "- {} [{}]{}",
                            service.name,
                            service.slug,
                            if service.is_featured { " *featured*" } else { "" }
                        ));
                    }
                    CommandResult::listing(lines.join("\n"))
                }
                Err(error) => api_failure("services", error),
            }
        }
        ServicesCommand::Show { slug } => {
            if let Err(failure) = require_role(&context.client, &[], "services") {
                return failure;
            }
            match services::get(&context.client, &slug).await {
                Ok(service) => {
                    let mut lines = vec![format!("{} [{}]", service.name, service.slug)];
                    if let Some(short) = &service.short_description {
                        lines.push(short.clone());
                    }
                    if let (Some(min), Some(max)) =
                        (service.estimated_duration_min, service.estimated_duration_max)
                    {
                        lines.push(format!("duration: {min}-{max} day(s)"));
                    }
                    for feature in &service.key_features {
                        lines.push(format!("- {feature}"));
                    }
                    CommandResult::listing(lines.join("\n"))
                }
                Err(error) => api_failure("services", error),
            }
        }
        ServicesCommand::Request { slug, notes, budget } => {
            if let Err(failure) = require_role(&context.client, &[Role::Customer], "services") {
                return failure;
            }
            let draft = services::ServiceRequestDraft { service_slug: slug, notes, budget };
            match services::create_request(&context.client, &draft).await {
                Ok(request) => CommandResult::success(
                    "services",
                    format!("service request {} created", request.id),
                ),
                Err(error) => api_failure("services", error),
            }
        }
        ServicesCommand::Requests => {
            if let Err(failure) =
                require_role(&context.client, &[Role::Admin, Role::Sales], "services")
            {
                return failure;
            }
            match services::list_requests(&context.client).await {
                Ok(requests) => {
                    let mut lines = vec![format!("{} request(s)", requests.len())];
                    for request in requests {
                        lines.push(format!(
                            "- {} · {} · {}",
                            request.id,
                            request.service_name.as_deref().unwrap_or("unknown service"),
                            request.status.as_deref().unwrap_or("new")
                        ));
                    }
                    CommandResult::listing(lines.join("\n"))
                }
                Err(error) => api_failure("services", error),
            }
        }
        ServicesCommand::UpdateRequest { id, status, notes } => {
            if let Err(failure) =
                require_role(&context.client, &[Role::Admin, Role::Sales], "services")
            {
                return failure;
            }
            let update = services::ServiceRequestUpdate { status: Some(status), notes };
            match services::update_request(&context.client, ServiceRequestId(id), &update).await {
                Ok(request) => CommandResult::success(
                    "services",
                    format!(
                        "request {} is now {}",
                        request.id,
                        request.status.as_deref().unwrap_or("updated")
                    ),
                ),
                Err(error) => api_failure("services", error),
            }
        }
    }
}
