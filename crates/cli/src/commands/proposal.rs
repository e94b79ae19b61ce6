use clap::Subcommand;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use operis_api::endpoints::proposals::ProposalDraft;
use operis_api::workflow::{payment_stage, ProposalWorkflow, SectionOutcome};
use operis_core::domain::project::ProjectId;
use operis_core::domain::proposal::{ApprovalSection, Deliverable, Phase, Proposal, TeamMember};
use operis_core::domain::user::Role;
use operis_core::workflow::qr::QrGenerator;

use super::{api_failure, build_context, require_role, CliContext, CommandResult, GlobalArgs};

#[derive(Debug, Subcommand)]
pub enum ProposalCommand {
    #[command(about = "Show the latest proposal for a project")]
    Show { project: Uuid },
    #[command(about = "Create or update the proposal from a structured TOML file (sales)")]
    Save {
        project: Uuid,
        #[arg(long, help = "TOML file with analysis, deposit, phases, team, commitments")]
        file: std::path::PathBuf,
    },
    #[command(about = "Send the draft proposal to the customer (sales)")]
    Send { project: Uuid },
    #[command(about = "Approve one checklist section (customer)")]
    Approve {
        project: Uuid,
        #[arg(value_parser = parse_section)]
        section: ApprovalSection,
    },
    #[command(about = "Accept the proposal outright (customer)")]
    Accept {
        project: Uuid,
        #[arg(long)]
        notes: Option<String>,
    },
    #[command(about = "Request revisions with a reason (customer)")]
    Reject {
        project: Uuid,
        #[arg(long)]
        reason: String,
    },
    #[command(about = "Submit the deposit payment notification (customer)")]
    SubmitDeposit { project: Uuid },
    #[command(about = "Confirm a submitted deposit (admin/sales)")]
    ApproveDeposit { project: Uuid },
    #[command(about = "Mark a phase as completed (sales)")]
    PhaseComplete { project: Uuid, index: usize },
    #[command(about = "Submit a phase payment (customer)")]
    PhasePay { project: Uuid, index: usize },
    #[command(about = "Approve a submitted phase payment (admin/sales)")]
    PhaseApprove { project: Uuid, index: usize },
    #[command(about = "Print the payment QR image URL for the deposit or a phase")]
    Qr {
        project: Uuid,
        #[arg(long, help = "Phase index; omit for the deposit")]
        phase: Option<usize>,
    },
}

/// Structured proposal input for `proposal save`.
#[derive(Debug, Deserialize)]
struct ProposalFile {
    analysis: Option<String>,
    deposit_amount: Decimal,
    #[serde(default)]
    currency: Option<String>,
    estimated_duration_days: u32,
    #[serde(default)]
    phases: Vec<PhaseEntry>,
    #[serde(default)]
    team_members: Vec<TeamEntry>,
    #[serde(default)]
    commitments: Vec<CommitmentEntry>,
}

#[derive(Debug, Deserialize)]
struct PhaseEntry {
    name: String,
    days: u32,
    amount: Decimal,
    #[serde(default)]
    payment_percentage: Option<Decimal>,
    #[serde(default)]
    tasks: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TeamEntry {
    name: String,
    role: String,
    rating: Decimal,
}

#[derive(Debug, Deserialize)]
struct CommitmentEntry {
    description: String,
    #[serde(default)]
    penalty: Option<String>,
}

fn parse_section(raw: &str) -> Result<ApprovalSection, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "analysis" => Ok(ApprovalSection::Analysis),
        "deposit" => Ok(ApprovalSection::Deposit),
        "phases" => Ok(ApprovalSection::Phases),
        "team" => Ok(ApprovalSection::Team),
        "commitments" => Ok(ApprovalSection::Commitments),
        other => Err(format!(
            "unknown section `{other}` (expected analysis|deposit|phases|team|commitments)"
        )),
    }
}

fn render(proposal: &Proposal) -> String {
    let mut lines = Vec::new();
    lines.push(format!("proposal {} · status: {:?}", proposal.id, proposal.status));
    lines.push(format!(
        "total {} {} · deposit {} · {} day(s)",
        proposal.total_from_phases(),
        proposal.currency,
        proposal.deposit_amount,
        proposal.duration_days()
    ));
    lines.push(format!(
        "approvals: {}/5 ({})",
        proposal.customer_approvals.approved_count(),
        ApprovalSection::ALL
            .iter()
            .map(|section| {
                if proposal.customer_approvals.is_approved(*section) {
                    format!("[x] {section}")
                } else {
                    format!("[ ] {section}")
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    ));
    lines.push(format!("payment stage: {}", payment_stage(proposal)));
    for (index, phase) in proposal.phases.iter().enumerate() {
        let state = if phase.payment_approved {
            "paid"
        } else if phase.payment_submitted {
            "payment submitted"
        } else if phase.completed {
            "completed, awaiting payment"
        } else {
            "open"
        };
        lines.push(format!(
            "phase {index}: {} · {} {} · {} day(s) · {state}",
            phase.name, phase.amount, proposal.currency, phase.days
        ));
    }
    lines.join("\n")
}

async fn load_proposal(
    workflow: &ProposalWorkflow,
    project: ProjectId,
    command: &str,
) -> Result<Proposal, CommandResult> {
    match workflow.load_latest(project).await {
        Ok(Some(proposal)) => Ok(proposal),
        Ok(None) => Err(CommandResult::failure(
            command,
            "not_found",
            "no proposal exists for this project yet",
            1,
        )),
        Err(error) => Err(api_failure(command, error)),
    }
}

pub async fn run(globals: &GlobalArgs, command: ProposalCommand) -> CommandResult {
    let context = match build_context(globals, "proposal") {
        Ok(context) => context,
        Err(failure) => return failure,
    };

    match command {
        ProposalCommand::Show { project } => show(&context, project).await,
        ProposalCommand::Save { project, file } => save(&context, project, &file).await,
        ProposalCommand::Send { project } => send(&context, project).await,
        ProposalCommand::Approve { project, section } => {
            approve(&context, project, section).await
        }
        ProposalCommand::Accept { project, notes } => accept(&context, project, notes).await,
        ProposalCommand::Reject { project, reason } => reject(&context, project, reason).await,
        ProposalCommand::SubmitDeposit { project } => submit_deposit(&context, project).await,
        ProposalCommand::ApproveDeposit { project } => approve_deposit(&context, project).await,
        ProposalCommand::PhaseComplete { project, index } => {
            phase_complete(&context, project, index).await
        }
        ProposalCommand::PhasePay { project, index } => phase_pay(&context, project, index).await,
        ProposalCommand::PhaseApprove { project, index } => {
            phase_approve(&context, project, index).await
        }
        ProposalCommand::Qr { project, phase } => qr(&context, project, phase).await,
    }
}

async fn show(context: &CliContext, project: Uuid) -> CommandResult {
    if let Err(failure) = require_role(&context.client, &[], "proposal") {
        return failure;
    }
    let workflow = ProposalWorkflow::new(context.client.clone());
    match load_proposal(&workflow, ProjectId(project), "proposal").await {
        Ok(proposal) => CommandResult::listing(render(&proposal)),
        Err(failure) => failure,
    }
}

async fn save(context: &CliContext, project: Uuid, file: &std::path::Path) -> CommandResult {
    if let Err(failure) = require_role(&context.client, &[Role::Admin, Role::Sales], "proposal") {
        return failure;
    }

    let raw = match std::fs::read_to_string(file) {
        Ok(raw) => raw,
        Err(error) => {
            return CommandResult::failure(
                "proposal",
                "input",
                format!("could not read {}: {error}", file.display()),
                2,
            );
        }
    };
    let parsed: ProposalFile = match toml::from_str(&raw) {
        Ok(parsed) => parsed,
        Err(error) => {
            // Malformed structure is an error, never silently dropped.
            return CommandResult::failure(
                "proposal",
                "input",
                format!("invalid proposal file: {error}"),
                2,
            );
        }
    };

    let draft = ProposalDraft {
        project_analysis: parsed.analysis,
        deposit_amount: parsed.deposit_amount,
        total_price: Decimal::ZERO,
        currency: parsed.currency.unwrap_or_else(|| "VND".to_string()),
        estimated_duration_days: parsed.estimated_duration_days,
        phases: parsed
            .phases
            .into_iter()
            .map(|entry| {
                let mut phase = Phase::new(entry.name, entry.days, entry.amount);
                if let Some(percentage) = entry.payment_percentage {
                    phase.payment_percentage = percentage;
                }
                if let Some(tasks) = entry.tasks {
                    phase.tasks = tasks;
                }
                phase
            })
            .collect(),
        team_members: parsed
            .team_members
            .into_iter()
            .map(|entry| TeamMember { name: entry.name, role: entry.role, rating: entry.rating })
            .collect(),
        deliverables: parsed
            .commitments
            .into_iter()
            .map(|entry| Deliverable {
                description: entry.description,
                penalty: entry.penalty.unwrap_or_default(),
            })
            .collect(),
        customer_approvals: None,
    };

    let workflow = ProposalWorkflow::new(context.client.clone());
    let existing = match workflow.load_latest(ProjectId(project)).await {
        Ok(existing) => existing,
        Err(error) => return api_failure("proposal", error),
    };

    match workflow.save_section(ProjectId(project), existing.as_ref(), draft).await {
        Ok(saved) => CommandResult::success(
            "proposal",
            format!("saved proposal {} (total {})", saved.id, saved.total_from_phases()),
        ),
        Err(error) => api_failure("proposal", error),
    }
}

async fn send(context: &CliContext, project: Uuid) -> CommandResult {
    if let Err(failure) = require_role(&context.client, &[Role::Admin, Role::Sales], "proposal") {
        return failure;
    }
    let workflow = ProposalWorkflow::new(context.client.clone());
    let proposal = match load_proposal(&workflow, ProjectId(project), "proposal").await {
        Ok(proposal) => proposal,
        Err(failure) => return failure,
    };

    match workflow.send(&proposal).await {
        Ok(sent) => {
            CommandResult::success("proposal", format!("proposal {} sent to customer", sent.id))
        }
        Err(error) => api_failure("proposal", error),
    }
}

async fn approve(context: &CliContext, project: Uuid, section: ApprovalSection) -> CommandResult {
    if let Err(failure) = require_role(&context.client, &[Role::Customer], "proposal") {
        return failure;
    }
    let workflow = ProposalWorkflow::new(context.client.clone());
    let mut proposal = match load_proposal(&workflow, ProjectId(project), "proposal").await {
        Ok(proposal) => proposal,
        Err(failure) => return failure,
    };

    match workflow.approve_section(&mut proposal, section).await {
        Ok(SectionOutcome::AlreadyApproved) => CommandResult::success(
            "proposal",
            format!("section `{section}` was already approved; nothing changed"),
        ),
        Ok(SectionOutcome::Approved { remaining }) => CommandResult::success(
            "proposal",
            format!("approved `{section}`; {remaining} section(s) remaining"),
        ),
        Ok(SectionOutcome::Accepted) => CommandResult::success(
            "proposal",
            "all five sections approved · proposal accepted; the deposit is now due",
        ),
        Err(error) => api_failure("proposal", error),
    }
}

async fn accept(context: &CliContext, project: Uuid, notes: Option<String>) -> CommandResult {
    if let Err(failure) = require_role(&context.client, &[Role::Customer], "proposal") {
        return failure;
    }
    let workflow = ProposalWorkflow::new(context.client.clone());
    let proposal = match load_proposal(&workflow, ProjectId(project), "proposal").await {
        Ok(proposal) => proposal,
        Err(failure) => return failure,
    };

    match workflow.accept(&proposal, notes).await {
        Ok(accepted) => {
            CommandResult::success("proposal", format!("proposal {} accepted", accepted.id))
        }
        Err(error) => api_failure("proposal", error),
    }
}

async fn reject(context: &CliContext, project: Uuid, reason: String) -> CommandResult {
    if let Err(failure) = require_role(&context.client, &[Role::Customer], "proposal") {
        return failure;
    }
    let workflow = ProposalWorkflow::new(context.client.clone());
    let proposal = match load_proposal(&workflow, ProjectId(project), "proposal").await {
        Ok(proposal) => proposal,
        Err(failure) => return failure,
    };

    match workflow.reject(&proposal, reason).await {
        Ok(_) => CommandResult::success(
            "proposal",
            "revision request sent; sales will follow up with an updated proposal",
        ),
        Err(error) => api_failure("proposal", error),
    }
}

async fn submit_deposit(context: &CliContext, project: Uuid) -> CommandResult {
    if let Err(failure) = require_role(&context.client, &[Role::Customer], "proposal") {
        return failure;
    }
    let workflow = ProposalWorkflow::new(context.client.clone());
    let mut proposal = match load_proposal(&workflow, ProjectId(project), "proposal").await {
        Ok(proposal) => proposal,
        Err(failure) => return failure,
    };

    match workflow.submit_deposit(&mut proposal).await {
        Ok(()) => CommandResult::success(
            "proposal",
            "deposit payment submitted; awaiting confirmation",
        ),
        Err(error) => api_failure("proposal", error),
    }
}

async fn approve_deposit(context: &CliContext, project: Uuid) -> CommandResult {
    if let Err(failure) = require_role(&context.client, &[Role::Admin, Role::Sales], "proposal") {
        return failure;
    }
    let workflow = ProposalWorkflow::new(context.client.clone());
    let mut proposal = match load_proposal(&workflow, ProjectId(project), "proposal").await {
        Ok(proposal) => proposal,
        Err(failure) => return failure,
    };

    match workflow.approve_deposit(&mut proposal).await {
        Ok(()) => {
            CommandResult::success("proposal", "deposit confirmed; phase work can start")
        }
        Err(error) => api_failure("proposal", error),
    }
}

async fn phase_complete(context: &CliContext, project: Uuid, index: usize) -> CommandResult {
    if let Err(failure) = require_role(&context.client, &[Role::Admin, Role::Sales], "proposal") {
        return failure;
    }
    let workflow = ProposalWorkflow::new(context.client.clone());
    let mut proposal = match load_proposal(&workflow, ProjectId(project), "proposal").await {
        Ok(proposal) => proposal,
        Err(failure) => return failure,
    };

    match workflow.mark_phase_complete(&mut proposal, index).await {
        Ok(()) => CommandResult::success(
            "proposal",
            format!("phase {index} marked complete; the customer can now pay it"),
        ),
        Err(error) => api_failure("proposal", error),
    }
}

async fn phase_pay(context: &CliContext, project: Uuid, index: usize) -> CommandResult {
    if let Err(failure) = require_role(&context.client, &[Role::Customer], "proposal") {
        return failure;
    }
    let workflow = ProposalWorkflow::new(context.client.clone());
    let mut proposal = match load_proposal(&workflow, ProjectId(project), "proposal").await {
        Ok(proposal) => proposal,
        Err(failure) => return failure,
    };

    match workflow.submit_phase_payment(&mut proposal, index).await {
        Ok(()) => CommandResult::success(
            "proposal",
            format!("payment for phase {index} submitted; awaiting confirmation"),
        ),
        Err(error) => api_failure("proposal", error),
    }
}

async fn phase_approve(context: &CliContext, project: Uuid, index: usize) -> CommandResult {
    if let Err(failure) = require_role(&context.client, &[Role::Admin, Role::Sales], "proposal") {
        return failure;
    }
    let workflow = ProposalWorkflow::new(context.client.clone());
    let mut proposal = match load_proposal(&workflow, ProjectId(project), "proposal").await {
        Ok(proposal) => proposal,
        Err(failure) => return failure,
    };

    match workflow.approve_phase_payment(&mut proposal, index).await {
        Ok(()) => CommandResult::success(
            "proposal",
            format!("phase {index} payment approved; the next phase is unlocked"),
        ),
        Err(error) => api_failure("proposal", error),
    }
}

async fn qr(context: &CliContext, project: Uuid, phase: Option<usize>) -> CommandResult {
    if let Err(failure) = require_role(&context.client, &[], "proposal") {
        return failure;
    }
    let workflow = ProposalWorkflow::new(context.client.clone());
    let proposal = match load_proposal(&workflow, ProjectId(project), "proposal").await {
        Ok(proposal) => proposal,
        Err(failure) => return failure,
    };

    let generator = QrGenerator::new(&context.config.bank);
    let url = match phase {
        Some(index) => match generator.phase_url(&proposal, index) {
            Ok(url) => url,
            Err(error) => {
                return CommandResult::failure("proposal", "domain", error.to_string(), 1)
            }
        },
        None => generator.deposit_url(&proposal),
    };

    CommandResult::listing(url)
}
