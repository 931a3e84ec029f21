//! prevc - phase-gated workflow engine.
//!
//! Thin command-line front-end over [`WorkflowService`].

use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use prevc::gateway::{Gateway, ACTIONS};
use prevc::workflow::{
    AdvanceOutcome, AgentOrchestrator, AgentType, Complexity, DecisionInput, InitOptions, PhaseCode,
    PlanItemStatus, Role, ScaleHints, WorkflowResult, WorkflowService,
};
use prevc::WorkflowConfig;

/// Phase-gated development workflow
#[derive(Parser)]
#[command(name = "prevc")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Repository the workflow belongs to
    #[arg(short, long, global = true, default_value = ".", env = "PREVC_REPO")]
    repo: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a workflow
    Init {
        /// Project name
        name: String,

        /// Scale (QUICK, SMALL, MEDIUM, LARGE, ENTERPRISE); inferred when omitted
        #[arg(short, long)]
        scale: Option<String>,

        /// What the change is about (used for scale inference)
        #[arg(short, long)]
        description: Option<String>,

        /// Bypass all gates
        #[arg(long)]
        autonomous: bool,

        /// Require a linked plan before leaving Plan
        #[arg(long, num_args = 0..=1, default_missing_value = "true")]
        require_plan: Option<bool>,

        /// Require an approved plan before leaving Review
        #[arg(long, num_args = 0..=1, default_missing_value = "true")]
        require_approval: Option<bool>,

        /// Archive the current workflow instead of failing
        #[arg(long)]
        archive_previous: bool,

        /// Number of files the change touches
        #[arg(long)]
        files: Option<usize>,

        /// Complexity of the change (low, medium, high)
        #[arg(long)]
        complexity: Option<String>,

        /// The change is compliance-sensitive
        #[arg(long)]
        compliance: bool,

        /// Count repository files when --files is not given
        #[arg(long)]
        detect_files: bool,
    },

    /// Show workflow status
    Status {
        /// Print the status document as JSON
        #[arg(long)]
        json: bool,
    },

    /// Complete the current phase and move to the next
    Advance {
        /// Bypass gates
        #[arg(short, long)]
        force: bool,

        /// Artifacts produced in this phase
        #[arg(short, long, num_args = 1..)]
        outputs: Vec<String>,
    },

    /// Check whether advance would succeed
    Gates {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Hand off work between roles or agents
    Handoff {
        /// Role or agent handing off
        from: String,

        /// Role or agent taking over
        to: String,

        /// Artifacts passed along
        #[arg(short, long, num_args = 1..)]
        artifacts: Vec<String>,
    },

    /// Run a collaboration session
    Collaborate {
        /// Discussion topic
        topic: String,

        /// Participating roles (defaults to the current phase leads)
        #[arg(short, long, value_delimiter = ',')]
        participants: Vec<String>,

        /// Contributions as ROLE=MESSAGE; the session is synthesized afterwards
        #[arg(short, long)]
        contribute: Vec<String>,
    },

    /// Approve the active plan
    Approve {
        /// Approver
        #[arg(long)]
        by: Option<String>,

        /// Approval notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// Record that a plan exists without linking one
    MarkPlan,

    /// Turn autonomous mode on or off
    Autonomous {
        /// New state
        state: Toggle,
    },

    /// Link a plan from the plans directory
    LinkPlan {
        /// Plan slug (file name without .md)
        slug: String,
    },

    /// List plans in the plans directory
    Plans,

    /// Update a plan phase or step
    PlanUpdate {
        /// Plan slug
        slug: String,

        /// Plan phase id (phase-1, phase-2, ...)
        phase_id: String,

        /// New status (pending, in_progress, completed, skipped)
        status: String,

        /// Step index (1-based); updates the phase when omitted
        #[arg(long)]
        step: Option<usize>,

        /// Step notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// Record an architecture decision
    Decide {
        /// Decision title
        title: String,

        /// What was decided
        description: String,

        /// Phase the decision belongs to (defaults to the current phase)
        #[arg(long)]
        phase: Option<String>,

        /// Alternatives considered
        #[arg(long, num_args = 1..)]
        alternatives: Vec<String>,
    },

    /// Show recommended agents
    Agents {
        /// Phase to list agents for
        phase: Option<String>,

        /// Pick agents for a task description instead
        #[arg(short, long)]
        task: Option<String>,

        /// Skip the trailing review agent for --task
        #[arg(long)]
        no_review: bool,
    },

    /// Show recommended next steps
    Next,

    /// Run a gateway action given as JSON (reads stdin when omitted)
    Call {
        /// Action JSON, e.g. '{"action":"check_gates"}'
        json: Option<String>,

        /// List the available actions
        #[arg(long)]
        list: bool,
    },

    /// Show configuration
    Config {
        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose { EnvFilter::new("debug") } else { EnvFilter::new("warn") };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();

    let mut service = WorkflowService::open(&cli.repo).hinted()?;

    match cli.command {
        Commands::Init {
            name,
            scale,
            description,
            autonomous,
            require_plan,
            require_approval,
            archive_previous,
            files,
            complexity,
            compliance,
            detect_files,
        } => {
            let complexity = complexity.map(|c| c.parse::<Complexity>()).transpose().hinted()?;
            let options = InitOptions {
                name,
                description,
                scale,
                autonomous: autonomous.then_some(true),
                require_plan,
                require_approval,
                archive_previous,
                hints: Some(ScaleHints { file_count: files, complexity, compliance }),
                detect_files,
            };
            cmd_init(&service, options)?;
        }
        Commands::Status { json } => cmd_status(&service, json)?,
        Commands::Advance { force, outputs } => cmd_advance(&service, outputs, force)?,
        Commands::Gates { json } => cmd_gates(&service, json)?,
        Commands::Handoff { from, to, artifacts } => {
            let outcome = service.handoff(&from, &to, artifacts).hinted()?;
            println!("{} → {} ({})", outcome.record.from, outcome.record.to, outcome.record.phase);
            if let Some(next) = outcome.suggested_next_agent {
                println!("Suggested next: {next}");
            }
        }
        Commands::Collaborate { topic, participants, contribute } => {
            cmd_collaborate(&mut service, &topic, &participants, &contribute)?;
        }
        Commands::Approve { by, notes } => {
            let approval = service.approve_plan(by, notes).hinted()?;
            match approval.approved_by {
                Some(by) => println!("Plan approved by {by}"),
                None => println!("Plan approved"),
            }
        }
        Commands::MarkPlan => {
            service.mark_plan_created().hinted()?;
            println!("Plan marked as created");
        }
        Commands::Autonomous { state } => {
            let settings = service.set_autonomous_mode(matches!(state, Toggle::On)).hinted()?;
            println!("Autonomous mode {}", if settings.autonomous_mode { "on" } else { "off" });
        }
        Commands::LinkPlan { slug } => {
            let link = service.link_plan(&slug).hinted()?;
            let (done, total) = link.plan.progress();
            println!(
                "Linked plan '{}' ({}): {} phases, {done}/{total} steps",
                link.plan.slug,
                link.plan.title,
                link.plan.phases.len()
            );
            if !link.workflow_updated {
                println!("No workflow initialized; the plan was validated but not recorded");
            }
        }
        Commands::Plans => {
            let plans = service.list_available_plans();
            if plans.is_empty() {
                println!("No plans in {}", service.config().plans_dir(service.repo()).display());
            }
            for slug in plans {
                println!("{slug}");
            }
        }
        Commands::PlanUpdate { slug, phase_id, status, step, notes } => {
            let status = status.parse::<PlanItemStatus>().hinted()?;
            let update = match step {
                Some(index) => service.update_plan_step(&slug, &phase_id, index, status, notes),
                None => service.update_plan_phase(&slug, &phase_id, status),
            }
            .hinted()?;
            if !update.success {
                anyhow::bail!("{}", update.message);
            }
            println!("{}{}", update.message, if update.changed { "" } else { " (unchanged)" });
        }
        Commands::Decide { title, description, phase, alternatives } => {
            let phase = phase.map(|p| p.parse::<PhaseCode>()).transpose().hinted()?;
            let record = service
                .record_decision(DecisionInput { title, description, phase, alternatives })
                .hinted()?;
            println!("{}: {}", record.id, record.title);
        }
        Commands::Agents { phase, task, no_review } => {
            cmd_agents(phase.as_deref(), task.as_deref(), no_review)?;
        }
        Commands::Next => {
            for (i, action) in service.recommended_actions().hinted()?.iter().enumerate() {
                println!("{}. {action}", i + 1);
            }
        }
        Commands::Config { path } => cmd_config(&service, path)?,
        Commands::Call { json, list } => cmd_call(service, json, list)?,
    }

    Ok(())
}

/// Attach the error's remediation hint to the message.
trait Hinted<T> {
    fn hinted(self) -> Result<T>;
}

impl<T> Hinted<T> for WorkflowResult<T> {
    fn hinted(self) -> Result<T> {
        self.map_err(|err| match err.hint() {
            Some(hint) => anyhow!("{err}\nhint: {hint}"),
            None => anyhow::Error::new(err),
        })
    }
}

/// Start a workflow.
fn cmd_init(service: &WorkflowService, options: InitOptions) -> Result<()> {
    let status = service.init(options).hinted()?;
    let route = status.route().iter().map(ToString::to_string).collect::<Vec<_>>().join(" → ");

    println!("Initialized '{}' [{}]", status.project.name, status.project.scale);
    println!("Route: {route}");
    println!("Current phase: {} ({})", status.project.current_phase, status.project.current_phase.name());
    if status.settings.require_plan {
        println!("A linked plan is required before leaving Plan");
    }
    if status.settings.require_approval {
        println!("An approved plan is required before leaving Review");
    }
    Ok(())
}

/// Show workflow status.
fn cmd_status(service: &WorkflowService, json: bool) -> Result<()> {
    if json {
        let status = service.status().hinted()?;
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print!("{}", service.formatted_status().hinted()?);
    }
    Ok(())
}

/// Advance the workflow.
fn cmd_advance(service: &WorkflowService, outputs: Vec<String>, force: bool) -> Result<()> {
    let outcome = service.advance(outputs, force).hinted()?;
    match &outcome {
        AdvanceOutcome::Advanced { from, to, bypassed } => {
            if let Some(failure) = bypassed {
                println!("Bypassed gate '{}'", failure.gate);
            }
            println!("{from} → {to} ({})", to.name());
        }
        AdvanceOutcome::Completed { from } => println!("{from} completed; workflow complete"),
        AdvanceOutcome::AlreadyComplete => println!("Workflow already complete"),
        AdvanceOutcome::Blocked(_) => {}
    }
    outcome.into_result().hinted()?;
    Ok(())
}

/// Preview gates.
fn cmd_gates(service: &WorkflowService, json: bool) -> Result<()> {
    let check = service.check_gates().hinted()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&check)?);
        return Ok(());
    }

    if check.is_complete {
        println!("Workflow complete");
        return Ok(());
    }
    let target = check.next.map_or_else(|| "completion".to_string(), |next| next.to_string());
    match &check.failure {
        Some(failure) if !check.allowed => {
            println!("{} → {target}: blocked by '{}'", check.current, failure.gate);
            println!("hint: {}", failure.hint);
        }
        Some(failure) => println!("{} → {target}: allowed ('{}' bypassed)", check.current, failure.gate),
        None => println!("{} → {target}: allowed", check.current),
    }
    Ok(())
}

/// Run a collaboration session.
fn cmd_collaborate(
    service: &mut WorkflowService,
    topic: &str,
    participants: &[String],
    contributions: &[String],
) -> Result<()> {
    let participants =
        participants.iter().map(|p| p.parse::<Role>()).collect::<WorkflowResult<Vec<_>>>().hinted()?;
    let session = service.start_collaboration(topic, Some(participants)).hinted()?;

    println!("Session {} on '{}'", session.id, session.topic);
    println!(
        "Participants: {}",
        session.participants.iter().map(Role::as_str).collect::<Vec<_>>().join(", ")
    );

    if contributions.is_empty() {
        return Ok(());
    }
    for entry in contributions {
        let (role, message) =
            entry.split_once('=').with_context(|| format!("expected ROLE=MESSAGE, got '{entry}'"))?;
        let role = role.parse::<Role>().hinted()?;
        service.contribute(&session.id, role, message).hinted()?;
    }
    print!("{}", service.synthesize(&session.id).hinted()?.summary);
    Ok(())
}

/// Show recommended agents.
fn cmd_agents(phase: Option<&str>, task: Option<&str>, no_review: bool) -> Result<()> {
    let agents: Vec<AgentType> = match (task, phase) {
        (Some(task), _) => AgentOrchestrator::task_agent_sequence(task, !no_review),
        (None, Some(phase)) => AgentOrchestrator::agents_for_phase(phase.parse::<PhaseCode>().hinted()?).to_vec(),
        (None, None) => AgentType::ALL.to_vec(),
    };
    for agent in agents {
        println!("{:<24} {}", agent.as_str(), agent.description());
    }
    Ok(())
}

/// Run a gateway action.
fn cmd_call(service: WorkflowService, json: Option<String>, list: bool) -> Result<()> {
    if list {
        for entry in ACTIONS {
            println!("{:<22} {}", entry.name, entry.description);
        }
        return Ok(());
    }

    let input = match json {
        Some(json) => json,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).context("Failed to read action from stdin")?;
            buf
        }
    };

    let mut gateway = Gateway::new(service);
    let response = gateway.dispatch_json(&input).hinted()?;
    println!("{}", response.to_json());
    Ok(())
}

/// Show configuration.
fn cmd_config(service: &WorkflowService, show_path: bool) -> Result<()> {
    if show_path {
        match WorkflowConfig::source_path(service.repo()) {
            Some(path) => println!("{}", path.display()),
            None => println!("(defaults)"),
        }
        return Ok(());
    }

    let toml = toml::to_string_pretty(service.config())?;
    println!("{toml}");

    Ok(())
}
