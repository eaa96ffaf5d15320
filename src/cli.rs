//! CLI module
//!
//! This module provides the command-line interface for the tasks generator.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use colored::{ColoredString, Colorize};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{Client, HttpClientImpl},
    config::{Settings, API_URL_ENV, DEFAULT_API_URL, DEFAULT_RECENT_LIMIT, HEALTH_POLL_INTERVAL},
    controller::PlanController,
    export::DirectorySink,
    health::{self, HealthMonitor, HealthReport, HealthStatus},
    models::{FeaturePlan, PlanId, Priority, Task, TaskCollection},
    recent::RecentPlansFeed,
    validation::FeatureDraft,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Plan service base URL
    #[arg(short, long, env = API_URL_ENV, default_value = DEFAULT_API_URL)]
    server: String,

    /// Log more detail to stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new feature plan
    Generate {
        /// What the feature should achieve
        #[arg(short, long)]
        goal: String,

        /// A user persona (repeatable)
        #[arg(short, long = "user")]
        users: Vec<String>,

        /// A constraint the plan must respect (repeatable)
        #[arg(short, long = "constraint")]
        constraints: Vec<String>,
    },

    /// List the most recent plans
    Recent {
        #[arg(short, long, default_value_t = DEFAULT_RECENT_LIMIT)]
        limit: usize,
    },

    /// Show a plan
    Show {
        id: PlanId,
    },

    /// Move a task to another position within its category and save
    Reorder {
        id: PlanId,
        category: String,
        from: usize,
        to: usize,
    },

    /// Move a task one position up or down and save
    Move {
        id: PlanId,
        category: String,
        index: usize,
        #[arg(value_enum)]
        direction: Direction,
    },

    /// Edit a task's fields and save
    Edit {
        id: PlanId,
        category: String,
        index: usize,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// low, medium, high or critical
        #[arg(long)]
        priority: Option<Priority>,

        #[arg(long)]
        effort: Option<String>,
    },

    /// Export a plan as markdown
    Export {
        id: PlanId,

        /// Directory to write the markdown file into
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Show service health
    Health {
        /// Keep polling until interrupted
        #[arg(short, long)]
        watch: bool,

        /// Seconds between polls when watching
        #[arg(long, default_value_t = HEALTH_POLL_INTERVAL.as_secs())]
        interval: u64,
    },

    /// Check that the service is reachable
    Ping,

    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Direction {
    Up,
    Down,
}

/// Run the CLI application
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let mut settings = Settings::default().with_base_url(cli.server.as_str());

    match &cli.command {
        Commands::Generate {
            goal,
            users,
            constraints,
        } => {
            let input = FeatureDraft::from_entries(goal, users, constraints)?.validate()?;
            let client = create_client(&settings)?;
            let controller = create_controller(client.clone(), &settings);
            let mut events = controller.subscribe();

            println!("Generating feature plan...");
            controller.generate(&input).await?;
            print_notice(&controller);
            if let (Some(plan), Some(tasks)) = (controller.plan(), controller.local_tasks()) {
                print_plan(&plan, &tasks);
            }

            let mut feed = RecentPlansFeed::new(settings.recent_limit);
            while let Ok(event) = events.try_recv() {
                feed.handle_event(&event);
            }
            if feed.refresh_if_stale(client.as_ref()).await {
                println!();
                print_recent(&feed);
            }
            Ok(())
        }

        Commands::Recent { limit } => {
            let client = create_client(&settings)?;
            let mut feed = RecentPlansFeed::new(*limit);
            feed.load(client.as_ref()).await;
            print_recent(&feed);
            Ok(())
        }

        Commands::Show { id } => {
            let controller = create_controller(create_client(&settings)?, &settings);
            controller.select_recent(id).await?;
            if let (Some(plan), Some(tasks)) = (controller.plan(), controller.local_tasks()) {
                print_plan(&plan, &tasks);
            }
            Ok(())
        }

        Commands::Reorder {
            id,
            category,
            from,
            to,
        } => {
            let controller = create_controller(create_client(&settings)?, &settings);
            controller.select_recent(id).await?;
            controller.reorder_task(category, *from, *to)?;
            save_and_print(&controller, category).await
        }

        Commands::Move {
            id,
            category,
            index,
            direction,
        } => {
            let controller = create_controller(create_client(&settings)?, &settings);
            controller.select_recent(id).await?;
            let to = match direction {
                Direction::Up => index.checked_sub(1).ok_or("Task is already first")?,
                Direction::Down => index + 1,
            };
            controller.reorder_task(category, *index, to)?;
            save_and_print(&controller, category).await
        }

        Commands::Edit {
            id,
            category,
            index,
            title,
            description,
            priority,
            effort,
        } => {
            let controller = create_controller(create_client(&settings)?, &settings);
            controller.select_recent(id).await?;

            let current = controller
                .local_tasks()
                .and_then(|tasks| tasks.tasks(category).and_then(|t| t.get(*index).cloned()))
                .ok_or_else(|| format!("No task {} in category '{}'", index, category))?;

            let updated = Task {
                title: title.clone().unwrap_or(current.title.clone()),
                description: description.clone().unwrap_or(current.description.clone()),
                priority: priority.unwrap_or(current.priority),
                estimated_effort: effort.clone().unwrap_or(current.estimated_effort.clone()),
                ..current
            };
            controller.edit_task(category, *index, updated)?;
            save_and_print(&controller, category).await
        }

        Commands::Export { id, out } => {
            settings.export_dir = out.clone();
            let controller = create_controller(create_client(&settings)?, &settings);
            let path = controller.export(id).await?;
            print_notice(&controller);
            println!("Wrote {}", path.display());
            Ok(())
        }

        Commands::Health { watch, interval } => {
            let client = create_client(&settings)?;
            if !*watch {
                let report = health::poll_once(client.as_ref()).await;
                print_health(&report);
                return Ok(());
            }

            let monitor = HealthMonitor::start(client, Duration::from_secs((*interval).max(1)));
            let mut updates = monitor.subscribe();
            loop {
                tokio::select! {
                    changed = updates.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let report = updates.borrow_and_update().clone();
                        print_health(&report);
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
            monitor.stop();
            Ok(())
        }

        Commands::Ping => {
            let client = create_client(&settings)?;
            let pong = client.ping().await?;
            match pong.timestamp {
                Some(ts) => println!("{} ({})", pong.message, ts.format("%Y-%m-%d %H:%M:%S UTC")),
                None => println!("{}", pong.message),
            }
            Ok(())
        }

        Commands::Completions { shell } => {
            // Generate completions for the specified shell
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, bin_name, &mut io::stdout());
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "tasks_generator=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    // Ignore a second initialization
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn create_client(settings: &Settings) -> Result<Arc<dyn Client>, Box<dyn std::error::Error>> {
    Ok(Arc::new(HttpClientImpl::with_config(settings.client.clone())?))
}

fn create_controller(client: Arc<dyn Client>, settings: &Settings) -> PlanController {
    PlanController::with_config(
        client,
        Arc::new(DirectorySink::new(settings.export_dir.clone())),
        settings.controller.clone(),
    )
}

async fn save_and_print(
    controller: &PlanController,
    category: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    controller.save_edits().await?;
    print_notice(controller);
    if let Some(tasks) = controller.local_tasks() {
        print_category(category, tasks.tasks(category).unwrap_or_default());
    }
    Ok(())
}

fn print_notice(controller: &PlanController) {
    if let Some(message) = controller.success() {
        println!("{} {}", "Success:".green().bold(), message);
    }
}

fn print_plan(plan: &FeaturePlan, tasks: &TaskCollection) {
    println!("{} #{}", "Feature Plan".bold(), plan.id());
    println!("\n{}", "Goal".bold());
    println!("  {}", plan.goal());

    println!("\n{}", "User Stories".bold());
    if plan.user_stories().is_empty() {
        println!("  None");
    }
    for story in plan.user_stories() {
        println!("  {}", story.title.bold());
        println!("    {}", story.description);
        for criterion in &story.acceptance_criteria {
            println!("    - {}", criterion);
        }
    }

    println!("\n{}", "Engineering Tasks".bold());
    for (category, category_tasks) in tasks.iter() {
        print_category(category, category_tasks);
    }

    println!("\n{}", "Risks & Mitigations".bold());
    if plan.risks().is_empty() {
        println!("  None");
    }
    for risk in plan.risks() {
        println!("  {} [{}]", risk.risk, risk.severity);
        println!("    Mitigation: {}", risk.mitigation);
    }

    println!(
        "\nCreated: {}",
        plan.created_at().format("%Y-%m-%d %H:%M:%S UTC")
    );
}

fn print_category(category: &str, tasks: &[Task]) {
    println!("  {}", category.underline());
    if tasks.is_empty() {
        println!("    No tasks in this category");
    }
    for (i, task) in tasks.iter().enumerate() {
        println!(
            "    {}. [{}] {} ({})",
            i,
            priority_label(task.priority),
            task.title,
            task.estimated_effort
        );
        println!("       {}", task.description);
    }
}

fn print_recent(feed: &RecentPlansFeed) {
    if let Some(error) = feed.error() {
        println!("{} {}", "Error:".red().bold(), error);
        return;
    }
    if feed.plans().is_empty() {
        println!("No feature plans yet. Generate one to get started!");
        return;
    }

    println!("{}", format!("Last {} Feature Plans", feed.limit()).bold());
    for plan in feed.plans() {
        println!(
            "  #{} {} ({})",
            plan.id,
            plan.goal,
            plan.created_at.format("%Y-%m-%d %H:%M")
        );
    }
}

fn print_health(report: &HealthReport) {
    println!(
        "System Health: {}",
        status_label(report.status, &report.status.as_str().to_uppercase())
    );
    for (name, status) in report.components() {
        println!("  {} {}", status_label(status, "●"), name);
    }
    if let Some(ts) = report.timestamp {
        println!("  Last updated: {}", ts.format("%H:%M:%S UTC"));
    }
}

fn status_label(status: HealthStatus, text: &str) -> ColoredString {
    match status {
        HealthStatus::Healthy => text.green(),
        HealthStatus::Degraded => text.yellow(),
        HealthStatus::Unhealthy => text.red(),
        HealthStatus::Unknown => text.dimmed(),
    }
}

fn priority_label(priority: Priority) -> ColoredString {
    match priority {
        Priority::Critical => priority.as_str().red().bold(),
        Priority::High => priority.as_str().red(),
        Priority::Medium => priority.as_str().yellow(),
        Priority::Low => priority.as_str().green(),
    }
}
