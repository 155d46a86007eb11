use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

use worksboard::core::db::{
    CurrentStepDetails, LookupKind, ProjectStatus, ProjectUpdate, StepStatus, StepUpdate,
    parse_date,
};
use worksboard::core::forms::{NewProjectForm, StepForm, VocabularyChoice};
use worksboard::core::timeline::today;
use worksboard::logging::init_logging;
use worksboard::{Board, BoardDb, Config, ui};

#[derive(Parser)]
#[command(name = "worksboard")]
#[command(about = "Track public works projects and their step timelines")]
struct Cli {
    /// Path to config.toml
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// SQLite database file, overrides the configured path
    #[arg(long, global = true, value_name = "PATH")]
    database: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create, list and manage projects
    #[command(subcommand)]
    Projects(ProjectsCommand),
    /// Edit a project's timeline
    #[command(subcommand)]
    Steps(StepsCommand),
    /// Manage the agency list
    #[command(subcommand)]
    Agencies(LookupCommand),
    /// Manage the sector list
    #[command(subcommand)]
    Sectors(LookupCommand),
    /// Show recent changes
    Audit {
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
}

#[derive(Subcommand)]
enum ProjectsCommand {
    /// Dashboard listing, newest first
    List {
        /// Show archived projects instead of active ones
        #[arg(long)]
        archived: bool,
        /// Only titles containing this text
        #[arg(long)]
        search: Option<String>,
    },
    Show {
        id: Uuid,
    },
    New {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        image_url: String,
        #[arg(long, default_value = "")]
        responsible: String,
        #[arg(long, default_value = "")]
        deadline: String,
    },
    Edit {
        id: Uuid,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        progress: Option<i64>,
        /// An empty value removes the image
        #[arg(long)]
        image_url: Option<String>,
        /// An empty value clears the current step details
        #[arg(long)]
        responsible: Option<String>,
        #[arg(long)]
        deadline: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    Archive {
        id: Uuid,
    },
    Restore {
        id: Uuid,
    },
    /// Permanently delete a project and its steps
    Delete {
        id: Uuid,
    },
}

#[derive(Args)]
struct StepFields {
    #[arg(long)]
    top: Option<String>,
    #[arg(long)]
    bottom: Option<String>,
    #[arg(long)]
    agency: Option<String>,
    #[arg(long)]
    sector: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    start: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    forecast: Option<String>,
}

#[derive(Subcommand)]
enum StepsCommand {
    /// Append a step to the end of the timeline
    Add {
        project: Uuid,
        #[arg(long)]
        title: String,
        #[arg(long, default_value_t = StepStatus::Pending)]
        status: StepStatus,
        #[arg(long)]
        current: bool,
        #[command(flatten)]
        fields: StepFields,
    },
    /// Change some fields of a step. An empty value clears an optional field.
    Edit {
        project: Uuid,
        step: Uuid,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        status: Option<StepStatus>,
        /// Make this the current step
        #[arg(long)]
        current: bool,
        #[command(flatten)]
        fields: StepFields,
    },
    Delete {
        project: Uuid,
        step: Uuid,
    },
    /// Set the full step order, first id first
    Reorder {
        project: Uuid,
        #[arg(required = true)]
        ids: Vec<Uuid>,
    },
    /// Move the step at position FROM to position TO (1-based)
    Move {
        project: Uuid,
        from: usize,
        to: usize,
    },
    /// Mark a step as the current one
    Current {
        project: Uuid,
        step: Uuid,
    },
}

#[derive(Subcommand)]
enum LookupCommand {
    List,
    Add { name: String },
    Rename { id: Uuid, name: String },
    Delete { id: Uuid },
}

fn clearable(value: Option<String>) -> Option<Option<String>> {
    value.map(|v| Some(v.trim().to_string()).filter(|v| !v.is_empty()))
}

fn clearable_date(value: Option<String>) -> anyhow::Result<Option<Option<time::Date>>> {
    Ok(match clearable(value) {
        None => None,
        Some(None) => Some(None),
        Some(Some(date)) => Some(Some(parse_date(&date)?)),
    })
}

async fn run_projects(board: &Board<BoardDb>, command: ProjectsCommand) -> anyhow::Result<()> {
    let today = today();
    match command {
        ProjectsCommand::List { archived, search } => {
            let status = if archived {
                ProjectStatus::Archived
            } else {
                ProjectStatus::Active
            };
            let timelines = board.list_projects(status, search.as_deref()).await?;
            print!("{}", ui::render_dashboard(&timelines, today));
        }
        ProjectsCommand::Show { id } => {
            let timeline = board.load(id).await?;
            print!("{}", ui::render_project(&timeline, today));
        }
        ProjectsCommand::New {
            title,
            description,
            image_url,
            responsible,
            deadline,
        } => {
            let form = NewProjectForm {
                title,
                description,
                image_url,
                responsible,
                deadline,
            };
            let project = form.to_new_project(&board.config().defaults)?;
            let timeline = board.create_project(project).await?;
            print!("{}", ui::render_project(&timeline, today));
        }
        ProjectsCommand::Edit {
            id,
            title,
            description,
            progress,
            image_url,
            responsible,
            deadline,
            notes,
        } => {
            let current_step_details = if responsible.is_some() || deadline.is_some() || notes.is_some() {
                let stored = board.load(id).await?.project.current_step_details.unwrap_or_default();
                let details = CurrentStepDetails {
                    responsible: responsible.map_or(stored.responsible, |r| r.trim().to_string()),
                    deadline: deadline.map_or(stored.deadline, |d| d.trim().to_string()),
                    notes: notes.unwrap_or(stored.notes),
                };
                Some(Some(details).filter(|d| !d.responsible.is_empty()))
            } else {
                None
            };
            let update = ProjectUpdate {
                title,
                description,
                progress,
                image_url: clearable(image_url),
                status: None,
                current_step_details,
            };
            board.update_project(id, &update).await?;
            let timeline = board.load(id).await?;
            print!("{}", ui::render_project(&timeline, today));
        }
        ProjectsCommand::Archive { id } => {
            let project = board.archive(id).await?;
            println!("Archived {}", project.title);
        }
        ProjectsCommand::Restore { id } => {
            let project = board.restore(id).await?;
            println!("Restored {}", project.title);
        }
        ProjectsCommand::Delete { id } => {
            board.delete_project(id).await?;
            println!("Deleted {}", id);
        }
    }
    Ok(())
}

async fn run_steps(board: &Board<BoardDb>, command: StepsCommand) -> anyhow::Result<()> {
    let today = today();
    let other = board.config().vocabulary.other_label.clone();
    match command {
        StepsCommand::Add {
            project,
            title,
            status,
            current,
            fields,
        } => {
            let agencies = board.lookup_choices(LookupKind::Agency).await?;
            let sectors = board.lookup_choices(LookupKind::Sector).await?;
            let form = StepForm {
                title,
                status,
                is_current: current,
                top_annotation: fields.top.unwrap_or_default(),
                bottom_annotation: fields.bottom.unwrap_or_default(),
                agency: VocabularyChoice::from_value(fields.agency.as_deref(), &agencies, &other),
                sector: VocabularyChoice::from_value(fields.sector.as_deref(), &sectors, &other),
                start_date: fields.start.unwrap_or_default(),
                completion_forecast: fields.forecast.unwrap_or_default(),
            };
            let step = board.add_step(project, &form.to_new_step(&other)?).await?;
            println!("Added step {} at position {}", step.id, step.order_index);
        }
        StepsCommand::Edit {
            project,
            step,
            title,
            status,
            current,
            fields,
        } => {
            let update = StepUpdate {
                title,
                status,
                is_current: current.then_some(true),
                top_annotation: clearable(fields.top),
                bottom_annotation: clearable(fields.bottom),
                responsible_agency: clearable(fields.agency),
                responsible_sector: clearable(fields.sector),
                start_date: clearable_date(fields.start)?,
                completion_forecast: clearable_date(fields.forecast)?,
            };
            board.edit_step(project, step, &update).await?;
            print!("{}", ui::render_timeline(&board.load(project).await?, today));
        }
        StepsCommand::Delete { project, step } => {
            board.delete_step(project, step).await?;
            println!("Deleted step {}", step);
        }
        StepsCommand::Reorder { project, ids } => {
            let timeline = board.reorder_steps(project, &ids).await?;
            print!("{}", ui::render_timeline(&timeline, today));
        }
        StepsCommand::Move { project, from, to } => {
            anyhow::ensure!(from > 0 && to > 0, "Positions start at 1");
            let timeline = board.move_step(project, from - 1, to - 1).await?;
            print!("{}", ui::render_timeline(&timeline, today));
        }
        StepsCommand::Current { project, step } => {
            board.set_current_step(project, step).await?;
            print!("{}", ui::render_timeline(&board.load(project).await?, today));
        }
    }
    Ok(())
}

async fn run_lookup(
    board: &Board<BoardDb>,
    kind: LookupKind,
    command: LookupCommand,
) -> anyhow::Result<()> {
    match command {
        LookupCommand::List => {
            print!("{}", ui::render_lookups(&board.lookups(kind).await?));
        }
        LookupCommand::Add { name } => {
            let entry = board.add_lookup(kind, &name).await?;
            println!("Added {} {} ({})", kind, entry.name, entry.id);
        }
        LookupCommand::Rename { id, name } => {
            let entry = board.rename_lookup(kind, id, &name).await?;
            println!("Renamed {} to {}", id, entry.name);
        }
        LookupCommand::Delete { id } => {
            board.delete_lookup(kind, id).await?;
            println!("Deleted {} {}", kind, id);
        }
    }
    Ok(())
}

async fn run(board: &Board<BoardDb>, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Projects(command) => run_projects(board, command).await,
        Command::Steps(command) => run_steps(board, command).await,
        Command::Agencies(command) => run_lookup(board, LookupKind::Agency, command).await,
        Command::Sectors(command) => run_lookup(board, LookupKind::Sector, command).await,
        Command::Audit { limit } => {
            print!("{}", ui::render_audit(&board.audit_log(limit).await?));
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(path) = cli.database {
        config.database.path = path;
    }
    config.validate()?;
    init_logging(&config, cli.verbose);

    let db = BoardDb::with_config(&config.database)
        .await
        .with_context(|| format!("Failed to open database {}", config.database.path.display()))?;
    let board = Board::new(db.clone(), config);

    let outcome = run(&board, cli.command).await;
    db.close().await?;
    outcome
}
