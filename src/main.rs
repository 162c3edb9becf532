use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};

mod classifier;
mod config;
mod db;
mod error;
mod models;
mod report;
mod store;
mod tree;

use config::{Config, TreeConfig};

#[derive(Parser)]
#[command(name = "school-records")]
#[command(about = "Student, teacher and class records with fee-defaulter prediction")]
struct Cli {
    /// Directory holding the CSV collections and the model file
    #[arg(long, global = true, env = "SCHOOL_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,

    /// Maximum depth of the fee-defaulter decision tree
    #[arg(long, global = true, default_value_t = TreeConfig::default().max_depth)]
    max_depth: usize,

    /// Log debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Log errors only
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum CollectionKind {
    Students,
    Teachers,
    Classes,
}

#[derive(Subcommand)]
enum Commands {
    /// Create any missing collection files
    Init,
    /// Show total students, teachers and classes
    Summary,
    /// Print one collection
    List {
        #[arg(value_enum)]
        collection: CollectionKind,
    },
    /// Record a new student
    AddStudent {
        #[arg(long)]
        name: String,
        #[arg(long)]
        class: String,
        #[arg(long)]
        attendance: f64,
        #[arg(long)]
        last_paid: f64,
        #[arg(long)]
        total_fee: f64,
        #[arg(long, default_value_t = 0.0)]
        fine: f64,
    },
    /// Record a new teacher
    AddTeacher {
        #[arg(long)]
        name: String,
        /// Comma-separated subject names
        #[arg(long)]
        subjects: String,
    },
    /// Predict whether a student is a fee defaulter
    Predict {
        #[arg(long)]
        attendance: f64,
        #[arg(long)]
        last_paid: f64,
        #[arg(long)]
        total_fee: f64,
    },
    /// Retrain the fee-defaulter model from the current students
    Train,
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose)?;

    let config = Config::new(
        &cli.data_dir,
        TreeConfig {
            max_depth: cli.max_depth,
            ..TreeConfig::default()
        },
    );
    let paths = &config.paths;

    match cli.command {
        Commands::Init => {
            db::load_roster(paths).context("failed to prepare collections")?;
            println!("Collections ready in {}.", cli.data_dir.display());
        }
        Commands::Summary => {
            let totals = db::load_roster(paths)?.totals();
            println!("Total students: {}", totals.students);
            println!("Total teachers: {}", totals.teachers);
            println!("Total classes:  {}", totals.classes);
        }
        Commands::List { collection } => {
            let output = match collection {
                CollectionKind::Students => report::render_students(&store::load(&paths.students)?),
                CollectionKind::Teachers => report::render_teachers(&store::load(&paths.teachers)?),
                CollectionKind::Classes => report::render_classes(&store::load(&paths.classes)?),
            };
            print!("{output}");
        }
        Commands::AddStudent {
            name,
            class,
            attendance,
            last_paid,
            total_fee,
            fine,
        } => {
            let id = db::add_student(paths, &name, &class, attendance, last_paid, total_fee, fine)
                .context("failed to add student")?;
            println!("Student added with ID {id}.");
        }
        Commands::AddTeacher { name, subjects } => {
            let id = db::add_teacher(paths, &name, &subjects).context("failed to add teacher")?;
            println!("Teacher added with ID {id}.");
        }
        Commands::Predict {
            attendance,
            last_paid,
            total_fee,
        } => {
            let status = classifier::predict(&config, attendance, last_paid, total_fee)
                .context("fee prediction failed")?;
            println!("{status}");
        }
        Commands::Train => match classifier::train(&config).context("training failed")? {
            Some(artifact) => println!(
                "Model trained on {} students ({} defaulters) and saved to {}.",
                artifact.training_rows,
                artifact.defaulters,
                paths.model.display()
            ),
            None => println!("No student data to train."),
        },
        Commands::Report { out } => {
            let roster = db::load_roster(paths)?;
            let report = report::build_report(&roster, chrono::Local::now().date_naive());
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

fn init_tracing(quiet: bool, verbose: bool) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("SCHOOL_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
