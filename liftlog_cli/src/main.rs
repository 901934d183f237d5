use clap::{Parser, Subcommand};
use liftlog_core::*;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "liftlog")]
#[command(about = "Strength workout tracker with scored sets and progression", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Create, edit and inspect workouts
    Workout {
        #[command(subcommand)]
        command: WorkoutCommands,
    },

    /// Grant points or stars outside the workout flow
    Points {
        #[command(subcommand)]
        command: PointsCommands,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write a configuration file with the default settings
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Register a new user
    Create {
        /// Display name (1-15 characters)
        #[arg(long)]
        name: String,

        /// Record weights in metric units
        #[arg(long)]
        metric: bool,
    },

    /// Show a user's progression counters
    Show {
        #[arg(long)]
        user: UserId,
    },
}

#[derive(Subcommand)]
enum WorkoutCommands {
    /// Create a workout from a JSON request file
    Add {
        #[arg(long)]
        user: UserId,

        /// Path to the request JSON (eNames, eSets, eWeights, eReps, ...)
        #[arg(long)]
        request: PathBuf,
    },

    /// Update a workout from a JSON request file (numExercises 0 deletes it)
    Update {
        #[arg(long)]
        user: UserId,

        #[arg(long)]
        id: WorkoutId,

        #[arg(long)]
        request: PathBuf,
    },

    /// Delete a workout and its exercises
    Delete {
        #[arg(long)]
        user: UserId,

        #[arg(long)]
        id: WorkoutId,
    },

    /// Copy a workout and its exercises
    Duplicate {
        #[arg(long)]
        user: UserId,

        #[arg(long)]
        id: WorkoutId,
    },

    /// List a user's workouts
    List {
        #[arg(long)]
        user: UserId,

        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Show one workout with its exercises
    Show {
        #[arg(long)]
        user: UserId,

        #[arg(long)]
        id: WorkoutId,

        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PointsCommands {
    /// Add points to a user
    Add {
        #[arg(long)]
        user: UserId,

        #[arg(long)]
        increment: u64,
    },

    /// Award a star to a user
    Star {
        #[arg(long)]
        user: UserId,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    liftlog_core::logging::init();

    let cli = Cli::parse();
    run(cli).map_err(Error::into_public)
}

fn run(cli: Cli) -> Result<()> {
    if let Commands::Config { command } = &cli.command {
        return match command {
            ConfigCommands::Init { force } => {
                cmd_config_init(cli.config.clone(), cli.data_dir.clone(), *force)
            }
        };
    }

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    tracing::debug!("Using data directory {:?}", data_dir);

    let store = FileStore::open(&data_dir)?;
    let coordinator = WorkoutCoordinator::new(store, config.progression.rules());

    match cli.command {
        Commands::User { command } => match command {
            UserCommands::Create { name, metric } => {
                let units = if metric { Units::Metric } else { Units::Imperial };
                let user = coordinator.register_user(&name, units)?;
                println!("✓ Created user {}", user.id);
                display_user(&user);
            }
            UserCommands::Show { user } => display_user(&coordinator.user(user)?),
        },

        Commands::Workout { command } => match command {
            WorkoutCommands::Add { user, request } => {
                let req = load_request(&request)?;
                let views = coordinator.create_workout(user, &req)?;
                if let Some(created) = views.last() {
                    println!("✓ Created workout {}", created.workout.id);
                    display_workout(created);
                }
            }
            WorkoutCommands::Update { user, id, request } => {
                let req = load_request(&request)?;
                match coordinator.update_workout(user, id, &req)? {
                    UpdateOutcome::Updated(view) => {
                        println!("✓ Updated workout {}", id);
                        display_workout(&view);
                    }
                    UpdateOutcome::Deleted(remaining) => {
                        println!("✓ Deleted workout {}", id);
                        println!("  {} workouts remaining", remaining.len());
                    }
                }
            }
            WorkoutCommands::Delete { user, id } => {
                let remaining = coordinator.delete_workout(user, id)?;
                println!("✓ Deleted workout {}", id);
                println!("  {} workouts remaining", remaining.len());
            }
            WorkoutCommands::Duplicate { user, id } => {
                let views = coordinator.duplicate_workout(user, id)?;
                if let Some(copy) = views.last() {
                    println!("✓ Duplicated workout {} as {}", id, copy.workout.id);
                    display_workout(copy);
                }
            }
            WorkoutCommands::List { user, json } => {
                let views = coordinator.list_workouts(user)?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&views)?);
                } else if views.is_empty() {
                    println!("No workouts yet.");
                } else {
                    for view in &views {
                        display_workout(view);
                    }
                }
            }
            WorkoutCommands::Show { user, id, json } => {
                let view = coordinator.get_workout(user, id)?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&view)?);
                } else {
                    display_workout(&view);
                }
            }
        },

        Commands::Points { command } => match command {
            PointsCommands::Add { user, increment } => {
                let user = coordinator.award_points(user, increment)?;
                println!("✓ Added {} points", increment);
                display_user(&user);
            }
            PointsCommands::Star { user } => {
                let user = coordinator.award_star(user)?;
                println!("✓ Awarded a star");
                display_user(&user);
            }
        },

        // Handled before the store is opened
        Commands::Config { .. } => {}
    }

    Ok(())
}

fn cmd_config_init(path: Option<PathBuf>, data_dir: Option<PathBuf>, force: bool) -> Result<()> {
    let path = path.unwrap_or_else(Config::default_config_path);
    if path.exists() && !force {
        return Err(Error::Config(format!(
            "{} already exists; pass --force to replace it",
            path.display()
        )));
    }

    let mut config = Config::default();
    if let Some(data_dir) = data_dir {
        config.data.data_dir = data_dir;
    }
    config.save_to(&path)?;

    println!("✓ Wrote config to {}", path.display());
    Ok(())
}

fn load_request(path: &Path) -> Result<WorkoutRequest> {
    let contents = std::fs::read_to_string(path)?;
    let req = serde_json::from_str(&contents)?;
    Ok(req)
}

fn display_user(user: &User) {
    println!();
    println!("  {} ({:?})", user.name, user.units);
    println!("  Points:    {}", user.progress.points);
    println!("  Workouts:  {}", user.progress.num_workouts);
    println!("  Stars:     {}", user.progress.stars);
    println!("  Next star: at workout {}", user.progress.next_star);
    println!();
}

fn display_workout(view: &WorkoutView) {
    println!();
    println!("  {}  [{}]", view.workout.name, view.workout.id);
    println!(
        "  {} exercises, last shared {}",
        view.workout.num_exercises,
        view.workout.last_shared.format("%Y-%m-%d")
    );

    for exercise in &view.exercises {
        let sets: Vec<String> = exercise
            .weights
            .iter()
            .zip(&exercise.reps)
            .take(exercise.sets as usize)
            .map(|(weight, reps)| format!("{}x{}", weight, reps))
            .collect();
        println!(
            "  → {}: {} (PR {})",
            exercise.name,
            sets.join(", "),
            exercise.pr
        );
    }
    println!();
}
