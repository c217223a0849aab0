use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use workout_core::*;

#[derive(Parser)]
#[command(name = "workout")]
#[command(about = "Step-by-step workout mode for your training plans", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Act as this user (defaults to config, then $USER)
    #[arg(long, global = true)]
    user: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a workout run of a plan
    Start {
        /// Plan to work through
        #[arg(long)]
        plan: PlanId,

        /// Rest between sets in seconds (defaults to config)
        #[arg(long, allow_negative_numbers = true)]
        rest: Option<i64>,
    },

    /// Complete the current exercise and move to the next one
    Complete,

    /// Show the exercise currently in progress
    Status,

    /// Manage workout plans
    #[command(subcommand)]
    Plan(PlanCommand),

    /// List exercises available for plans
    Exercises,

    /// Show finished workouts
    History,
}

#[derive(Subcommand)]
enum PlanCommand {
    /// Create a plan from library exercises
    Add(PlanAddArgs),

    /// List your plans
    List,

    /// Show one plan
    Show { id: PlanId },

    /// Delete a plan and any session left on it
    Remove { id: PlanId },
}

#[derive(Args)]
struct PlanAddArgs {
    /// Plan name
    #[arg(long)]
    name: String,

    /// How often the plan is done, e.g. "3x/week"
    #[arg(long)]
    frequency: Option<String>,

    /// Training goal
    #[arg(long)]
    goal: Option<String>,

    /// Session length in minutes
    #[arg(long)]
    duration: Option<u32>,

    /// Exercise as NAME or NAME:SETSxREPS, in order (repeatable)
    #[arg(long = "exercise", value_parser = parse_exercise_arg)]
    exercises: Vec<ExerciseEntry>,
}

struct Paths {
    plans: PathBuf,
    history: PathBuf,
    data_dir: PathBuf,
}

impl Paths {
    fn new(data_dir: PathBuf) -> Self {
        Self {
            plans: data_dir.join("plans.json"),
            history: data_dir.join("runs.csv"),
            data_dir,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        workout_core::logging::init_with_level("debug");
    } else {
        workout_core::logging::init();
    }

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Determine data directory and acting user
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());
    let paths = Paths::new(data_dir);
    let user = config.resolve_user(cli.user.clone());
    tracing::debug!("Acting as {} with data in {:?}", user, paths.data_dir);

    match cli.command {
        Commands::Start { plan, rest } => {
            let rest = rest.unwrap_or(config.workout.default_rest_interval);
            cmd_start(&paths, &user, plan, rest, cli.json)
        }
        Commands::Complete => cmd_complete(&paths, &user, cli.json),
        Commands::Status => cmd_status(&paths, &user, cli.json),
        Commands::Plan(PlanCommand::Add(args)) => cmd_plan_add(&paths, &user, args, cli.json),
        Commands::Plan(PlanCommand::List) => cmd_plan_list(&paths, &user, cli.json),
        Commands::Plan(PlanCommand::Show { id }) => cmd_plan_show(&paths, &user, id, cli.json),
        Commands::Plan(PlanCommand::Remove { id }) => cmd_plan_remove(&paths, &user, id),
        Commands::Exercises => cmd_exercises(cli.json),
        Commands::History => cmd_history(&paths, &user, cli.json),
    }
}

fn cmd_start(paths: &Paths, user: &str, plan_id: PlanId, rest: i64, json: bool) -> Result<()> {
    // Plan removal waits until the run is created
    let (record, total) = PlanBook::read(&paths.plans, |book| {
        let engine = ProgressionEngine::new(
            book.for_user(user),
            JsonlStore::in_data_dir(&paths.data_dir),
        );
        let record = engine.start_run(user, plan_id, rest)?;
        Ok((record, plan_total(engine.catalog(), plan_id)))
    })?;

    if json {
        return print_json(&record);
    }

    println!("\n✓ Workout started!");
    display_session(&record, total);
    Ok(())
}

/// Advance the run and record it in history once it finishes
///
/// The run's session records are deleted before history is written, so a
/// failed history write is reported but does not fail the command.
fn cmd_complete(paths: &Paths, user: &str, json: bool) -> Result<()> {
    let (outcome, total) = PlanBook::read(&paths.plans, |book| {
        let engine = ProgressionEngine::new(
            book.for_user(user),
            JsonlStore::in_data_dir(&paths.data_dir),
        );
        let outcome = engine.advance_run(user)?;
        let total = outcome
            .session()
            .and_then(|session| plan_total(engine.catalog(), session.plan_id));
        Ok((outcome, total))
    })?;

    if let RunOutcome::Finished { summary } = &outcome {
        if let Err(e) = append_run(&paths.history, summary) {
            tracing::error!("Failed to append run to {:?}: {}", paths.history, e);
            eprintln!("Could not save workout history: {}", e);
        }
    }

    if json {
        return print_json(&outcome);
    }

    match &outcome {
        RunOutcome::Next { session } => {
            println!("\n✓ Exercise complete!");
            display_session(session, total);
        }
        RunOutcome::Finished { summary } => {
            println!("\n✓ Workout finished!");
            println!(
                "  {} exercises in {} min",
                summary.exercises_completed,
                (summary.finished_at - summary.started_at).num_minutes()
            );
        }
    }
    Ok(())
}

fn cmd_status(paths: &Paths, user: &str, json: bool) -> Result<()> {
    let book = PlanBook::load(&paths.plans)?;
    let engine = ProgressionEngine::new(
        book.for_user(user),
        JsonlStore::in_data_dir(&paths.data_dir),
    );

    let active = engine.active_session(user)?;

    if json {
        return print_json(&active);
    }

    match active {
        Some(record) => display_session(&record, plan_total(engine.catalog(), record.plan_id)),
        None => println!("No active workout session."),
    }
    Ok(())
}

fn cmd_plan_add(paths: &Paths, user: &str, args: PlanAddArgs, json: bool) -> Result<()> {
    let library = get_default_library();
    let errors = library.validate();
    if !errors.is_empty() {
        eprintln!("Exercise library validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::Config("Invalid exercise library".into()));
    }

    let draft = PlanDraft {
        name: args.name,
        frequency: args.frequency,
        goal: args.goal,
        session_duration: args.duration,
        exercises: args.exercises,
    };

    let plan = PlanBook::update(&paths.plans, |book| book.create_plan(user, draft, library))?;

    if json {
        return print_json(&plan);
    }

    println!("✓ Workout plan created (id {})", plan.id);
    display_plan(&plan);
    Ok(())
}

fn cmd_plan_list(paths: &Paths, user: &str, json: bool) -> Result<()> {
    let book = PlanBook::load(&paths.plans)?;
    let plans: Vec<_> = book.plans_for(user).collect();

    if json {
        return print_json(&plans);
    }

    if plans.is_empty() {
        println!("No workout plans yet. Create one with `workout plan add`.");
        return Ok(());
    }

    for plan in plans {
        println!(
            "  [{}] {} ({} exercises){}",
            plan.id,
            plan.name,
            plan.exercises.len(),
            plan.goal
                .as_deref()
                .map(|g| format!(" - {}", g))
                .unwrap_or_default()
        );
    }
    Ok(())
}

fn cmd_plan_show(paths: &Paths, user: &str, id: PlanId, json: bool) -> Result<()> {
    let book = PlanBook::load(&paths.plans)?;
    let plan = book.plan(user, id)?;

    if json {
        return print_json(plan);
    }

    display_plan(plan);
    Ok(())
}

fn cmd_plan_remove(paths: &Paths, user: &str, id: PlanId) -> Result<()> {
    let store = JsonlStore::in_data_dir(&paths.data_dir);

    // A run on a deleted plan could never advance again. Both steps happen
    // under the plan lock so no run can start on the plan in between.
    let (removed, dropped) = PlanBook::update(&paths.plans, |book| {
        let removed = book.remove_plan(user, id)?;
        let dropped = store.transact(|table| Ok(table.delete_all_for_plan(user, id)))?;
        Ok((removed, dropped))
    })?;
    if dropped > 0 {
        tracing::info!("Dropped {} session records of removed plan {}", dropped, id);
    }

    println!("✓ Workout plan '{}' deleted", removed.name);
    Ok(())
}

fn cmd_exercises(json: bool) -> Result<()> {
    let library = get_default_library();

    if json {
        return print_json(&library.exercises);
    }

    for exercise in &library.exercises {
        println!(
            "  {:<18} difficulty {}  {}",
            exercise.name, exercise.difficulty, exercise.target_muscles
        );
    }
    Ok(())
}

fn cmd_history(paths: &Paths, user: &str, json: bool) -> Result<()> {
    let runs = load_run_history(&paths.history, Some(user))?;

    if json {
        return print_json(&runs);
    }

    if runs.is_empty() {
        println!("No finished workouts yet.");
        return Ok(());
    }

    for run in runs {
        println!(
            "  {}  plan {}  {} exercises  {}s rest",
            run.finished_at
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M"),
            run.plan_id,
            run.exercises_completed,
            run.rest_interval
        );
    }
    Ok(())
}

fn plan_total(catalog: &impl PlanCatalog, plan_id: PlanId) -> Option<usize> {
    catalog.exercises_for(plan_id).ok().map(|e| e.len())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn display_session(record: &SessionRecord, total: Option<usize>) {
    println!("\n╭─────────────────────────────────────────╮");
    match total {
        Some(total) => println!("│  EXERCISE {} OF {}", record.position + 1, total),
        None => println!("│  EXERCISE {}", record.position + 1),
    }
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  {}", record.exercise_name);

    match (record.sets, record.reps) {
        (Some(sets), Some(reps)) => println!("  → {} sets x {} reps", sets, reps),
        (Some(sets), None) => println!("  → {} sets", sets),
        (None, Some(reps)) => println!("  → {} reps", reps),
        (None, None) => {}
    }
    println!("  → Rest: {}s between sets", record.rest_interval);
    println!();
    println!("Run `workout complete` when done.");
}

fn display_plan(plan: &WorkoutPlan) {
    println!("\n  {} (plan {})", plan.name, plan.id);
    if let Some(ref frequency) = plan.frequency {
        println!("  Frequency: {}", frequency);
    }
    if let Some(ref goal) = plan.goal {
        println!("  Goal: {}", goal);
    }
    if let Some(duration) = plan.session_duration {
        println!("  Session: {} min", duration);
    }
    println!();

    for (idx, entry) in plan.exercises.iter().enumerate() {
        let targets = match (entry.sets, entry.reps) {
            (Some(sets), Some(reps)) => format!("{}x{}", sets, reps),
            (Some(sets), None) => format!("{} sets", sets),
            (None, Some(reps)) => format!("{} reps", reps),
            (None, None) => String::new(),
        };
        println!("  {}. {} {}", idx + 1, entry.name, targets);
    }
    println!();
}

/// Parse `NAME` or `NAME:SETSxREPS` into a plan entry
fn parse_exercise_arg(value: &str) -> std::result::Result<ExerciseEntry, String> {
    let (name, targets) = match value.rsplit_once(':') {
        Some((name, targets)) => (name, Some(targets)),
        None => (value, None),
    };

    let name = name.trim();
    if name.is_empty() {
        return Err("exercise name is empty".into());
    }

    let Some(targets) = targets else {
        return Ok(ExerciseEntry::new(name, None, None));
    };

    let (sets, reps) = targets
        .trim()
        .to_lowercase()
        .split_once('x')
        .map(|(s, r)| (s.trim().parse::<u32>(), r.trim().parse::<u32>()))
        .ok_or_else(|| format!("expected NAME:SETSxREPS, got '{}'", value))?;

    match (sets, reps) {
        (Ok(sets), Ok(reps)) => Ok(ExerciseEntry::new(name, Some(sets), Some(reps))),
        _ => Err(format!("invalid sets/reps in '{}'", value)),
    }
}
