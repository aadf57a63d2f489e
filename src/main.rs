use clap::{CommandFactory, Parser};
use clap_complete::generate;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use scenarios::commands::allocate_cmd::allocate_command;
use scenarios::commands::base_commands::{CliArgs, Commands};
use scenarios::commands::command_context::CommandError;
use scenarios::commands::compare_cmd::compare_command;
use scenarios::commands::conflicts_cmd::conflicts_command;
use scenarios::commands::duplicate_cmd::duplicate_command;
use scenarios::commands::evaluate_cmd::evaluate_command;
use scenarios::commands::forecast_cmd::forecast_command;
use scenarios::commands::optimize_cmd::optimize_command;
use scenarios::commands::sensitivity_cmd::sensitivity_command;
use scenarios::commands::skill_gaps_cmd::skill_gaps_command;

fn main() {
    // Logs go to stderr so reports on stdout stay clean.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = CliArgs::parse();
    if let Err(e) = run(args) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(args: CliArgs) -> Result<(), CommandError> {
    let global = args.global;
    match args.command {
        cmd @ Commands::Evaluate { .. } => evaluate_command(&global, cmd),
        cmd @ Commands::Compare { .. } => compare_command(&global, cmd),
        cmd @ Commands::Conflicts { .. } => conflicts_command(&global, cmd),
        cmd @ Commands::SkillGaps { .. } => skill_gaps_command(&global, cmd),
        cmd @ Commands::Sensitivity { .. } => sensitivity_command(&global, cmd),
        cmd @ Commands::Optimize { .. } => optimize_command(&global, cmd),
        cmd @ Commands::Forecast { .. } => forecast_command(cmd),
        cmd @ Commands::Duplicate { .. } => duplicate_command(&global, cmd),
        cmd @ Commands::Allocate { .. } => allocate_command(&global, cmd),
        Commands::Completions { shell } => {
            let mut command = CliArgs::command();
            generate(shell, &mut command, "scenarios", &mut std::io::stdout());
            Ok(())
        }
    }
}
