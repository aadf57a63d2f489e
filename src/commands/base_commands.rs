use clap::builder::RangedU64ValueParser;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use crate::domain::allocation::AllocationType;
use crate::domain::time_window::MAX_HORIZON_DAYS;
use crate::services::sensitivity_analysis::SensitivityMetric;

#[derive(Parser)]
#[command(author, version, about)]
pub struct CliArgs {
    #[command(flatten)]
    pub global: GlobalArgs,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Workspace YAML file holding scenarios and allocations
    #[arg(short, long, global = true, default_value = "workspace.yaml")]
    pub workspace: String,
    /// Engine config YAML file
    #[arg(long, global = true)]
    pub config: Option<String>,
    /// Seed for Monte Carlo and optimizer runs, overrides the config
    #[arg(long, global = true)]
    pub seed: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate a scenario: utilization, cost, risk, timeline and constraints
    Evaluate {
        /// Scenario id
        #[arg(short, long)]
        scenario: String,
        /// Evaluation horizon in days
        #[arg(long, value_parser = horizon_days_parser())]
        horizon: Option<usize>,
        /// Output file for the full result, YAML or .json
        #[arg(short, long)]
        output: Option<String>,
        /// Output PNG file for the simulated duration histogram
        #[arg(long)]
        histogram: Option<String>,
    },
    /// Compare two scenarios metric by metric
    Compare {
        /// First scenario id
        scenario_a: String,
        /// Second scenario id
        scenario_b: String,
        /// Output file, YAML or .json
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Report over-allocated employees in a scenario
    Conflicts {
        /// Scenario id
        #[arg(short, long)]
        scenario: String,
        /// Output file, YAML or .json
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Compare skill demand with configured skill capacity
    SkillGaps {
        /// Scenario id
        #[arg(short, long)]
        scenario: String,
        /// Output file, YAML or .json
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Measure how a metric reacts to parameter changes
    Sensitivity {
        /// Scenario id
        #[arg(short, long)]
        scenario: String,
        /// Parameter ids to vary, all numeric parameters when omitted
        #[arg(short, long = "parameter")]
        parameters: Vec<String>,
        /// Relative variations, e.g. -0.1 for -10%
        #[arg(long = "variation", allow_negative_numbers = true, allow_hyphen_values = true, value_delimiter = ',')]
        variations: Vec<f64>,
        /// Metric to observe
        #[arg(short, long, value_enum, default_value_t = SensitivityMetric::TotalCost)]
        metric: SensitivityMetric,
        /// Evaluation horizon in days
        #[arg(long, value_parser = horizon_days_parser())]
        horizon: Option<usize>,
        /// Output file, YAML or .json
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Search parameter settings that improve cost, timeline and risk
    Optimize {
        /// Scenario id
        #[arg(short, long)]
        scenario: String,
        /// Number of generations
        #[arg(short, long, default_value_t = 50)]
        generations: usize,
        /// Individuals per generation
        #[arg(short, long, default_value_t = 20)]
        population: usize,
        /// Weight of the cost objective
        #[arg(long, default_value_t = 0.4)]
        cost_weight: f64,
        /// Weight of the timeline objective
        #[arg(long, default_value_t = 0.3)]
        timeline_weight: f64,
        /// Weight of the risk objective
        #[arg(long, default_value_t = 0.3)]
        risk_weight: f64,
        /// Stop after this many seconds
        #[arg(long)]
        time_limit: Option<u64>,
        /// Save the optimized parameters back to the workspace
        #[arg(long)]
        apply: bool,
        /// Output file, YAML or .json
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Forecast a daily time series
    Forecast {
        /// Time series YAML file
        #[arg(short, long)]
        input: String,
        /// Days to forecast
        #[arg(long, default_value_t = 30, value_parser = horizon_days_parser())]
        horizon: usize,
        /// Output file, YAML or .json
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Copy a scenario and its allocations
    Duplicate {
        /// Scenario id
        #[arg(short, long)]
        scenario: String,
        /// Name of the copy
        #[arg(short, long)]
        name: String,
    },
    /// Add an allocation to a scenario, checking the employee's capacity
    Allocate {
        /// Scenario id
        #[arg(short, long)]
        scenario: String,
        /// Employee id
        #[arg(short, long)]
        employee: String,
        /// Project id
        #[arg(short, long)]
        project: String,
        /// Allocation percentage, 0-100
        #[arg(long)]
        percentage: f64,
        /// First allocated day (YYYY-MM-DD)
        #[arg(long)]
        start_date: String,
        /// Last allocated day (YYYY-MM-DD), open-ended when omitted
        #[arg(long)]
        end_date: Option<String>,
        /// Hourly rate used for cost estimates
        #[arg(long)]
        hourly_rate: Option<f64>,
        /// Allocation type
        #[arg(long, value_enum, default_value_t = AllocationType::Tentative)]
        allocation_type: AllocationType,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn horizon_days_parser() -> RangedU64ValueParser<usize> {
    RangedU64ValueParser::new().range(1..=MAX_HORIZON_DAYS as u64)
}
