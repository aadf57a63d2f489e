#![allow(dead_code)]

use assert_fs::prelude::*;

pub const WORKSPACE: &str = r#"
scenarios:
  - id: S1
    name: Growth 2026
    scenario_type: growth
    base_date: 2026-01-01
    created_at: 2025-12-01T09:00:00Z
    updated_at: 2025-12-01T09:00:00Z
    parameters:
      - id: team
        kind: team_size_multiplier
        value: { type: number, value: 1.2 }
        min: 0.5
        max: 2.0
      - id: buffer
        kind: timeline_buffer
        value: { type: percentage, value: 10 }
    constraints:
      - type: budget_limit
        max_total_cost: 400000
    projects:
      - id: P1
        name: Platform
        project_type: software
        priority: high
        start_date: 2026-01-05
        end_date: 2026-04-30
        team_size: 4
        required_skills: [rust, design]
      - id: P2
        name: Migration
        probability: 0.9
        start_date: 2026-03-01
        end_date: 2026-05-31
        team_size: 2
        required_skills: [rust]
        depends_on: [P1]
  - id: S2
    name: Lean 2026
    scenario_type: contraction
    base_date: 2026-01-01
    created_at: 2025-12-01T09:00:00Z
    updated_at: 2025-12-01T09:00:00Z
    projects:
      - id: P1
        name: Platform
        start_date: 2026-01-05
        end_date: 2026-04-30
        team_size: 2
        required_skills: [rust]
scenario_allocations:
  - id: A1
    scenario_id: S1
    project_id: P1
    employee_id: E1
    allocation_percentage: 60
    start_date: 2026-01-05
    end_date: 2026-03-31
  - id: A2
    scenario_id: S1
    project_id: P2
    employee_id: E1
    allocation_percentage: 50
    start_date: 2026-03-01
    end_date: 2026-05-31
allocations:
  - employee_id: E7
    project_id: OPS
    start_date: 2025-06-01
    allocation_percentage: 100
"#;

pub const CONFIG: &str = r#"
total_capacity: 10
skill_capacity:
  rust: 3
  design: 2
monte_carlo_iterations: 200
seed: 7
"#;

pub struct Fixture {
    pub dir: assert_fs::TempDir,
    pub workspace: String,
    pub config: String,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = assert_fs::TempDir::new().unwrap();
        let workspace = dir.child("workspace.yaml");
        workspace.write_str(WORKSPACE).unwrap();
        let config = dir.child("engine.yaml");
        config.write_str(CONFIG).unwrap();
        Self {
            workspace: workspace.path().to_str().unwrap().to_string(),
            config: config.path().to_str().unwrap().to_string(),
            dir,
        }
    }

    pub fn path(&self, name: &str) -> String {
        self.dir.child(name).path().to_str().unwrap().to_string()
    }

    /// A `scenarios` invocation pointed at this workspace and config.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo_bin_cmd!("scenarios");
        cmd.args(["-w", &self.workspace, "--config", &self.config]);
        cmd
    }
}
