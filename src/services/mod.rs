pub mod comparison;
pub mod conflict_detector;
pub mod demand_aggregator;
pub mod demand_templates;
pub mod engine_config_yaml;
pub mod evaluation_types;
pub mod forecast_engine;
pub mod genetic_operators;
pub mod histogram;
pub mod planning_service;
pub mod repository;
pub mod risk_simulation;
pub mod scenario_evaluator;
pub mod scenario_optimizer;
pub mod sensitivity_analysis;
pub mod statistics;
pub mod time_series;
pub mod time_series_yaml;
pub mod timeline_analysis;
pub mod ttl_cache;
pub mod workspace_yaml;
