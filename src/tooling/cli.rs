//! CLI Tooling
//!
//! Command-line interface over [`TrustRouter`]. Commands return their rendered output
//! as a string; the binary only prints it.

use crate::config::TrustRouterConfig;
use crate::error::RouterError;
use crate::logging::LoggingConfig;
use crate::router::{FindRequest, ListRequest, TrustRouter};
use crate::scoring::SortField;
use crate::types::{ScoredEntry, ServiceEntry};
use clap::{Args, Parser, Subcommand};
use comfy_table::Table;
use serde::Serialize;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

/// TrustRouter CLI - discover and rank ERC-8004 agents
#[derive(Parser)]
#[command(name = "trustrouter")]
#[command(about = "Reputation-aware discovery of agents registered on ERC-8004 registries")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub globals: GlobalArgs,

    /// Configuration file path (layered over the global config)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, global = true, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, both)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Fold the log flags into the configured logging settings.
    pub fn logging_config(&self, base: &LoggingConfig) -> LoggingConfig {
        let mut config = base.clone();
        if self.verbose {
            config.level = "debug".to_string();
        }
        if let Some(level) = &self.log_level {
            config.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            config.output = output.clone();
        }
        if let Some(file) = &self.log_file {
            config.file = Some(file.clone());
        }
        config
    }
}

/// Options shared by every registry command.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Chain to query
    #[arg(long, global = true, default_value = "base")]
    pub chain: String,

    /// Output format (table or json)
    #[arg(long, global = true, default_value = "table")]
    pub output: OutputFormat,

    /// Ignore the cache and re-read the registry
    #[arg(long, global = true)]
    pub refresh: bool,
}

impl Default for GlobalArgs {
    fn default() -> Self {
        Self {
            chain: "base".to_string(),
            output: OutputFormat::Table,
            refresh: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "table" | "text" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format: {} (expected table or json)", other)),
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Find the most trusted agents for a task
    Find {
        /// Task description; each word is a keyword
        task: String,
        /// Required service type (mcp, a2a, web, x402, ...)
        #[arg(long = "type")]
        service_type: Option<String>,
        /// Maximum number of results
        #[arg(long, default_value = "5")]
        limit: usize,
    },
    /// List agents ranked by reputation, name or recency
    List {
        /// Sort field (reputation, name, recent)
        #[arg(long, default_value = "reputation")]
        sort: SortField,
        /// Required service type
        #[arg(long = "type")]
        service_type: Option<String>,
        /// Maximum number of results
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Show one agent by id or name
    Inspect {
        /// Numeric agent id or (partial) agent name
        agent: String,
    },
    /// List supported chains and their endpoint override variables
    Chains,
}

/// Agent as rendered in JSON output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentView {
    pub agent_id: u64,
    pub name: String,
    pub description: String,
    pub trust_score: f64,
    pub feedback_count: u64,
    pub avg_score: f64,
    pub validation_count: u64,
    pub validation_avg: f64,
    pub services: Vec<ServiceEntry>,
    pub x402_support: bool,
    pub x402_endpoint: Option<String>,
    pub owner: String,
}

impl From<&ScoredEntry> for AgentView {
    fn from(entry: &ScoredEntry) -> Self {
        let agent = &entry.agent;
        let registration = &agent.registration;
        Self {
            agent_id: agent.id,
            name: registration.display_name().to_string(),
            description: registration.description.clone().unwrap_or_default(),
            trust_score: entry.trust_score,
            feedback_count: agent.feedback_count,
            avg_score: agent.avg_score,
            validation_count: agent.validation_count,
            validation_avg: agent.validation_avg,
            services: registration.services().to_vec(),
            x402_support: registration.supports_x402(),
            x402_endpoint: registration.x402_endpoint().map(str::to_string),
            owner: agent.owner.clone(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FindOutput<'a> {
    chain: &'a str,
    task: &'a str,
    agents: Vec<AgentView>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListOutput<'a> {
    chain: &'a str,
    total: u64,
    agents: Vec<AgentView>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InspectOutput<'a> {
    chain: &'a str,
    #[serde(flatten)]
    agent: AgentView,
    supported_trust: &'a [String],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChainOutput<'a> {
    name: &'a str,
    chain_id: u64,
    env_var: String,
    endpoints: &'a [String],
}

/// CLI context for executing commands
pub struct CliContext {
    router: TrustRouter,
    runtime: tokio::runtime::Runtime,
}

impl CliContext {
    /// Create a new CLI context from loaded configuration
    pub fn new(config: &TrustRouterConfig) -> Result<Self, RouterError> {
        Self::with_router(TrustRouter::new(config)?)
    }

    /// Create a CLI context around an existing router
    pub fn with_router(router: TrustRouter) -> Result<Self, RouterError> {
        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| RouterError::Runtime(format!("Failed to create runtime: {}", e)))?;
        Ok(Self { router, runtime })
    }

    pub fn router(&self) -> &TrustRouter {
        &self.router
    }

    /// Execute a CLI command
    pub fn execute(&self, command: &Commands, globals: &GlobalArgs) -> Result<String, RouterError> {
        info!(command = command_name(command), chain = %globals.chain, "executing command");
        match command {
            Commands::Find {
                task,
                service_type,
                limit,
            } => {
                let request = FindRequest {
                    chain: globals.chain.clone(),
                    task: Some(task.clone()),
                    service_type: service_type.clone(),
                    limit: *limit,
                    force_refresh: globals.refresh,
                };
                let entries = self.runtime.block_on(self.router.find(&request))?;
                match globals.output {
                    OutputFormat::Json => to_json(&FindOutput {
                        chain: &globals.chain,
                        task,
                        agents: entries.iter().map(AgentView::from).collect(),
                    }),
                    OutputFormat::Table => Ok(format_find_text(task, &globals.chain, &entries)),
                }
            }
            Commands::List {
                sort,
                service_type,
                limit,
            } => {
                let request = ListRequest {
                    chain: globals.chain.clone(),
                    sort: *sort,
                    service_type: service_type.clone(),
                    limit: *limit,
                    force_refresh: globals.refresh,
                };
                let listing = self.runtime.block_on(self.router.list(&request))?;
                match globals.output {
                    OutputFormat::Json => to_json(&ListOutput {
                        chain: &globals.chain,
                        total: listing.total,
                        agents: listing.entries.iter().map(AgentView::from).collect(),
                    }),
                    OutputFormat::Table => Ok(format!(
                        "{}\n\nShowing {} of {} agents on {} (sorted by {})",
                        format_agent_table(&listing.entries),
                        listing.entries.len(),
                        listing.total,
                        globals.chain,
                        sort
                    )),
                }
            }
            Commands::Inspect { agent } => {
                let entry = self.runtime.block_on(self.router.inspect(
                    &globals.chain,
                    agent,
                    globals.refresh,
                ))?;
                match globals.output {
                    OutputFormat::Json => to_json(&InspectOutput {
                        chain: &globals.chain,
                        agent: AgentView::from(&entry),
                        supported_trust: entry.agent.registration.supported_trust(),
                    }),
                    OutputFormat::Table => Ok(format_inspect_text(&globals.chain, &entry)),
                }
            }
            Commands::Chains => {
                let specs = self.router.catalog().specs();
                match globals.output {
                    OutputFormat::Json => to_json(
                        &specs
                            .iter()
                            .map(|spec| ChainOutput {
                                name: &spec.name,
                                chain_id: spec.chain_id,
                                env_var: spec.env_var(),
                                endpoints: &spec.endpoints,
                            })
                            .collect::<Vec<_>>(),
                    ),
                    OutputFormat::Table => {
                        let mut table = Table::new();
                        table.set_header(vec!["Chain", "Chain ID", "Override", "Endpoints"]);
                        for spec in specs {
                            table.add_row(vec![
                                spec.name.clone(),
                                spec.chain_id.to_string(),
                                spec.env_var(),
                                spec.endpoints.len().to_string(),
                            ]);
                        }
                        Ok(table.to_string())
                    }
                }
            }
        }
    }
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Find { .. } => "find",
        Commands::List { .. } => "list",
        Commands::Inspect { .. } => "inspect",
        Commands::Chains => "chains",
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, RouterError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| RouterError::Runtime(format!("Failed to serialize output: {}", e)))
}

fn service_names(services: &[ServiceEntry]) -> String {
    if services.is_empty() {
        return "-".to_string();
    }
    services
        .iter()
        .map(|svc| svc.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Format ranked agents as a table
fn format_agent_table(entries: &[ScoredEntry]) -> String {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Trust", "Feedback", "Avg", "Services", "x402"]);
    for entry in entries {
        let agent = &entry.agent;
        table.add_row(vec![
            agent.id.to_string(),
            agent.registration.display_name().to_string(),
            format!("{:.2}", entry.trust_score),
            agent.feedback_count.to_string(),
            format!("{:.1}", agent.avg_score),
            service_names(agent.registration.services()),
            if agent.registration.supports_x402() { "yes" } else { "no" }.to_string(),
        ]);
    }
    table.to_string()
}

fn format_find_text(task: &str, chain: &str, entries: &[ScoredEntry]) -> String {
    if entries.is_empty() {
        return format!("No agents on {} match \"{}\".", chain, task);
    }
    format!(
        "Top {} agent(s) on {} for \"{}\":\n{}",
        entries.len(),
        chain,
        task,
        format_agent_table(entries)
    )
}

/// Format a single agent as a field/value table
fn format_inspect_text(chain: &str, entry: &ScoredEntry) -> String {
    let agent = &entry.agent;
    let registration = &agent.registration;
    let mut table = Table::new();
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec!["Agent ID".to_string(), agent.id.to_string()]);
    table.add_row(vec!["Chain".to_string(), chain.to_string()]);
    table.add_row(vec!["Name".to_string(), registration.display_name().to_string()]);
    if let Some(description) = &registration.description {
        table.add_row(vec!["Description".to_string(), description.clone()]);
    }
    table.add_row(vec!["Owner".to_string(), agent.owner.clone()]);
    table.add_row(vec!["Trust score".to_string(), format!("{:.2}", entry.trust_score)]);
    table.add_row(vec![
        "Feedback".to_string(),
        format!("{} (avg {:.1})", agent.feedback_count, agent.avg_score),
    ]);
    table.add_row(vec![
        "Validations".to_string(),
        format!("{} (avg {:.1})", agent.validation_count, agent.validation_avg),
    ]);
    table.add_row(vec![
        "x402".to_string(),
        match registration.x402_endpoint() {
            Some(endpoint) if registration.supports_x402() => format!("yes ({})", endpoint),
            _ if registration.supports_x402() => "yes".to_string(),
            _ => "no".to_string(),
        },
    ]);
    for svc in registration.services() {
        let label = match &svc.version {
            Some(version) => format!("{} {}", svc.name, version),
            None => svc.name.clone(),
        };
        table.add_row(vec![format!("Service: {}", label), svc.endpoint.clone()]);
    }
    if !registration.supported_trust().is_empty() {
        table.add_row(vec![
            "Supported trust".to_string(),
            registration.supported_trust().join(", "),
        ]);
    }
    table.to_string()
}
