// LoanOfficerAI - command line
//
//   loan-officer-ai functions                 list callable functions
//   loan-officer-ai call <name> --args JSON   run one function through the dispatcher
//   loan-officer-ai check                     integrity report over the data files

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use loan_officer_ai::{
    check_integrity, logging, DataStore, Dispatcher, FunctionRegistry, InternalApi,
    RequestContext, Severity, StoreApi,
};

#[derive(Parser, Debug)]
#[command(name = "loan-officer-ai")]
#[command(about = "Agricultural loan data and function-calling toolkit", version)]
struct Args {
    /// Directory holding borrowers.json, loans.json, ...
    #[arg(long, global = true, env = "LOANAI_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List callable functions
    Functions {
        /// Print the full JSON schemas instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Call one function the way the chat model would
    Call {
        /// Function name, e.g. getBorrowerDefaultRisk
        name: String,

        /// Arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,

        /// User id recorded in the logs
        #[arg(long, default_value = "cli")]
        user: String,

        /// Evaluate payment windows as of this date (YYYY-MM-DD)
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Check the data files for broken references and implausible values
    Check,
}

fn main() -> Result<()> {
    logging::init_stderr_tracing();
    let args = Args::parse();

    match args.command {
        Commands::Functions { json } => list_functions(json),
        Commands::Call { name, args: raw, user, as_of } => call_function(&args.data_dir, &name, &raw, &user, as_of),
        Commands::Check => run_check(&args.data_dir),
    }
}

fn list_functions(json: bool) -> Result<()> {
    let registry = FunctionRegistry::new();

    if json {
        println!("{}", serde_json::to_string_pretty(&registry.schemas())?);
        return Ok(());
    }

    println!("📋 {} callable functions", registry.len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for descriptor in registry.list() {
        let required = descriptor.parameters.required_names().join(", ");
        println!("  {:<34} ({})", descriptor.name, required);
        println!("      {}", descriptor.description);
    }
    Ok(())
}

fn call_function(data_dir: &Path, name: &str, raw: &str, user: &str, as_of: Option<NaiveDate>) -> Result<()> {
    let arguments: Value = serde_json::from_str(raw).with_context(|| format!("--args is not valid JSON: {}", raw))?;

    let mut api = StoreApi::new(DataStore::new(data_dir));
    if let Some(date) = as_of {
        api = api.with_as_of(date);
    }
    let api: Arc<dyn InternalApi> = Arc::new(api);
    let dispatcher = Dispatcher::new(Arc::new(FunctionRegistry::new()), api);

    let ctx = RequestContext::new(user);
    match dispatcher.dispatch(&ctx, name, &arguments) {
        Ok(payload) => {
            println!("{}", serde_json::to_string_pretty(&payload)?);
            Ok(())
        }
        Err(err) => {
            println!("{}", serde_json::to_string_pretty(&err.to_payload(name))?);
            bail!("{} failed: {}", name, err)
        }
    }
}

fn run_check(data_dir: &Path) -> Result<()> {
    println!("🔍 Checking data in {}", data_dir.display());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let report = check_integrity(&DataStore::new(data_dir))
        .with_context(|| format!("failed to load data from {}", data_dir.display()))?;

    for issue in &report.issues {
        let marker = match issue.severity {
            Severity::Critical => "❌",
            Severity::Warning => "⚠️ ",
        };
        println!(
            "{} {} {} [{}]: {}",
            marker,
            issue.entity.label(),
            issue.record_id,
            issue.field,
            issue.issue
        );
    }

    println!("\n{}", report.summary());
    if report.has_critical_issues() {
        bail!("{} critical issue(s) found", report.critical_count());
    }
    if report.is_clean() {
        println!("✅ Data is consistent");
    }
    Ok(())
}
