//! Ingest HPKP violation reports from the command line.
//!
//! Reads one JSON report body from stdin and stores it in the database named
//! by `HPKP_DATABASE_PATH`. With `--batch`, stdin holds one report per line
//! and the lines are ingested on the worker pool.
//!
//! ```text
//! hpkp-ingest [--batch] [REMOTE_ADDR] [USER_AGENT]
//! ```
//!
//! `HTTP_X_FORWARDED_FOR`, if set, takes precedence over `REMOTE_ADDR`.

use std::io::Read;

use anyhow::{bail, Context, Result};

use hpkp_report_core::config::{StoreConfig, WorkerConfig};
use hpkp_report_core::pipeline::workers::{run_workers, Submission};
use hpkp_report_core::{ingest_json, init_logger, request_ip, ReportStore, SubmissionContext};

fn main() -> Result<()> {
    init_logger();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let batch = match args.first() {
        Some(flag) if flag == "--batch" => {
            args.remove(0);
            true
        }
        _ => false,
    };
    let remote_addr = args.first().cloned().unwrap_or_default();
    let user_agent = args.get(1).cloned().unwrap_or_default();
    let forwarded_for = std::env::var("HTTP_X_FORWARDED_FOR").ok();
    let ip = request_ip(forwarded_for.as_deref(), &remote_addr);

    let store_config = StoreConfig::from_env().context("reading store configuration")?;

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("reading report from stdin")?;

    if batch {
        let worker_config = WorkerConfig::from_env().context("reading worker configuration")?;
        let submissions: Vec<Submission> = input
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| Submission::new(line, &ip, &user_agent))
            .collect();

        let results = run_workers(&store_config, &worker_config, submissions);
        let failed = results.iter().filter(|r| r.is_err()).count();
        for (line, result) in results.iter().enumerate() {
            match result {
                Ok(id) => println!("{}\tstored\t{}", line, id),
                Err(e) => println!("{}\trejected\t{}", line, e),
            }
        }
        if failed > 0 {
            bail!("{} of {} reports were not stored", failed, results.len());
        }
        return Ok(());
    }

    let mut store = ReportStore::open(&store_config)
        .with_context(|| format!("opening {}", store_config.database_path.display()))?;
    let ctx = SubmissionContext::new(&ip, &user_agent);
    let report_id = ingest_json(&mut store, &ctx, &input)
        .with_context(|| format!("ingesting submission {}", ctx.submission_id))?;

    println!("{}", report_id);
    Ok(())
}
