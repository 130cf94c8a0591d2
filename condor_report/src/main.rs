use std::{
    fs,
    io::{self, Read as _, Write},
    path::Path,
};

use chrono::Local;
use clap::Parser as _;
use color_eyre::{eyre::Context as _, Result};
use condor_data::{parse_factor_log, process_status, FactorTable, JobTable};
use log::{debug, info, LevelFilter};
use serde_json::Value;

mod cli;
mod config;

use cli::Args;
use config::Settings;

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    init_logger(args.log_level);

    let settings = read_config()?;
    let readable = args.readable().unwrap_or(settings.readable);

    let status = read_input(&args.status)?;
    let table = process_status(&status)
        .wrap_err_with(|| format!("parsing status report {}", args.status.display()))?;
    info!("parsed {} jobs", table.len());

    let factors = args
        .factors
        .as_deref()
        .map(|path| -> Result<FactorTable> {
            let log = read_input(path)?;
            parse_factor_log(&log)
                .wrap_err_with(|| format!("parsing factor log {}", path.display()))
        })
        .transpose()?;

    let rows = to_rows(&table, readable, factors.as_ref())?;
    let out = if settings.pretty {
        serde_json::to_string_pretty(&rows)?
    } else {
        serde_json::to_string(&rows)?
    };

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{out}")?;
    stdout.flush()?;
    Ok(())
}

fn init_logger(level: LevelFilter) {
    env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%dT%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, level)
        .init();
}

fn read_config() -> Result<Settings> {
    info!("Loading config");
    Settings::new().context("parsing config file")
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).context("reading stdin")?;
        return Ok(buf);
    }
    fs::read_to_string(path).wrap_err_with(|| format!("reading {}", path.display()))
}

/// Serialised job rows, with the boost factors appended where the job id is in the log.
fn to_rows(table: &JobTable, readable: bool, factors: Option<&FactorTable>) -> Result<Vec<Value>> {
    table
        .iter()
        .map(|job| {
            let mut row = if readable {
                serde_json::to_value(job.readable())?
            } else {
                serde_json::to_value(job)?
            };
            let factor = factors.and_then(|factors| factors.get(&job.job_id));
            if let (Some(factor), Value::Object(row)) = (factor, &mut row) {
                debug!("job {}: boost {factor:?}", job.job_id);
                row.insert("disk_factor".into(), factor.disk_factor.into());
                row.insert("memory_factor".into(), factor.memory_factor.into());
            }
            Ok(row)
        })
        .collect()
}
