//! Per-job correction factors from a hand-maintained boost log.
//!
//! ```text
//! # boost_all 1.0 1.2
//! 6382.004
//! 6382.049
//!
//! # boost_all 1.0 1.2
//! 6382.004
//! ```
//!
//! A `# boost_all <disk> <memory>` directive sets the factors for every job line below it, until
//! the next directive. Each job line multiplies that job's running factors (starting at `1.0`) by
//! the directive currently in effect, so `6382.004` above ends up at `(1.0, 1.44)`.

use std::collections::HashMap;

use derive_more::derive::Deref;
use log::{debug, trace};
use serde::Serialize;
use thiserror::Error;

const DIRECTIVE: &str = "# boost_all ";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobFactor {
    /// `<cluster>.<job>` with the job part padded to three digits, same as `condor_q` prints it
    pub job_id: String,
    pub disk_factor: f64,
    pub memory_factor: f64,
}

/// Factors in order of first appearance in the log.
#[derive(Debug, Clone, PartialEq, Default, Deref, Serialize)]
#[serde(transparent)]
pub struct FactorTable {
    #[deref]
    factors: Vec<JobFactor>,
    /// padded job id -> position in `factors`
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl FactorTable {
    /// Looks up a job by id. `6382.4` and `6382.004` name the same job.
    pub fn get(&self, job_id: &str) -> Option<&JobFactor> {
        let key = parse_job_key(job_id.trim())?;
        self.index.get(&key).and_then(|&slot| self.factors.get(slot))
    }

    pub fn into_inner(self) -> Vec<JobFactor> {
        self.factors
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FactorLogError {
    #[error("line {line_number}: job `{line}` comes before any `# boost_all` directive")]
    MissingDirective { line_number: usize, line: String },
    #[error("line {line_number}: expected `# boost_all <disk> <memory>`, got `{line}`")]
    InvalidDirective { line_number: usize, line: String },
    #[error("line {line_number}: expected `<cluster>.<job>`, got `{line}`")]
    InvalidJobId { line_number: usize, line: String },
    #[error("factor log contains no job ids")]
    Empty,
}

/// Disk & memory factor of a directive
#[derive(Debug, Clone, Copy, PartialEq)]
struct Boost {
    disk: f64,
    memory: f64,
}

fn parse_directive(arguments: &str) -> Option<Boost> {
    let mut factors = arguments.split(' ').map(|f| f.parse::<f64>().ok());
    match (factors.next(), factors.next(), factors.next()) {
        (Some(Some(disk)), Some(Some(memory)), None) => Some(Boost { disk, memory }),
        _ => None,
    }
}

fn parse_job_key(line: &str) -> Option<String> {
    let (cluster, job) = line.split_once('.')?;
    let cluster = cluster.parse::<u64>().ok()?;
    let job = job.parse::<u64>().ok()?;
    Some(format!("{cluster}.{job:03}"))
}

/// Single pass over the log, accumulating into an insertion-ordered table.
pub fn aggregate_factors<I, S>(lines: I) -> Result<FactorTable, FactorLogError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut factors: Vec<JobFactor> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut current: Option<Boost> = None;

    for (i, line) in lines.into_iter().enumerate() {
        let line_number = i + 1;
        let line = line.as_ref().trim_end();
        if line.trim_start().is_empty() {
            continue;
        }

        if let Some(arguments) = line.strip_prefix(DIRECTIVE) {
            let boost = parse_directive(arguments).ok_or_else(|| {
                FactorLogError::InvalidDirective { line_number, line: line.to_owned() }
            })?;
            trace!("line {line_number}: boost {boost:?}");
            current = Some(boost);
            continue;
        }
        if line.starts_with(DIRECTIVE.trim_end()) {
            return Err(FactorLogError::InvalidDirective { line_number, line: line.to_owned() });
        }

        let key = parse_job_key(line.trim_start()).ok_or_else(|| FactorLogError::InvalidJobId {
            line_number,
            line: line.to_owned(),
        })?;
        let boost = current.ok_or_else(|| FactorLogError::MissingDirective {
            line_number,
            line: line.to_owned(),
        })?;

        let slot = *index.entry(key).or_insert_with_key(|key| {
            factors.push(JobFactor { job_id: key.clone(), disk_factor: 1.0, memory_factor: 1.0 });
            factors.len() - 1
        });
        let factor = &mut factors[slot];
        factor.disk_factor *= boost.disk;
        factor.memory_factor *= boost.memory;
    }

    if factors.is_empty() {
        return Err(FactorLogError::Empty);
    }
    debug!("factor log: {} jobs", factors.len());
    Ok(FactorTable { factors, index })
}

/// Convenience wrapper for a log that is already in memory.
pub fn parse_factor_log(log: &str) -> Result<FactorTable, FactorLogError> {
    aggregate_factors(log.lines())
}

#[allow(non_snake_case)]
#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn factor(job_id: &str, disk_factor: f64, memory_factor: f64) -> JobFactor {
        JobFactor { job_id: job_id.to_owned(), disk_factor, memory_factor }
    }

    #[test]
    fn parse_factor_log__one_directive() {
        let table = parse_factor_log("# boost_all 1.0 1.2\n100.001\n100.002\n").unwrap();
        assert_eq!(*table, vec![factor("100.001", 1.0, 1.2), factor("100.002", 1.0, 1.2)]);
    }

    #[test]
    fn parse_factor_log__latest_directive_wins() {
        let table = parse_factor_log("# boost_all 2.0 3.0\n# boost_all 0.5 0.5\n5.007\n").unwrap();
        assert_eq!(*table, vec![factor("5.007", 0.5, 0.5)]);
    }

    #[test]
    fn parse_factor_log__repeated_jobs_multiply() {
        let log = "# boost_all 1.0 2.0\n6382.004\n6382.049\n\n# boost_all 3.0 2.0\n6382.004\n";
        let table = parse_factor_log(log).unwrap();
        assert_eq!(*table, vec![factor("6382.004", 3.0, 4.0), factor("6382.049", 1.0, 2.0)]);
        assert_eq!(table.get("6382.004"), Some(&factor("6382.004", 3.0, 4.0)));
        assert_eq!(table.get("6382.050"), None);
        assert_eq!(table.get("not a job"), None);
    }

    #[test]
    fn FactorTable__get_matches_unpadded_ids() {
        let table = parse_factor_log("# boost_all 2.0 1.5\n6382.4\n").unwrap();
        let expected = factor("6382.004", 2.0, 1.5);
        assert_eq!(table.get("6382.4"), Some(&expected));
        assert_eq!(table.get("6382.004"), Some(&expected));
        assert_eq!(table.get("6382.0004"), Some(&expected));
        assert_eq!(table.into_inner(), vec![expected]);
    }

    #[test]
    fn parse_factor_log__pads_job_id() {
        let log = ["# boost_all 1.0 1.0", "6382.4", "6382.0004", "7.1234"];
        let table = aggregate_factors(log).unwrap();
        let ids = table.iter().map(|f| f.job_id.as_str()).collect::<Vec<_>>();
        // `6382.4` and `6382.0004` are the same job
        assert_eq!(ids, ["6382.004", "7.1234"]);
    }

    #[test]
    fn parse_factor_log__errors() {
        assert_eq!(
            parse_factor_log("\n6382.004\n# boost_all 1.0 1.0\n"),
            Err(FactorLogError::MissingDirective { line_number: 2, line: "6382.004".into() })
        );
        assert_eq!(parse_factor_log(""), Err(FactorLogError::Empty));
        assert_eq!(parse_factor_log("# boost_all 1.0 1.0\n\n"), Err(FactorLogError::Empty));
        assert!(matches!(
            parse_factor_log("# boost_all 1.0\n1.001"),
            Err(FactorLogError::InvalidDirective { line_number: 1, .. })
        ));
        assert!(matches!(
            parse_factor_log("# boost_all 1.0 1.0 1.0\n1.001"),
            Err(FactorLogError::InvalidDirective { .. })
        ));
        assert!(matches!(
            parse_factor_log("# boost_all x 1.0\n1.001"),
            Err(FactorLogError::InvalidDirective { .. })
        ));
        assert!(matches!(
            parse_factor_log("# boost_all 1.0 1.0\n1.001.002"),
            Err(FactorLogError::InvalidJobId { line_number: 2, .. })
        ));
        assert!(matches!(
            parse_factor_log("# boost_all 1.0 1.0\n# some note"),
            Err(FactorLogError::InvalidJobId { .. })
        ));
    }
}
