use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

/// Turn `condor_q -pr usage.cpf` output into JSON job records.
#[derive(Debug, Clone, PartialEq, Parser)]
pub struct Args {
    /// Captured `condor_q` output, `-` for stdin
    pub status: PathBuf,
    /// Boost factor log; matching jobs get `disk_factor` / `memory_factor`
    #[arg(long)]
    pub factors: Option<PathBuf>,
    /// Only print the readable resource strings (overrides the config file)
    #[arg(long, overrides_with = "no_readable")]
    pub readable: bool,
    /// Print every resource column (overrides the config file)
    #[arg(long, overrides_with = "readable")]
    pub no_readable: bool,
    #[arg(long, default_value_t = LevelFilter::Info)]
    pub log_level: LevelFilter,
}

impl Args {
    /// `None` leaves the choice to the config file.
    pub fn readable(&self) -> Option<bool> {
        match (self.readable, self.no_readable) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::parse_from(["condor_report", "status.txt"].iter().chain(args).copied())
    }

    #[test]
    fn readable_flags() {
        assert_eq!(parse(&[]).readable(), None);
        assert_eq!(parse(&["--readable"]).readable(), Some(true));
        assert_eq!(parse(&["--no-readable"]).readable(), Some(false));
        // last one wins
        assert_eq!(parse(&["--readable", "--no-readable"]).readable(), Some(false));
        assert_eq!(parse(&["--no-readable", "--readable"]).readable(), Some(true));
    }
}
