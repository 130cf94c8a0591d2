//! Turns raw status records into the final job table: status labels, per-job-type command
//! arguments and the four resource columns in bytes.

use std::fmt;

use derive_more::derive::{Deref, Into};
use itertools::{izip, Itertools as _};
use log::debug;
use serde::{
    ser::{SerializeMap, SerializeSeq},
    Serialize, Serializer,
};
use thiserror::Error;

use crate::{
    resource::{ResourceColumn, ResourceParseError, ResourceQuantity},
    status::{parse_status, RawJobRecord, StatusParseError},
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Active,
    Idle,
    Held,
    /// Any code without a label is kept as printed.
    Other(String),
}

impl JobStatus {
    pub fn from_code(code: &str) -> Self {
        match code {
            "R" => JobStatus::Active,
            "I" => JobStatus::Idle,
            "H" => JobStatus::Held,
            other => JobStatus::Other(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Active => "ACTIVE",
            JobStatus::Idle => "IDLE",
            JobStatus::Held => "HELD",
            JobStatus::Other(code) => code,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for JobStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum JobType {
    HyPro,
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobType::HyPro => f.write_str("HyPro"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobArguments {
    pub site: String,
    pub isodate: String,
    pub image: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error(
        "command `{command}`: expected `<site> <isodate> <image>` after the launcher, \
         found {found} arguments"
    )]
    Shape { command: String, found: usize },
    #[error("command `{command}`: image `{image}` is not an integer")]
    InvalidImage { command: String, image: String },
}

/// A job type is recognised by the start of its command.
#[derive(Debug, Clone, Copy)]
pub struct JobTypeEntry {
    pub prefix: &'static str,
    pub job_type: JobType,
    /// Gets the whole command, prefix included.
    pub parse_arguments: fn(&str) -> Result<JobArguments, ArgumentError>,
}

pub const JOB_TYPES: &[JobTypeEntry] = &[JobTypeEntry {
    prefix: "hypro.sh",
    job_type: JobType::HyPro,
    parse_arguments: parse_hypro_arguments,
}];

/// `hypro.sh <site> <isodate> <image>`
fn parse_hypro_arguments(command: &str) -> Result<JobArguments, ArgumentError> {
    // launcher plus the following separator
    const LAUNCHER_LEN: usize = "hypro.sh ".len();

    let arguments =
        command.get(LAUNCHER_LEN..).unwrap_or_default().split_whitespace().collect_vec();
    let [site, isodate, image] = arguments.as_slice() else {
        return Err(ArgumentError::Shape { command: command.to_owned(), found: arguments.len() });
    };
    let image = image.parse::<i64>().map_err(|_| ArgumentError::InvalidImage {
        command: command.to_owned(),
        image: (*image).to_owned(),
    })?;

    Ok(JobArguments { site: (*site).to_owned(), isodate: (*isodate).to_owned(), image })
}

pub fn classify_command(command: &str) -> Option<&'static JobTypeEntry> {
    JOB_TYPES.iter().find(|entry| command.starts_with(entry.prefix))
}

/// Job type and arguments, or `None` for commands no registered job type claims.
pub fn parse_command(command: &str) -> Result<Option<(JobType, JobArguments)>, ArgumentError> {
    classify_command(command)
        .map(|entry| -> Result<_, ArgumentError> {
            Ok((entry.job_type, (entry.parse_arguments)(command)?))
        })
        .transpose()
}

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error(transparent)]
    Status(#[from] StatusParseError),
    #[error("job {job_id}, column `{column}`")]
    Resource {
        job_id: String,
        column: ResourceColumn,
        #[source]
        source: ResourceParseError,
    },
    #[error("job {job_id}")]
    Arguments {
        job_id: String,
        #[source]
        source: ArgumentError,
    },
}

/// Normalises one resource column over all records.
pub fn normalize_column(
    records: &[RawJobRecord],
    column: ResourceColumn,
) -> Result<Vec<ResourceQuantity>, EnrichError> {
    records
        .iter()
        .map(|record| {
            ResourceQuantity::parse(column.raw(record)).map_err(|source| EnrichError::Resource {
                job_id: record.job_id.clone(),
                column,
                source,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedJobRecord {
    pub job_type: Option<JobType>,
    pub job_id: String,
    pub submitted: String,
    pub runtime: String,
    pub status: JobStatus,
    /// Only set for registered job types.
    pub arguments: Option<JobArguments>,
    pub memory_request: ResourceQuantity,
    pub memory_usage: ResourceQuantity,
    pub disk_request: ResourceQuantity,
    pub disk_usage: ResourceQuantity,
}

const LEADING_COLUMNS: [&str; 8] =
    ["job_type", "job_id", "submitted", "runtime", "status", "site", "isodate", "image"];

impl EnrichedJobRecord {
    pub fn resource(&self, column: ResourceColumn) -> &ResourceQuantity {
        match column {
            ResourceColumn::MemoryRequest => &self.memory_request,
            ResourceColumn::MemoryUsage => &self.memory_usage,
            ResourceColumn::DiskRequest => &self.disk_request,
            ResourceColumn::DiskUsage => &self.disk_usage,
        }
    }

    /// View that serialises with the resources as their readable strings only.
    pub fn readable(&self) -> ReadableJobRecord<'_> {
        ReadableJobRecord(self)
    }

    fn serialize_leading<M: SerializeMap>(&self, map: &mut M) -> Result<(), M::Error> {
        let [job_type, job_id, submitted, runtime, status, site, isodate, image] = LEADING_COLUMNS;
        map.serialize_entry(job_type, &self.job_type.map(|t| t.to_string()))?;
        map.serialize_entry(job_id, &self.job_id)?;
        map.serialize_entry(submitted, &self.submitted)?;
        map.serialize_entry(runtime, &self.runtime)?;
        map.serialize_entry(status, &self.status)?;
        map.serialize_entry(site, &self.arguments.as_ref().map(|a| &a.site))?;
        map.serialize_entry(isodate, &self.arguments.as_ref().map(|a| &a.isodate))?;
        map.serialize_entry(image, &self.arguments.as_ref().map(|a| a.image))
    }
}

/// Flat object keyed by [`JobTable::columns`].
impl Serialize for EnrichedJobRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(LEADING_COLUMNS.len() + 16))?;
        self.serialize_leading(&mut map)?;
        for column in ResourceColumn::ALL {
            let quantity = self.resource(column);
            let [readable, decimal, unit, bytes] = column.sub_columns();
            map.serialize_entry(&readable, &quantity.readable)?;
            map.serialize_entry(&decimal, &quantity.decimal_value)?;
            map.serialize_entry(&unit, &quantity.unit)?;
            map.serialize_entry(&bytes, &quantity.bytes)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReadableJobRecord<'a>(pub &'a EnrichedJobRecord);

/// Flat object keyed by [`JobTable::readable_columns`].
impl Serialize for ReadableJobRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(LEADING_COLUMNS.len() + 4))?;
        self.0.serialize_leading(&mut map)?;
        for column in ResourceColumn::ALL {
            map.serialize_entry(column.name(), &self.0.resource(column).readable)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deref, Into, Serialize)]
#[serde(transparent)]
pub struct JobTable(Vec<EnrichedJobRecord>);

impl JobTable {
    pub fn columns() -> Vec<String> {
        LEADING_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(ResourceColumn::ALL.into_iter().flat_map(ResourceColumn::sub_columns))
            .collect()
    }

    pub fn readable_columns() -> Vec<String> {
        LEADING_COLUMNS
            .iter()
            .copied()
            .chain(ResourceColumn::ALL.map(ResourceColumn::name))
            .map(String::from)
            .collect()
    }

    pub fn readable(&self) -> ReadableJobTable<'_> {
        ReadableJobTable(self)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReadableJobTable<'a>(pub &'a JobTable);

impl Serialize for ReadableJobTable<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for record in self.0.iter() {
            seq.serialize_element(&record.readable())?;
        }
        seq.end()
    }
}

/// Builds the job table from parsed status records.
pub fn enrich(records: Vec<RawJobRecord>) -> Result<JobTable, EnrichError> {
    let commands = records
        .iter()
        .map(|record| {
            parse_command(&record.command).map_err(|source| EnrichError::Arguments {
                job_id: record.job_id.clone(),
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let [memory_request, memory_usage, disk_request, disk_usage] = [
        normalize_column(&records, ResourceColumn::MemoryRequest)?,
        normalize_column(&records, ResourceColumn::MemoryUsage)?,
        normalize_column(&records, ResourceColumn::DiskRequest)?,
        normalize_column(&records, ResourceColumn::DiskUsage)?,
    ];

    let rows = izip!(records, commands, memory_request, memory_usage, disk_request, disk_usage)
        .map(|(record, command, memory_request, memory_usage, disk_request, disk_usage)| {
            let (job_type, arguments) = command.unzip();
            EnrichedJobRecord {
                job_type,
                job_id: record.job_id,
                submitted: record.submitted,
                runtime: record.runtime,
                status: JobStatus::from_code(&record.status),
                arguments,
                memory_request,
                memory_usage,
                disk_request,
                disk_usage,
            }
        })
        .collect_vec();

    debug!(
        "enriched {} jobs ({} with a known job type)",
        rows.len(),
        rows.iter().filter(|row| row.job_type.is_some()).count()
    );
    Ok(JobTable(rows))
}

/// `parse_status` followed by `enrich`.
pub fn process_status(report: &str) -> Result<JobTable, EnrichError> {
    enrich(parse_status(report)?)
}

#[allow(non_snake_case)]
#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn raw(status: &str, command: &str) -> RawJobRecord {
        RawJobRecord {
            job_id: "100.001".into(),
            submitted: "1/2 03:04".into(),
            runtime: "0+00:10:00".into(),
            status: status.into(),
            memory_request: "2.0 GB".into(),
            memory_usage: "1.5 GB".into(),
            disk_request: "512.0 MB".into(),
            disk_usage: "20.0 KB".into(),
            command: command.into(),
        }
    }

    #[test]
    fn JobStatus__from_code() {
        assert_eq!(JobStatus::from_code("R").to_string(), "ACTIVE");
        assert_eq!(JobStatus::from_code("I").to_string(), "IDLE");
        assert_eq!(JobStatus::from_code("H").to_string(), "HELD");
        assert_eq!(JobStatus::from_code("X"), JobStatus::Other("X".into()));
        assert_eq!(JobStatus::from_code("X").to_string(), "X");
    }

    #[test]
    fn parse_command__hypro() {
        assert_eq!(
            parse_command("hypro.sh siteA 2024-01-01 42").unwrap(),
            Some((
                JobType::HyPro,
                JobArguments { site: "siteA".into(), isodate: "2024-01-01".into(), image: 42 }
            ))
        );
        assert_eq!(parse_command("/bin/sleep 10").unwrap(), None);
        assert_eq!(parse_command("").unwrap(), None);
    }

    #[test]
    fn parse_command__hypro_shape_errors() {
        assert_eq!(
            parse_command("hypro.sh siteA 2024-01-01"),
            Err(ArgumentError::Shape { command: "hypro.sh siteA 2024-01-01".into(), found: 2 })
        );
        assert!(matches!(parse_command("hypro.sh"), Err(ArgumentError::Shape { found: 0, .. })));
        assert!(matches!(
            parse_command("hypro.sh a b c d"),
            Err(ArgumentError::Shape { found: 4, .. })
        ));
        assert_eq!(
            parse_command("hypro.sh siteA 2024-01-01 4x2"),
            Err(ArgumentError::InvalidImage {
                command: "hypro.sh siteA 2024-01-01 4x2".into(),
                image: "4x2".into()
            })
        );
    }

    #[test]
    fn enrich__builds_rows() {
        let records = vec![raw("R", "hypro.sh siteA 2024-01-01 42"), raw("Q", "/bin/true")];
        let table = enrich(records).unwrap();
        assert_eq!(table.len(), 2);

        let hypro = &table[0];
        assert_eq!(hypro.job_type, Some(JobType::HyPro));
        assert_eq!(hypro.status, JobStatus::Active);
        assert_eq!(hypro.arguments.as_ref().map(|a| a.image), Some(42));
        assert_eq!(hypro.memory_request.bytes, 2_000_000_000);
        assert_eq!(hypro.memory_usage.bytes, 1_500_000_000);
        assert_eq!(hypro.resource(ResourceColumn::DiskRequest).bytes, 512_000_000);
        assert_eq!(hypro.disk_usage.bytes, 20_000);

        let other = &table[1];
        assert_eq!(other.job_type, None);
        assert_eq!(other.arguments, None);
        assert_eq!(other.status, JobStatus::Other("Q".into()));
    }

    #[test]
    fn enrich__names_failing_job_and_column() {
        let mut bad = raw("R", "/bin/true");
        bad.disk_request = "1.0 TB".into();
        match enrich(vec![raw("R", "/bin/true"), bad]) {
            Err(EnrichError::Resource { column, source, .. }) => {
                assert_eq!(column, ResourceColumn::DiskRequest);
                assert!(matches!(
                    source,
                    ResourceParseError::UnknownUnit { unit, .. } if unit == "TB"
                ));
            }
            other => panic!("expected a resource error, got {other:?}"),
        }

        assert!(matches!(
            enrich(vec![raw("R", "hypro.sh only-site")]),
            Err(EnrichError::Arguments { job_id, .. }) if job_id == "100.001"
        ));
    }

    #[test]
    fn JobTable__columns() {
        let columns = JobTable::columns();
        assert_eq!(columns.len(), 24);
        assert_eq!(&columns[..8], LEADING_COLUMNS);
        assert_eq!(columns[8], "memory_request_readable");
        assert_eq!(columns[23], "disk_usage_bytes");

        let readable = JobTable::readable_columns();
        assert_eq!(readable.len(), 12);
        assert_eq!(
            &readable[8..],
            ["memory_request", "memory_usage", "disk_request", "disk_usage"]
        );
    }
}
