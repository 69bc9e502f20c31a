//! Run metadata: the sequencer's RunInfo.xml, the sequencer name map and the
//! report footers kept in the run directory.

use crate::error::{PlanError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tokio::fs;
use tracing::{debug, warn};

/// Run description written by the sequencer, next to the input directory.
pub const RUN_INFO_FILE: &str = "RunInfo.xml";

/// Library preparation notes, inside the input directory.
pub const PROTOCOL_FILE: &str = "Protocol.txt";

/// Download notes, inside the input directory.
pub const DOWNLOAD_FILE: &str = "DownloadInstructions.txt";

/// Environment variable naming the sequencer map file.
pub const SEQUENCERS_ENV: &str = "SEQUENCERS";

#[derive(Deserialize)]
struct RunInfoXml {
    #[serde(rename = "Run")]
    run: RunXml,
}

#[derive(Deserialize)]
struct RunXml {
    #[serde(rename = "@Id")]
    id: String,
    #[serde(rename = "@Number")]
    number: String,
    #[serde(rename = "Reads")]
    reads: ReadsXml,
}

#[derive(Deserialize)]
struct ReadsXml {
    #[serde(rename = "Read", default)]
    reads: Vec<ReadXml>,
}

#[derive(Deserialize)]
struct ReadXml {
    #[serde(rename = "@NumCycles")]
    num_cycles: u32,
}

fn run_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d{8}_(\w+)_\d{4}_\w{10}").expect("run id pattern is valid"))
}

/// What RunInfo.xml says about a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunInfo {
    /// Full run id, e.g. `20240115_LH00123_0042_A22XXXXLT3`
    pub run_id: String,
    /// Instrument serial taken from the run id
    pub serial: String,
    /// Run counter of the instrument
    pub run_number: String,
    /// Read length in nucleotides (cycles of the first read minus one)
    pub read_length: u32,
}

impl RunInfo {
    /// Parse the contents of a RunInfo.xml file.
    pub fn parse(xml: &str) -> Result<Self> {
        let doc: RunInfoXml = quick_xml::de::from_str(xml)?;
        let run = doc.run;

        let serial = run_id_pattern()
            .captures(&run.id)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| PlanError::RunInfo(format!("no instrument serial in run id {}", run.id)))?;

        let first = run
            .reads
            .reads
            .first()
            .ok_or_else(|| PlanError::RunInfo("no reads listed".to_string()))?;

        Ok(Self {
            run_id: run.id,
            serial,
            run_number: run.number,
            read_length: first.num_cycles.saturating_sub(1),
        })
    }

    /// Read and parse a RunInfo.xml file.
    pub async fn load(path: &Path) -> Result<Self> {
        let xml = match fs::read_to_string(path).await {
            Ok(xml) => xml,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PlanError::RunInfoMissing(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };
        Self::parse(&xml)
    }
}

/// Instrument serial → display name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct SequencerNames(HashMap<String, String>);

impl SequencerNames {
    /// Parse a JSON object of serial → name.
    pub fn parse(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON sequencer map.
    pub async fn load(path: &Path) -> Result<Self> {
        Self::parse(&fs::read_to_string(path).await?)
    }

    /// Display name for a serial.
    pub fn name_of(&self, serial: &str) -> Option<&str> {
        self.0.get(serial).map(String::as_str)
    }
}

/// Run section of the results file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Sequencer display name, or its serial when no name is known
    pub sequencer: String,
    /// Parsed RunInfo.xml
    #[serde(flatten)]
    pub info: RunInfo,
    /// Rows of the protocol notes
    pub protocol: Vec<Vec<String>>,
    /// Rows of the download notes
    pub download_instructions: Vec<Vec<String>>,
}

impl RunSummary {
    /// Name the sequencer of `info` using `names`.
    pub fn new(info: RunInfo, names: Option<&SequencerNames>) -> Self {
        let sequencer = match names.and_then(|n| n.name_of(&info.serial)) {
            Some(name) => name.to_string(),
            None => {
                warn!("No name known for sequencer {}, using the serial", info.serial);
                info.serial.clone()
            }
        };

        Self {
            sequencer,
            info,
            protocol: Vec::new(),
            download_instructions: Vec::new(),
        }
    }

    /// One line describing the read length and the run, for the console.
    pub fn headline(&self) -> String {
        format!(
            "Reads are {}nt in length. {} run {}",
            self.info.read_length, self.sequencer, self.info.run_number
        )
    }
}

/// Location of RunInfo.xml for an input directory: its parent directory.
pub async fn run_info_path(input: &Path) -> Result<PathBuf> {
    let input = fs::canonicalize(input).await?;
    let dir = input.parent().unwrap_or(&input);
    Ok(dir.join(RUN_INFO_FILE))
}

/// Read the CSV rows of a footer file. A missing file yields no rows.
pub async fn read_footer(path: &Path) -> Result<Vec<Vec<String>>> {
    let text = match fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("{} not found, leaving it out of the report", path.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }
    debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Collect run metadata for `input`: RunInfo.xml from its parent and the
/// footer files from inside it.
pub async fn summarize_run(input: &Path, names: Option<&SequencerNames>) -> Result<RunSummary> {
    let info = RunInfo::load(&run_info_path(input).await?).await?;
    debug!("Run {} on {} (run {})", info.run_id, info.serial, info.run_number);

    let mut summary = RunSummary::new(info, names);
    summary.protocol = read_footer(&input.join(PROTOCOL_FILE)).await?;
    summary.download_instructions = read_footer(&input.join(DOWNLOAD_FILE)).await?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RUN_INFO: &str = r#"<?xml version="1.0"?>
<RunInfo Version="6">
  <Run Id="20240115_LH00123_0042_A22XXXXLT3" Number="42">
    <Flowcell>22XXXXLT3</Flowcell>
    <Instrument>LH00123</Instrument>
    <Date>2024-01-15T10:00:00Z</Date>
    <Reads>
      <Read Number="1" NumCycles="151" IsIndexedRead="N" IsReverseComplement="N"/>
      <Read Number="2" NumCycles="10" IsIndexedRead="Y" IsReverseComplement="N"/>
      <Read Number="3" NumCycles="151" IsIndexedRead="N" IsReverseComplement="N"/>
    </Reads>
  </Run>
</RunInfo>
"#;

    #[test]
    fn test_parse_run_info() {
        let info = RunInfo::parse(RUN_INFO).unwrap();
        assert_eq!(info.run_id, "20240115_LH00123_0042_A22XXXXLT3");
        assert_eq!(info.serial, "LH00123");
        assert_eq!(info.run_number, "42");
        assert_eq!(info.read_length, 150);
    }

    #[test]
    fn test_run_info_needs_reads() {
        let xml = r#"<RunInfo><Run Id="20240115_LH00123_0042_A22XXXXLT3" Number="1"><Reads/></Run></RunInfo>"#;
        assert!(matches!(RunInfo::parse(xml), Err(PlanError::RunInfo(_))));
    }

    #[test]
    fn test_run_info_needs_serial() {
        let xml = r#"<RunInfo><Run Id="bogus" Number="1"><Reads><Read NumCycles="51"/></Reads></Run></RunInfo>"#;
        assert!(matches!(RunInfo::parse(xml), Err(PlanError::RunInfo(_))));
    }

    #[test]
    fn test_sequencer_names() {
        let names = SequencerNames::parse(r#"{"LH00123": "NovaSeq X"}"#).unwrap();
        assert_eq!(names.name_of("LH00123"), Some("NovaSeq X"));
        assert_eq!(names.name_of("M00001"), None);
        assert!(matches!(SequencerNames::parse("[1, 2]"), Err(PlanError::Json(_))));
    }

    #[test]
    fn test_summary_falls_back_to_serial() {
        let info = RunInfo::parse(RUN_INFO).unwrap();

        let names = SequencerNames::parse(r#"{"LH00123": "NovaSeq X"}"#).unwrap();
        let named = RunSummary::new(info.clone(), Some(&names));
        assert_eq!(named.sequencer, "NovaSeq X");
        assert_eq!(named.headline(), "Reads are 150nt in length. NovaSeq X run 42");

        assert_eq!(RunSummary::new(info, None).sequencer, "LH00123");
    }

    #[tokio::test]
    async fn test_summarize_run() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("Data");
        fs::create_dir(&input).await.unwrap();
        fs::write(dir.path().join(RUN_INFO_FILE), RUN_INFO).await.unwrap();
        fs::write(input.join(PROTOCOL_FILE), "Libraries were prepared with,Kit A\nSequenced on,NovaSeq X\n")
            .await
            .unwrap();

        let summary = summarize_run(&input, None).await.unwrap();

        assert_eq!(summary.info.serial, "LH00123");
        assert_eq!(
            summary.protocol,
            vec![
                vec!["Libraries were prepared with".to_string(), "Kit A".to_string()],
                vec!["Sequenced on".to_string(), "NovaSeq X".to_string()],
            ]
        );
        assert!(summary.download_instructions.is_empty());

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["serial"], "LH00123");
        assert_eq!(json["read_length"], 150);
    }

    #[tokio::test]
    async fn test_missing_run_info() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("Data");
        fs::create_dir(&input).await.unwrap();

        let err = summarize_run(&input, None).await.unwrap_err();
        assert!(matches!(err, PlanError::RunInfoMissing(_)));
    }
}
