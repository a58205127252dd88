//! Parse command implementation.

use rowfeed_codec::RowSplitter;
use rowfeed_core::FileServer;
use rowfeed_storage::{encoding_for_label, LineReader};
use serde::Serialize;

/// Result of tokenising a file.
#[derive(Debug, Serialize)]
pub struct ParseReport {
    /// File name.
    pub file: String,
    /// Encoding the file was decoded with.
    pub encoding: String,
    /// Lines read.
    pub lines: usize,
    /// Smallest field count seen on a well-formed line.
    pub min_fields: Option<usize>,
    /// Largest field count seen on a well-formed line.
    pub max_fields: Option<usize>,
    /// Lines that failed to tokenise.
    pub malformed: Vec<MalformedLine>,
}

/// A line that failed to tokenise.
#[derive(Debug, Serialize)]
pub struct MalformedLine {
    /// Zero-based file-line index.
    pub line: usize,
    /// Error message.
    pub error: String,
}

/// Tokenises every line of `file`.
pub fn collect(
    server: &FileServer,
    file: &str,
    delimiter: &str,
    quoted: bool,
    encoding: Option<&str>,
) -> Result<ParseReport, Box<dyn std::error::Error>> {
    let encoding = match encoding {
        Some(label) => encoding_for_label(label)?,
        None => None,
    };
    let splitter = RowSplitter::new(delimiter, quoted)?;
    let path = server.registry().resolve_file(file)?;
    let mut reader = LineReader::open(&path, encoding)?;

    let mut report = ParseReport {
        file: file.to_string(),
        encoding: reader.encoding().name().to_string(),
        lines: 0,
        min_fields: None,
        max_fields: None,
        malformed: Vec::new(),
    };

    while let Some(line) = reader.read_line()? {
        match splitter.split(&line) {
            Ok(fields) => {
                let n = fields.len();
                report.min_fields = Some(report.min_fields.map_or(n, |m| m.min(n)));
                report.max_fields = Some(report.max_fields.map_or(n, |m| m.max(n)));
            }
            Err(e) => report.malformed.push(MalformedLine {
                line: report.lines,
                error: e.to_string(),
            }),
        }
        report.lines += 1;
    }
    server.close_all()?;
    Ok(report)
}

/// Runs the parse command.
pub fn run(
    server: &FileServer,
    file: &str,
    delimiter: &str,
    quoted: bool,
    encoding: Option<&str>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = collect(server, file, delimiter, quoted, encoding)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => {
            println!("Parsed {} ({})", report.file, report.encoding);
            println!("  Lines:     {}", report.lines);
            if let (Some(min), Some(max)) = (report.min_fields, report.max_fields) {
                println!("  Fields:    {min}..={max}");
            }
            println!("  Malformed: {}", report.malformed.len());
            for bad in &report.malformed {
                println!("    line {}: {}", bad.line, bad.error);
            }
        }
    }

    if report.malformed.is_empty() {
        Ok(())
    } else {
        Err(format!("{} malformed lines", report.malformed.len()).into())
    }
}
