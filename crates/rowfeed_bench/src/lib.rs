//! Benchmark utilities.

use rand::distributions::Alphanumeric;
use rand::Rng;
use std::path::Path;

/// Generates a random alphanumeric field of `len` characters.
pub fn random_field(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Generates a line of `fields` random fields, every other one quoted
/// and holding a delimiter.
pub fn mixed_line(fields: usize, field_len: usize) -> String {
    (0..fields)
        .map(|i| {
            let field = random_field(field_len);
            if i % 2 == 0 {
                field
            } else {
                format!("\"{field},{field}\"")
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Writes a file of `rows` data rows under a one-line header.
pub fn write_data_file(path: &Path, rows: usize, fields: usize) -> std::io::Result<()> {
    let header: Vec<String> = (0..fields).map(|i| format!("col{i}")).collect();
    let mut content = header.join(",");
    content.push('\n');
    for row in 0..rows {
        let line: Vec<String> = (0..fields).map(|i| format!("{row}-{i}")).collect();
        content.push_str(&line.join(","));
        content.push('\n');
    }
    std::fs::write(path, content)
}
