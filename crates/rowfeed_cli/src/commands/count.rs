//! Count command implementation.

use rowfeed_core::FileServer;

/// Returns the number of data rows in `file`.
pub fn collect(
    server: &FileServer,
    file: &str,
    header: bool,
) -> Result<usize, Box<dyn std::error::Error>> {
    let rows = server.row_count_of(file, header)?;
    server.close_all()?;
    Ok(rows)
}

/// Runs the count command.
pub fn run(
    server: &FileServer,
    file: &str,
    header: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", collect(server, file, header)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn counts_data_rows() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("d.csv"), "h\n1\n2\n").unwrap();
        let server = FileServer::with_base(dir.path());
        assert_eq!(collect(&server, "d.csv", true).unwrap(), 2);
        assert_eq!(collect(&server, "d.csv", false).unwrap(), 3);
    }
}
