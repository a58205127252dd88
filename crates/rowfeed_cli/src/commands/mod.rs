//! CLI command implementations.

pub mod blocks;
pub mod count;
pub mod parse;
pub mod run;

use rowfeed_core::FileServer;
use std::path::Path;
use std::sync::Arc;

/// Creates the server every command reads through.
pub fn server(base: Option<&Path>) -> Result<Arc<FileServer>, Box<dyn std::error::Error>> {
    let server = match base {
        Some(base) => {
            if !base.is_dir() {
                return Err(format!("base directory not found: {}", base.display()).into());
            }
            FileServer::with_base(base)
        }
        None => FileServer::new(),
    };
    Ok(Arc::new(server))
}
