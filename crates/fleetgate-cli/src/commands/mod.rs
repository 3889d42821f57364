pub mod canonicalize;
pub mod index;
pub mod process;
pub mod verify_signature;

use std::io::{self, Read};

/// Reads a file, or stdin when no path is given.
pub fn read_input(input: Option<&str>) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    match input {
        Some(path) => {
            std::fs::read(path).map_err(|e| format!("Failed to read file {}: {}", path, e).into())
        }
        None => {
            let mut buffer = Vec::new();
            io::stdin().read_to_end(&mut buffer)?;
            Ok(buffer)
        }
    }
}
