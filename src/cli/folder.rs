use crate::cli::connect;
use crate::core::settings::Settings;
use anyhow::{Context, Result};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum FolderCommand {
    /// Add a storage folder
    Add {
        path: String,

        /// Size in bytes or with a unit suffix (e.g. 500GB, 4TiB)
        #[arg(value_parser = parse_size)]
        size: u64,
    },

    /// Resize a storage folder
    Resize {
        path: String,

        /// New size in bytes or with a unit suffix
        #[arg(value_parser = parse_size)]
        size: u64,
    },

    /// Remove a storage folder
    Remove {
        path: String,

        /// Remove even if data cannot be relocated
        #[arg(long)]
        force: bool,
    },
}

const UNITS: &[(&str, u64)] = &[
    ("kib", 1 << 10),
    ("mib", 1 << 20),
    ("gib", 1 << 30),
    ("tib", 1 << 40),
    ("kb", 1_000),
    ("mb", 1_000_000),
    ("gb", 1_000_000_000),
    ("tb", 1_000_000_000_000),
    ("b", 1),
];

pub fn parse_size(input: &str) -> Result<u64, String> {
    let normalized = input.trim().to_lowercase();
    let (digits, multiplier) = UNITS
        .iter()
        .find_map(|(suffix, mult)| normalized.strip_suffix(suffix).map(|d| (d, *mult)))
        .unwrap_or((normalized.as_str(), 1));

    let value: u64 = digits
        .trim()
        .parse()
        .map_err(|_| format!("invalid size: {}", input))?;

    value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("size too large: {}", input))
}

pub async fn run(settings: &Settings, command: FolderCommand) -> Result<()> {
    let client = connect(settings)?;

    match command {
        FolderCommand::Add { path, size } => {
            client
                .add_storage_folder(&path, size)
                .await
                .with_context(|| format!("Failed to add storage folder {}", path))?;
            println!("Added {} ({} bytes)", path, size);
        }
        FolderCommand::Resize { path, size } => {
            client
                .resize_storage_folder(&path, size)
                .await
                .with_context(|| format!("Failed to resize storage folder {}", path))?;
            println!("Resized {} to {} bytes", path, size);
        }
        FolderCommand::Remove { path, force } => {
            client
                .remove_storage_folder(&path, force)
                .await
                .with_context(|| format!("Failed to remove storage folder {}", path))?;
            println!("Removed {}", path);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size_units() {
        assert_eq!(parse_size("4096").unwrap(), 4096);
        assert_eq!(parse_size("64B").unwrap(), 64);
        assert_eq!(parse_size("500GB").unwrap(), 500_000_000_000);
        assert_eq!(parse_size("4TiB").unwrap(), 4 * (1u64 << 40));
        assert_eq!(parse_size(" 2 tb ").unwrap(), 2_000_000_000_000);
    }

    #[test]
    fn test_parse_size_rejects_garbage() {
        assert!(parse_size("").is_err());
        assert!(parse_size("1.5TB").is_err());
        assert!(parse_size("lots").is_err());
        assert!(parse_size("99999999TiB").is_err());
    }
}
