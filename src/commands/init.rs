use crate::config;
use anyhow::Result;
use std::path::Path;

pub fn init_config(path: &Path, force: bool) -> Result<()> {
    config::write_default_config(path, force)?;
    println!("Created {} configuration file", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_refuses_to_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("configs").join("config.yaml");
        init_config(&path, false).unwrap();
        assert!(init_config(&path, false).is_err());
        init_config(&path, true).unwrap();
        assert!(config::load_config(&path).is_ok());
    }
}
