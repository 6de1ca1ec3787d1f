use std::path::Path;

use anyhow::bail;

use crate::config::FleetConfig;

pub fn init(path: &str) -> anyhow::Result<()> {
    let output = Path::new(path).join("fleet.toml");
    if output.exists() {
        bail!("{} already exists", output.display());
    }
    std::fs::write(&output, FleetConfig::scaffold().to_toml_string()?)?;
    println!("✓ Generated {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_scaffold_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap();
        init(path).unwrap();

        let config = FleetConfig::from_file(&dir.path().join("fleet.toml")).unwrap();
        assert_eq!(config, FleetConfig::scaffold());
        assert!(init(path).is_err());
    }
}
