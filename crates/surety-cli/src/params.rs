//! # Params Subcommand
//!
//! Prints the effective protocol parameters as YAML, after loading and
//! validating an optional parameter file.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

/// Arguments for the `surety params` subcommand.
#[derive(Args, Debug)]
pub struct ParamsArgs {
    /// Parameter file to load. Defaults are printed when omitted.
    #[arg(long)]
    pub params: Option<PathBuf>,
}

/// Execute the params subcommand.
pub fn run_params(args: &ParamsArgs) -> Result<u8> {
    print!("{}", render_params(args)?);
    Ok(0)
}

/// Effective parameters rendered as YAML.
pub fn render_params(args: &ParamsArgs) -> Result<String> {
    let params = crate::load_params(args.params.as_deref())?;
    Ok(serde_yaml::to_string(&params)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_render_as_yaml() {
        let yaml = render_params(&ParamsArgs { params: None }).unwrap();
        assert!(yaml.contains("agreement_threshold: 3"));
        assert!(yaml.contains("min_airline_funding: '10'"));
    }

    #[test]
    fn overrides_are_merged_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.yaml");
        std::fs::write(&path, "agreement_threshold: 4\n").unwrap();
        let yaml = render_params(&ParamsArgs { params: Some(path) }).unwrap();
        assert!(yaml.contains("agreement_threshold: 4"));
        assert!(yaml.contains("multiparty_threshold: 4"));
    }
}
