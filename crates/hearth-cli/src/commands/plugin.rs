//! Plugin lifecycle verbs: install, uninstall, enable, disable.

use clap::Args;

use crate::output;
use hearth_core::config::AppConfig;
use hearth_core::error::AppError;

/// Arguments naming one plugin
#[derive(Debug, Args)]
pub struct NameArgs {
    /// Plugin name
    pub name: String,
}

/// Arguments for enable / disable
#[derive(Debug, Args)]
pub struct ActivationArgs {
    /// Plugin names, processed left to right; may end with `true` or `false`
    #[arg(required = true, num_args = 1..)]
    pub names: Vec<String>,

    /// Cascade to declared plugin dependencies
    #[arg(short = 'd', long)]
    pub with_dependencies: bool,
}

impl ActivationArgs {
    /// Plugin names and the effective cascade flag.
    ///
    /// A trailing literal `true` or `false` overrides `--with-dependencies`.
    pub fn selection(&self) -> Result<(Vec<String>, bool), AppError> {
        let (names, cascade) = split_cascade_flag(&self.names);
        if names.is_empty() {
            return Err(AppError::validation("No plugin name given"));
        }
        Ok((names, cascade.unwrap_or(self.with_dependencies)))
    }
}

/// Strips a trailing `true`/`false` from positional arguments.
pub fn split_cascade_flag(args: &[String]) -> (Vec<String>, Option<bool>) {
    match args.split_last() {
        Some((last, rest)) if last == "true" => (rest.to_vec(), Some(true)),
        Some((last, rest)) if last == "false" => (rest.to_vec(), Some(false)),
        _ => (args.to_vec(), None),
    }
}

/// Execute `install`
pub async fn install(args: &NameArgs, config: &AppConfig) -> Result<(), AppError> {
    let runtime = super::runtime(config).await?;
    runtime.install(&args.name).await?;
    output::print_success(&format!("Plugin '{}' installed", args.name));
    Ok(())
}

/// Execute `uninstall`
pub async fn uninstall(args: &NameArgs, config: &AppConfig) -> Result<(), AppError> {
    let runtime = super::runtime(config).await?;
    runtime.uninstall(&args.name).await?;
    output::print_success(&format!("Plugin '{}' uninstalled", args.name));
    Ok(())
}

/// Execute `enable`
pub async fn enable(args: &ActivationArgs, config: &AppConfig) -> Result<(), AppError> {
    let (names, cascade) = args.selection()?;
    let runtime = super::runtime(config).await?;
    runtime.enable(names.clone(), cascade).await?;
    output::print_success(&format!("Enabled: {}", names.join(", ")));
    Ok(())
}

/// Execute `disable`
pub async fn disable(args: &ActivationArgs, config: &AppConfig) -> Result<(), AppError> {
    let (names, cascade) = args.selection()?;
    let runtime = super::runtime(config).await?;
    runtime.disable(names.clone(), cascade).await?;
    output::print_success(&format!("Disabled: {}", names.join(", ")));
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::commands::{Cli, Commands};

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_trailing_flag_is_stripped() {
        assert_eq!(
            split_cascade_flag(&args(&["a", "b", "true"])),
            (args(&["a", "b"]), Some(true))
        );
        assert_eq!(
            split_cascade_flag(&args(&["a", "false"])),
            (args(&["a"]), Some(false))
        );
        assert_eq!(split_cascade_flag(&args(&["a", "b"])), (args(&["a", "b"]), None));
    }

    #[test]
    fn test_only_trailing_position_counts() {
        assert_eq!(
            split_cascade_flag(&args(&["true", "a"])),
            (args(&["true", "a"]), None)
        );
    }

    #[test]
    fn test_parse_enable_with_trailing_true() {
        let cli = Cli::parse_from(["hearth", "enable", "menu", "blog", "true"]);
        let Commands::Enable(activation) = cli.command else {
            panic!("expected enable");
        };
        let (names, cascade) = activation.selection().unwrap();
        assert_eq!(names, args(&["menu", "blog"]));
        assert!(cascade);
    }

    #[test]
    fn test_parse_disable_with_long_flag() {
        let cli = Cli::parse_from(["hearth", "disable", "--with-dependencies", "menu"]);
        let Commands::Disable(activation) = cli.command else {
            panic!("expected disable");
        };
        assert_eq!(activation.selection().unwrap(), (args(&["menu"]), true));
    }

    #[test]
    fn test_flag_alone_is_rejected() {
        let cli = Cli::parse_from(["hearth", "enable", "true"]);
        let Commands::Enable(activation) = cli.command else {
            panic!("expected enable");
        };
        assert!(activation.selection().is_err());
    }
}
