//! `roster config`: inspect and edit `~/.roster/config.yaml`.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use roster_core::config::{self, profile_path_at, Profile};
use roster_core::Level;

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective profile (token masked).
    Show,

    /// Set one profile key, e.g. `roster config set colegio_id 4321`.
    Set {
        key: String,
        /// Empty clears optional keys (`colegio_id`, `token`).
        value: String,
    },

    /// Print the profile file location.
    Path,
}

pub fn run(command: ConfigCommand) -> Result<()> {
    let home = super::home()?;
    match command {
        ConfigCommand::Show => {
            let profile = super::load_profile(&home)?;
            for line in describe(&profile) {
                println!("{line}");
            }
        }
        ConfigCommand::Set { key, value } => {
            let mut profile = super::load_profile(&home)?;
            profile
                .set(&key, &value)
                .with_context(|| format!("cannot set '{key}'"))?;
            let path = config::save_at(&home, &profile).context("failed to save profile")?;
            println!("{} {key} → {}", "✓".green(), path.display());
        }
        ConfigCommand::Path => println!("{}", profile_path_at(&home).display()),
    }
    Ok(())
}

fn describe(profile: &Profile) -> Vec<String> {
    let mut lines = vec![
        format!("base_url: {}", profile.base_url),
        format!("empresa_id: {}", profile.empresa_id),
        format!("ciclo_id: {}", profile.ciclo_id),
        format!(
            "colegio_id: {}",
            profile
                .colegio_id
                .map_or_else(|| "(sin definir)".to_string(), |id| id.to_string())
        ),
        format!("timeout_secs: {}", profile.timeout_secs),
        format!(
            "token: {}",
            profile.token.as_deref().map_or("(sin definir)".to_string(), mask)
        ),
    ];
    for level in Level::all() {
        lines.push(format!(
            "nivel.{}: {}",
            level.name().to_lowercase(),
            profile.level_ids.id(*level)
        ));
    }
    lines
}

/// Last four characters only.
fn mask(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("****{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_masked() {
        assert_eq!(mask("abcdef123456"), "****3456");
        assert_eq!(mask("ab"), "****ab");
    }

    #[test]
    fn show_lists_level_ids() {
        let lines = describe(&Profile::default());
        assert!(lines.contains(&"nivel.primaria: 39".to_string()));
        assert!(lines.contains(&"token: (sin definir)".to_string()));
    }
}
