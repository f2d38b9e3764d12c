use dm_domain::config::{Config, ConfigSeverity};

/// Validate the resolved config, printing any issues.
///
/// Returns `false` when at least one error was found.
pub fn validate(config: &Config, config_path: &str) -> bool {
    let issues = config.validate();

    if issues.is_empty() {
        println!("Config OK ({config_path})");
        return true;
    }

    let error_count = issues
        .iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .count();
    let warning_count = issues.len() - error_count;

    for issue in &issues {
        println!("{issue}");
    }

    println!("\n{error_count} error(s), {warning_count} warning(s) in {config_path}");

    error_count == 0
}

/// Dump the resolved config as TOML with the API key masked.
pub fn show(config: &Config) -> anyhow::Result<()> {
    let mut shown = config.clone();
    if let Some(key) = shown.backend.api_key.as_mut() {
        *key = mask(key);
    }
    print!("{}", toml::to_string_pretty(&shown)?);
    Ok(())
}

fn mask(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 8 {
        return "****".into();
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("****{tail}")
}
