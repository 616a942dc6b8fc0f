use clap::Subcommand;
use meditimer_core::{Config, ConfigError};
use serde_json::Value;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one setting by dotted key
    Get {
        /// e.g. "default_duration", "sounds.interval_sound", "audio.direct_volume"
        key: String,
    },
    /// Change one setting; the value is parsed as the key's type
    Set { key: String, value: String },
    /// Show every setting
    List {
        /// One `key = value` line per setting instead of JSON
        #[arg(long)]
        flat: bool,
    },
    /// Restore the default durations, bells and audio levels
    Reset,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let value = Config::load()?
                .get(&key)
                .ok_or(ConfigError::UnknownKey(key))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            Config::load()?.set(&key, &value)?;
            println!("{key} = {value}");
        }
        ConfigAction::List { flat } => {
            let tree = serde_json::to_value(Config::load()?)?;
            if flat {
                for (key, value) in flatten(&tree) {
                    println!("{key} = {value}");
                }
            } else {
                println!("{}", serde_json::to_string_pretty(&tree)?);
            }
        }
        ConfigAction::Reset => {
            Config::default().save()?;
            println!("settings restored to defaults");
        }
    }
    Ok(())
}

/// Leaf settings as dotted keys, in the order `config get` accepts them.
fn flatten(tree: &Value) -> Vec<(String, String)> {
    fn walk(prefix: &str, node: &Value, out: &mut Vec<(String, String)>) {
        match node {
            Value::Object(map) => {
                for (name, child) in map {
                    let key = if prefix.is_empty() {
                        name.clone()
                    } else {
                        format!("{prefix}.{name}")
                    };
                    walk(&key, child, out);
                }
            }
            Value::String(s) => out.push((prefix.to_string(), s.clone())),
            Value::Null => out.push((prefix.to_string(), String::new())),
            other => out.push((prefix.to_string(), other.to_string())),
        }
    }

    let mut out = Vec::new();
    walk("", tree, &mut out);
    out
}
