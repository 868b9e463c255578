use clap::{Args, Subcommand};

use super::OutputFormat;
use pantry::config::{Backend, Config};

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        println!("backend: {}", config.backend.value);
                        println!("  source: {}", config.backend.source);
                        println!();

                        if config.backend.value == Backend::Sqlite {
                            println!(
                                "database_path: {}",
                                config.database_path.value.display()
                            );
                            println!("  source: {}", config.database_path.source);
                        } else {
                            println!(
                                "server.url: {}",
                                config.server.url.as_deref().unwrap_or("(not set)")
                            );
                            match &config.server.api_key {
                                Some(key) => println!(
                                    "server.api_key: {}...",
                                    key.chars().take(4).collect::<String>()
                                ),
                                None => println!("server.api_key: (not set)"),
                            }
                        }
                        println!();

                        println!("lookup: {}", config.lookup.value);
                        println!("  source: {}", config.lookup.source);
                        println!();

                        println!("quantity_policy: {}", config.quantity_policy.value);
                        println!("  source: {}", config.quantity_policy.source);
                    }
                }
                Ok(())
            }
        }
    }
}
