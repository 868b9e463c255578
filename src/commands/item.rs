use clap::{Args, Subcommand};
use serde::Serialize;
use std::io::{self, Write};

use super::{Items, OutputFormat};
use pantry::models::{Entry, Item};

#[derive(Args)]
pub struct ItemCommand {
    #[command(subcommand)]
    pub command: ItemSubcommand,
}

#[derive(Subcommand)]
pub enum ItemSubcommand {
    /// Add a new item
    Add {
        /// Name of the item
        name: String,

        /// Starting quantity
        #[arg(long, short, default_value_t = 0, allow_negative_numbers = true)]
        quantity: i64,
    },

    /// List all items
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Search items by name (case-insensitive)
    Search {
        /// Text the item name must contain
        query: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Set an item's quantity
    Set {
        /// Item index (from `list`)
        index: usize,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },

    /// Increase an item's quantity
    Incr {
        /// Item index (from `list`)
        index: usize,

        /// Amount to add
        #[arg(long, default_value_t = 1)]
        by: i64,
    },

    /// Decrease an item's quantity
    Decr {
        /// Item index (from `list`)
        index: usize,

        /// Amount to subtract
        #[arg(long, default_value_t = 1)]
        by: i64,
    },

    /// Edit an item's name and/or quantity
    Edit {
        /// Item index (from `list`)
        index: usize,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New quantity
        #[arg(long, allow_negative_numbers = true)]
        quantity: Option<i64>,
    },

    /// Delete an item
    Delete {
        /// Item index (from `list`)
        index: usize,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

/// Row in JSON output
#[derive(Serialize)]
struct Row<'a> {
    index: usize,
    #[serde(flatten)]
    entry: &'a Entry,
}

impl ItemCommand {
    pub async fn run(&self, items: &mut Items) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ItemSubcommand::Add { name, quantity } => {
                if name.trim().is_empty() {
                    return Err("Item name cannot be empty".into());
                }

                let created = items.add_item(Item::new(name.trim(), *quantity)).await?;
                println!("Added: {}", created);
                Ok(())
            }

            ItemSubcommand::List { format } => {
                let rows: Vec<_> = items.items().iter().enumerate().collect();
                print_rows(&rows, format, "No items in pantry")
            }

            ItemSubcommand::Search { query, format } => {
                // Keep list indices so results can be passed to set/edit/delete
                let rows: Vec<_> = items
                    .filter(query)
                    .filter_map(|entry| {
                        items
                            .items()
                            .iter()
                            .position(|e| e.id == entry.id)
                            .map(|index| (index, entry))
                    })
                    .collect();
                print_rows(&rows, format, &format!("No items matching '{}'", query))
            }

            ItemSubcommand::Set { index, quantity } => {
                let updated = items.update_quantity(*index, *quantity).await?;
                println!("Updated: {}", updated);
                Ok(())
            }

            ItemSubcommand::Incr { index, by } => {
                let updated = items.adjust_quantity(*index, *by).await?;
                println!("Updated: {}", updated);
                Ok(())
            }

            ItemSubcommand::Decr { index, by } => {
                let updated = items.adjust_quantity(*index, decrement(*by)?).await?;
                println!("Updated: {}", updated);
                Ok(())
            }

            ItemSubcommand::Edit {
                index,
                name,
                quantity,
            } => {
                if name.is_none() && quantity.is_none() {
                    return Err("Nothing to update. Provide --name and/or --quantity.".into());
                }

                let mut draft = items.begin_edit(*index)?;
                if let Some(new_name) = name {
                    if new_name.trim().is_empty() {
                        return Err("Item name cannot be empty".into());
                    }
                    draft.item.name = new_name.trim().to_string();
                }
                if let Some(new_quantity) = quantity {
                    draft.item.quantity = *new_quantity;
                }

                let updated = items.commit_edit(draft).await?;
                println!("Updated: {}", updated);
                Ok(())
            }

            ItemSubcommand::Delete { index, force } => {
                let name = match items.get(*index) {
                    Some(entry) => entry.name().to_string(),
                    None => return Err(format!("No item at index {}", index).into()),
                };

                // Confirm deletion unless --force is used
                if !force {
                    print!("Delete item '{}'? [y/N] ", name);
                    io::stdout().flush()?;

                    let mut input = String::new();
                    io::stdin().read_line(&mut input)?;

                    if !input.trim().eq_ignore_ascii_case("y") {
                        println!("Deletion cancelled.");
                        return Ok(());
                    }
                }

                let removed = items.delete_item(*index).await?;
                println!("Deleted item: {}", removed.name());
                Ok(())
            }
        }
    }
}

/// Delta for `decr --by N`
fn decrement(by: i64) -> Result<i64, String> {
    by.checked_neg()
        .ok_or_else(|| format!("Cannot subtract {}: out of range", by))
}

fn print_rows(
    rows: &[(usize, &Entry)],
    format: &OutputFormat,
    empty_message: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => {
            let rows: Vec<_> = rows
                .iter()
                .map(|(index, entry)| Row {
                    index: *index,
                    entry,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Text => {
            if rows.is_empty() {
                println!("{}", empty_message);
                return Ok(());
            }

            println!("{:>4}  {:<30}  QUANTITY", "#", "NAME");
            println!("{}", "-".repeat(48));
            for (index, entry) in rows {
                let name = entry.name();
                let name = if name.chars().count() > 30 {
                    format!("{}...", name.chars().take(27).collect::<String>())
                } else {
                    name.to_string()
                };
                println!("{:>4}  {:<30}  {}", index, name, entry.quantity());
            }
            println!("\nTotal: {} item(s)", rows.len());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decrement() {
        assert_eq!(decrement(3), Ok(-3));
        assert_eq!(decrement(-2), Ok(2));
        assert_eq!(decrement(i64::MAX), Ok(-i64::MAX));
    }

    #[test]
    fn test_decrement_min_is_rejected() {
        assert!(decrement(i64::MIN).is_err());
    }
}
