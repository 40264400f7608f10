//! Equipment commands

use colored::Colorize;
use prettytable::{format, row, Table};

use crate::api::{ApiClient, EquipmentApi};
use crate::cli::EquipmentCommand;
use crate::commands::{format_instant, print_json};
use crate::error::Result;

/// Handle equipment commands
pub async fn handle_equipment(client: ApiClient, command: EquipmentCommand) -> Result<()> {
    let equipment = EquipmentApi::new(client);

    match command {
        EquipmentCommand::List { json } => {
            let list = equipment.list().await?;
            if json {
                return print_json(&list);
            }
            if list.is_empty() {
                println!("{}", "No equipment defined.".yellow());
                return Ok(());
            }

            let mut table = Table::new();
            table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
            table.add_row(row!["ID".bold(), "Name".bold(), "Updated".bold()]);
            for item in &list {
                table.add_row(row![
                    item.id.to_string().cyan(),
                    item.name,
                    format_instant(&item.updated_at)
                ]);
            }

            println!("\nEquipment:");
            table.printstd();
            println!();
        }
        EquipmentCommand::Create { name } => {
            let item = equipment.create(&name).await?;
            println!("{}", format!("Created equipment {} ({})", item.name, item.id).green());
        }
        EquipmentCommand::Update { id, name } => {
            let item = equipment.rename(id, &name).await?;
            println!("{}", format!("Renamed equipment {} to {}", item.id, item.name).green());
        }
        EquipmentCommand::Delete { id } => {
            equipment.delete(id).await?;
            println!("{}", format!("Deleted equipment {}", id).green());
        }
    }

    Ok(())
}
