//! Room commands

use colored::Colorize;
use prettytable::{format, row, Table};

use crate::api::types::{Room, RoomEquipmentInput, RoomPayload};
use crate::api::{ApiClient, RoomsApi};
use crate::cli::RoomCommand;
use crate::commands::{format_instant, print_json};
use crate::error::Result;

/// Handle room commands
pub async fn handle_rooms(client: ApiClient, command: RoomCommand) -> Result<()> {
    let rooms = RoomsApi::new(client);

    match command {
        RoomCommand::List { json } => {
            let list = rooms.list().await?;
            if json {
                return print_json(&list);
            }
            if list.is_empty() {
                println!("{}", "No rooms found.".yellow());
                return Ok(());
            }
            print_rooms_table(&list);
        }
        RoomCommand::Show { id, json } => {
            let room = rooms.get(id).await?;
            if json {
                return print_json(&room);
            }
            print_room(&room);
        }
        RoomCommand::Create {
            name,
            capacity,
            location,
            equipment,
        } => {
            let payload = RoomPayload {
                name: Some(name),
                capacity,
                location,
                equipment: parse_equipment(&equipment)?,
            };
            let room = rooms.create(&payload).await?;
            println!("{}", format!("Created room {} ({})", room.name, room.id).green());
        }
        RoomCommand::Update {
            id,
            name,
            capacity,
            location,
            equipment,
        } => {
            let payload = RoomPayload {
                name,
                capacity,
                location,
                equipment: parse_equipment(&equipment)?,
            };
            let room = rooms.update(id, &payload).await?;
            println!("{}", format!("Updated room {} ({})", room.name, room.id).green());
        }
        RoomCommand::Delete { id } => {
            rooms.delete(id).await?;
            println!("{}", format!("Deleted room {}", id).green());
        }
    }

    Ok(())
}

/// `None` when no specs were given, so an update leaves equipment alone.
fn parse_equipment(specs: &[String]) -> Result<Option<Vec<RoomEquipmentInput>>> {
    if specs.is_empty() {
        return Ok(None);
    }
    let parsed = specs
        .iter()
        .map(|s| s.parse::<RoomEquipmentInput>())
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(Some(parsed))
}

fn equipment_summary(room: &Room) -> String {
    if room.equipment.is_empty() {
        return "-".to_string();
    }
    room.equipment
        .iter()
        .map(|e| format!("{} x{}", e.name, e.qty))
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_rooms_table(rooms: &[Room]) {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(row![
        "ID".bold(),
        "Name".bold(),
        "Capacity".bold(),
        "Location".bold(),
        "Equipment".bold()
    ]);

    for room in rooms {
        table.add_row(row![
            room.id.to_string().cyan(),
            room.name,
            room.capacity,
            room.location,
            equipment_summary(room)
        ]);
    }

    println!("\nRooms:");
    table.printstd();
    println!();
}

fn print_room(room: &Room) {
    println!("\nRoom {} ({})\n", room.name.bold(), room.id);
    println!("Capacity:   {}", room.capacity);
    println!("Location:   {}", room.location);
    println!("Equipment:  {}", equipment_summary(room));
    println!("Updated:    {}", format_instant(&room.updated_at));
    println!();
}
