//! Reservation commands

use colored::{ColoredString, Colorize};
use prettytable::{format, row, Table};

use crate::api::types::{Reservation, ReservationCreate, ReservationFilter, ReservationStatus};
use crate::api::{ApiClient, ReservationsApi};
use crate::cli::ReservationCommand;
use crate::commands::{format_instant, parse_instant, print_json};
use crate::error::{MeetspaceError, Result};

/// Handle reservation commands
pub async fn handle_reservations(client: ApiClient, command: ReservationCommand) -> Result<()> {
    let reservations = ReservationsApi::new(client);

    match command {
        ReservationCommand::List {
            room,
            from,
            to,
            status,
            mine,
            json,
        } => {
            let filter = ReservationFilter {
                room_id: room,
                from: from.as_deref().map(parse_instant).transpose()?,
                to: to.as_deref().map(parse_instant).transpose()?,
                status,
                mine,
            };
            let list = reservations.list(&filter).await?;
            if json {
                return print_json(&list);
            }
            if list.is_empty() {
                println!("{}", "No reservations found.".yellow());
                return Ok(());
            }
            print_reservations_table(&list);
        }
        ReservationCommand::Show { id } => {
            let reservation = reservations.get(id).await?;
            print_reservation(&reservation);
        }
        ReservationCommand::Create { room, start, end } => {
            let payload = ReservationCreate {
                room_id: room,
                start_at: parse_instant(&start)?,
                end_at: parse_instant(&end)?,
            };
            if payload.end_at <= payload.start_at {
                return Err(
                    MeetspaceError::Config("End time must be after start time".to_string()).into(),
                );
            }
            let reservation = reservations.create(&payload).await?;
            println!(
                "{}",
                format!(
                    "Reserved {} ({}), status {}",
                    reservation.room_name, reservation.id, reservation.status
                )
                .green()
            );
            if let Some(expires) = &reservation.hold_expires_at {
                println!(
                    "Confirm before {} with {}",
                    format_instant(expires),
                    format!("meetspace reservations confirm {}", reservation.id).cyan()
                );
            }
        }
        ReservationCommand::Confirm { id } => {
            let reservation = reservations.confirm(id).await?;
            println!("{}", format!("Reservation {} confirmed", reservation.id).green());
        }
        ReservationCommand::Cancel { id } => {
            let reservation = reservations.cancel(id).await?;
            println!("{}", format!("Reservation {} canceled", reservation.id).green());
        }
    }

    Ok(())
}

fn colored_status(status: ReservationStatus) -> ColoredString {
    match status {
        ReservationStatus::Pending => status.as_str().yellow(),
        ReservationStatus::Confirmed => status.as_str().green(),
        ReservationStatus::Canceled => status.as_str().red(),
    }
}

fn print_reservations_table(reservations: &[Reservation]) {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(row![
        "ID".bold(),
        "Room".bold(),
        "User".bold(),
        "Start".bold(),
        "End".bold(),
        "Status".bold()
    ]);

    for r in reservations {
        table.add_row(row![
            r.id.to_string().cyan(),
            r.room_name,
            r.user_email,
            format_instant(&r.start_at),
            format_instant(&r.end_at),
            colored_status(r.status)
        ]);
    }

    println!("\nReservations:");
    table.printstd();
    println!();
}

fn print_reservation(r: &Reservation) {
    println!("\nReservation {}\n", r.id.to_string().bold());
    println!("Room:     {} ({})", r.room_name, r.room);
    println!("User:     {}", r.user_email);
    println!("Start:    {}", format_instant(&r.start_at));
    println!("End:      {}", format_instant(&r.end_at));
    println!("Status:   {}", colored_status(r.status));
    if let Some(expires) = &r.hold_expires_at {
        println!("Hold:     until {}", format_instant(expires));
    }
    println!();
}
