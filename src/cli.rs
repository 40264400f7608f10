//! Command-line interface definition for MeetSpace
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for authentication and the booking resources.

use clap::{Parser, Subcommand};

use crate::api::types::ReservationStatus;
use crate::auth::credentials::CredentialPersistence;
use crate::auth::guard::RouteAccess;

/// MeetSpace - room booking client
#[derive(Parser, Debug, Clone)]
#[command(name = "meetspace")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the API base URL
    #[arg(long, global = true)]
    pub api_base: Option<String>,

    /// Override credential persistence (dual_durable, memory_with_cookie_refresh)
    #[arg(long, global = true)]
    pub persistence: Option<CredentialPersistence>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for MeetSpace
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Log in and store the session
    Login {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long, env = "MEETSPACE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account and log in
    Register {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Password
        #[arg(short, long, env = "MEETSPACE_PASSWORD", hide_env_values = true)]
        password: String,

        /// Password confirmation (defaults to the password)
        #[arg(long)]
        password_confirm: Option<String>,

        /// Given name
        #[arg(long, default_value = "")]
        first_name: String,

        /// Family name
        #[arg(long, default_value = "")]
        last_name: String,
    },

    /// End the session and forget stored credentials
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Browse and manage rooms
    Rooms {
        /// Room subcommand
        #[command(subcommand)]
        command: RoomCommand,
    },

    /// Manage the equipment catalogue
    Equipment {
        /// Equipment subcommand
        #[command(subcommand)]
        command: EquipmentCommand,
    },

    /// List, book, confirm and cancel reservations
    Reservations {
        /// Reservation subcommand
        #[command(subcommand)]
        command: ReservationCommand,
    },

    /// Administer user accounts
    Users {
        /// User subcommand
        #[command(subcommand)]
        command: UserCommand,
    },
}

/// Room subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum RoomCommand {
    /// List rooms
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show one room with its equipment
    Show {
        /// Room id
        id: i64,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Create a room (admin)
    Create {
        /// Room name
        #[arg(short, long)]
        name: String,

        /// Seat count
        #[arg(long)]
        capacity: Option<u32>,

        /// Free-form location
        #[arg(long)]
        location: Option<String>,

        /// Equipment as EQUIPMENT_ID[:QTY], repeatable
        #[arg(long = "equipment")]
        equipment: Vec<String>,
    },

    /// Update a room (admin)
    Update {
        /// Room id
        id: i64,

        /// New name
        #[arg(short, long)]
        name: Option<String>,

        /// New seat count
        #[arg(long)]
        capacity: Option<u32>,

        /// New location
        #[arg(long)]
        location: Option<String>,

        /// Replace equipment with EQUIPMENT_ID[:QTY], repeatable
        #[arg(long = "equipment")]
        equipment: Vec<String>,
    },

    /// Delete a room (admin)
    Delete {
        /// Room id
        id: i64,
    },
}

/// Equipment subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum EquipmentCommand {
    /// List equipment
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Add an equipment type (admin)
    Create {
        /// Equipment name
        name: String,
    },

    /// Rename an equipment type (admin)
    Update {
        /// Equipment id
        id: i64,

        /// New name
        name: String,
    },

    /// Delete an equipment type (admin)
    Delete {
        /// Equipment id
        id: i64,
    },
}

/// Reservation subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ReservationCommand {
    /// List reservations
    List {
        /// Only reservations of this room
        #[arg(long)]
        room: Option<i64>,

        /// Starting at or after (RFC 3339)
        #[arg(long)]
        from: Option<String>,

        /// Ending at or before (RFC 3339)
        #[arg(long)]
        to: Option<String>,

        /// Only reservations in this status (pending, confirmed, canceled)
        #[arg(long)]
        status: Option<ReservationStatus>,

        /// Only my reservations
        #[arg(long)]
        mine: bool,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show one reservation
    Show {
        /// Reservation id
        id: i64,
    },

    /// Book a room
    Create {
        /// Room id
        #[arg(long)]
        room: i64,

        /// Start time (RFC 3339)
        #[arg(long)]
        start: String,

        /// End time (RFC 3339)
        #[arg(long)]
        end: String,
    },

    /// Confirm a pending reservation
    Confirm {
        /// Reservation id
        id: i64,
    },

    /// Cancel a reservation
    Cancel {
        /// Reservation id
        id: i64,
    },
}

/// User administration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum UserCommand {
    /// List users
    List {
        /// Filter by email or name
        #[arg(short, long)]
        search: Option<String>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show one user
    Show {
        /// User id
        id: i64,
    },

    /// Create a user
    Create {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Initial password
        #[arg(short, long)]
        password: String,

        /// Given name
        #[arg(long, default_value = "")]
        first_name: String,

        /// Family name
        #[arg(long, default_value = "")]
        last_name: String,

        /// Grant the admin role
        #[arg(long)]
        admin: bool,
    },

    /// Update a user
    Update {
        /// User id
        id: i64,

        /// New email
        #[arg(short, long)]
        email: Option<String>,

        /// New given name
        #[arg(long)]
        first_name: Option<String>,

        /// New family name
        #[arg(long)]
        last_name: Option<String>,

        /// Activate or deactivate the account
        #[arg(long)]
        active: Option<bool>,

        /// Replace roles, repeatable
        #[arg(long = "role")]
        roles: Vec<String>,
    },

    /// Delete a user
    Delete {
        /// User id
        id: i64,
    },

    /// Set a new password for a user
    ResetPassword {
        /// User id
        id: i64,

        /// New password
        #[arg(short, long)]
        password: String,
    },
}

impl Commands {
    /// Access level required to run this command
    pub fn access(&self) -> RouteAccess {
        match self {
            Commands::Login { .. } | Commands::Register { .. } => RouteAccess::Guest,
            Commands::Logout => RouteAccess::Public,
            Commands::Whoami => RouteAccess::RequiresAuth,
            Commands::Rooms { command } => match command {
                RoomCommand::List { .. } | RoomCommand::Show { .. } => RouteAccess::RequiresAuth,
                _ => RouteAccess::RequiresAdmin,
            },
            Commands::Equipment { command } => match command {
                EquipmentCommand::List { .. } => RouteAccess::RequiresAuth,
                _ => RouteAccess::RequiresAdmin,
            },
            Commands::Reservations { .. } => RouteAccess::RequiresAuth,
            Commands::Users { .. } => RouteAccess::RequiresAdmin,
        }
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            api_base: None,
            persistence: None,
            command: Commands::Whoami,
        }
    }
}
