//! User administration commands

use colored::Colorize;
use prettytable::{format, row, Table};

use crate::api::types::{AdminUser, AdminUserCreate, AdminUserUpdate};
use crate::api::{ApiClient, UsersApi};
use crate::auth::session::ADMIN_ROLE;
use crate::cli::UserCommand;
use crate::commands::{format_instant, print_json};
use crate::error::Result;

/// Handle user administration commands
pub async fn handle_users(client: ApiClient, command: UserCommand) -> Result<()> {
    let users = UsersApi::new(client);

    match command {
        UserCommand::List { search, json } => {
            let query = search.as_deref().unwrap_or_default();
            let list: Vec<AdminUser> = users
                .list(search.as_deref())
                .await?
                .into_iter()
                .filter(|u| u.matches(query))
                .collect();
            if json {
                return print_json(&list);
            }
            if list.is_empty() {
                println!("{}", "No users found.".yellow());
                return Ok(());
            }
            print_users_table(&list);
        }
        UserCommand::Show { id } => {
            let user = users.get(id).await?;
            print_user(&user);
        }
        UserCommand::Create {
            email,
            password,
            first_name,
            last_name,
            admin,
        } => {
            let roles = if admin {
                vec![ADMIN_ROLE.to_string()]
            } else {
                Vec::new()
            };
            let payload = AdminUserCreate {
                email,
                password,
                first_name,
                last_name,
                roles,
            };
            let user = users.create(&payload).await?;
            println!("{}", format!("Created user {} ({})", user.email, user.id).green());
        }
        UserCommand::Update {
            id,
            email,
            first_name,
            last_name,
            active,
            roles,
        } => {
            let payload = AdminUserUpdate {
                email,
                first_name,
                last_name,
                is_active: active,
                roles: (!roles.is_empty()).then_some(roles),
            };
            let user = users.update(id, &payload).await?;
            println!("{}", format!("Updated user {} ({})", user.email, user.id).green());
        }
        UserCommand::Delete { id } => {
            users.delete(id).await?;
            println!("{}", format!("Deleted user {}", id).green());
        }
        UserCommand::ResetPassword { id, password } => {
            users.reset_password(id, &password).await?;
            println!("{}", format!("Password reset for user {}", id).green());
        }
    }

    Ok(())
}

fn active_label(user: &AdminUser) -> String {
    match user.is_active {
        Some(true) => "Yes".to_string(),
        Some(false) => "No".to_string(),
        None => "-".to_string(),
    }
}

fn print_users_table(users: &[AdminUser]) {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(row![
        "ID".bold(),
        "Email".bold(),
        "Name".bold(),
        "Roles".bold(),
        "Active".bold()
    ]);

    for user in users {
        let name = format!("{} {}", user.first_name, user.last_name);
        table.add_row(row![
            user.id.to_string().cyan(),
            user.email,
            name.trim(),
            user.roles.join(", "),
            active_label(user)
        ]);
    }

    println!("\nUsers:");
    table.printstd();
    println!();
}

fn print_user(user: &AdminUser) {
    println!("\nUser {} ({})\n", user.email.bold(), user.id);
    println!("First name:  {}", user.first_name);
    println!("Last name:   {}", user.last_name);
    println!("Roles:       {}", user.roles.join(", "));
    println!("Active:      {}", active_label(user));
    if let Some(created) = &user.created_at {
        println!("Created:     {}", format_instant(created));
    }
    if let Some(last_login) = &user.last_login {
        println!("Last login:  {}", format_instant(last_login));
    }
    println!();
}
