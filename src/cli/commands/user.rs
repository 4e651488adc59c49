//! User record command handlers

use anyhow::Context;

use crate::cli::UserCommands;
use crate::config::Config;
use crate::db::Store;

pub async fn cmd_user(config: &Config, command: UserCommands) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_url).await?;
    let repo = store.user_repo();

    match command {
        UserCommands::Show { username } => match repo.get(&username).await? {
            Some(record) => {
                let json = serde_json::to_string_pretty(&record)
                    .context("Failed to serialize user record")?;
                println!("{json}");
            }
            None => println!("No record for user '{username}'."),
        },

        UserCommands::Premium { username, enabled } => {
            if repo.set_premium(&username, enabled).await? {
                let label = if enabled { "premium" } else { "free" };
                println!("✓ {username} is now on the {label} plan.");
            } else {
                println!("No record for user '{username}'. They must log in once first.");
            }
        }

        UserCommands::Players {
            username,
            modern,
            total,
        } => {
            if modern < 0 || total < 0 || modern > total {
                anyhow::bail!("Player counts must satisfy 0 <= modern <= total");
            }

            if repo.set_player_counts(&username, modern, total).await? {
                println!("✓ Recorded {modern}/{total} ModernAuth players for {username}.");
            } else {
                println!("No record for user '{username}'. They must log in once first.");
            }
        }
    }

    Ok(())
}
