//! List users command handler

use crate::config::Config;
use crate::db::Store;

pub async fn cmd_list_users(config: &Config, admins_only: bool) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let users: Vec<_> = store
        .users()
        .list_all()
        .await?
        .into_iter()
        .filter(|u| !admins_only || u.is_admin())
        .collect();

    if users.is_empty() {
        println!("No users found.");
        return Ok(());
    }

    println!("Users ({} total)", users.len());
    println!("{:-<70}", "");

    for user in users {
        let indicator = if user.is_blocked {
            "⛔"
        } else if user.is_admin() {
            "★"
        } else {
            "•"
        };

        println!("{indicator} {} <{}>", user.name, user.email);
        println!(
            "  ID: {} | Role: {} | 2FA: {}",
            user.id,
            user.role,
            if user.two_factor_enabled {
                user.two_factor_method.to_string()
            } else {
                "off".to_string()
            }
        );
        if let Some(reason) = user.blocked_reason.filter(|_| user.is_blocked) {
            println!("  Blocked: {reason}");
        }
    }

    println!();
    println!("Legend: ★ Admin | ⛔ Blocked");

    Ok(())
}
