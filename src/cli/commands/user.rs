use anyhow::bail;
use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{output_success, output_table};
use crate::cli::{connect, OutputFormat};
use crate::database::models::{user, Role, User};
use crate::database::{PageRequest, Repository};

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "List accounts in creation order")]
    List {
        #[arg(long, default_value_t = 0, help = "Zero-based page")]
        page: i64,
        #[arg(long, default_value_t = 100, help = "Accounts per page")]
        size: i64,
    },

    #[command(about = "Grant the admin role")]
    Promote {
        #[arg(help = "Username")]
        username: String,
    },

    #[command(about = "Revoke the admin role")]
    Demote {
        #[arg(help = "Username")]
        username: String,
    },
}

pub async fn handle(cmd: UserCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        UserCommands::List { page, size } => list(page, size, output_format).await,
        UserCommands::Promote { username } => set_role(username, Role::Admin, output_format).await,
        UserCommands::Demote { username } => set_role(username, Role::User, output_format).await,
    }
}

async fn list(page: i64, size: i64, output_format: OutputFormat) -> anyhow::Result<()> {
    if page < 0 || size <= 0 {
        bail!("page must be >= 0 and size > 0");
    }

    let pool = connect().await?;
    let users = Repository::<User>::new(pool)
        .page::<User>(PageRequest { page, size })
        .await?;

    let rows = users
        .iter()
        .map(|u| {
            vec![
                u.id.to_string(),
                u.username.clone(),
                u.email.clone(),
                u.role.to_string(),
                u.provider.as_str().to_string(),
            ]
        })
        .collect();

    output_table(
        &output_format,
        &["ID", "USERNAME", "EMAIL", "ROLE", "PROVIDER"],
        rows,
        serde_json::to_value(&users)?,
    )
}

async fn set_role(username: String, role: Role, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = connect().await?;
    if !user::set_role(&pool, &username, role).await? {
        bail!("no user named '{}'", username);
    }
    tracing::info!("Set role of {} to {}", username, role);

    output_success(
        &output_format,
        &format!("{} is now {}", username, role),
        Some(json!({ "username": username, "role": role })),
    )
}
