use anyhow::anyhow;
use serde_json::json;

use crate::auth::issue_token;
use crate::cli::utils::output_success;
use crate::cli::{connect, OutputFormat};
use crate::config::config;
use crate::database::models::user;

pub async fn handle(username: String, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = connect().await?;
    let account = user::find_by_username(&pool, &username)
        .await?
        .ok_or_else(|| anyhow!("no user named '{}'", username))?;

    let token = issue_token(account.id, account.role, &config().security)?;

    match output_format {
        OutputFormat::Json => output_success(
            &output_format,
            &format!("Token issued for {}", account.username),
            Some(json!({ "token": token, "user_id": account.id, "role": account.role })),
        ),
        OutputFormat::Text => {
            // bare token so it can be captured by shell scripts
            println!("{}", token);
            Ok(())
        }
    }
}
