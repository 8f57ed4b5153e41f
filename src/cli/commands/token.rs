use anyhow::{bail, Context};
use serde_json::json;
use uuid::Uuid;

use crate::auth::{generate_jwt, roles, Claims};
use crate::cli::OutputFormat;
use crate::config;

pub fn handle(
    user: Option<Uuid>,
    name: String,
    granted: Vec<String>,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    for role in &granted {
        if !roles::ALL.contains(&role.as_str()) {
            bail!("Unknown role '{}' (expected one of {:?})", role, roles::ALL);
        }
    }

    let security = &config::config().security;
    let claims = Claims::new(
        user.unwrap_or_else(Uuid::new_v4),
        name,
        granted,
        security.jwt_expiry_hours,
    );
    let token = generate_jwt(&claims, &security.jwt_secret).context("Failed to sign token")?;

    match output_format {
        OutputFormat::Json => println!(
            "{}",
            json!({
                "token": token,
                "user_id": claims.sub,
                "roles": claims.roles,
                "expires_at": claims.exp,
            })
        ),
        OutputFormat::Text => println!("{}", token),
    }

    Ok(())
}
