use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use env_logger::Env;
use sea_orm::{entity::*, DatabaseConnection};
use yamdb::orm::users::{self, Role};
use yamdb::user::{
    find_by_email, find_by_username, generate_confirmation_code, normalize_email,
    validate_username_not_reserved, USERNAME_RE,
};
use yamdb::{app_config, db};

#[derive(Parser)]
#[command(name = "yamdb-admin", about = "YaMDb administration")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the database tables and indexes if they are missing
    InitSchema,
    /// Create an admin account with the superuser flag set
    CreateSuperuser {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
    },
    /// Issue a fresh confirmation code for an existing account
    ResetCode {
        #[arg(long)]
        username: String,
    },
}

#[actix_web::main]
async fn main() -> Result<()> {
    let _ = dotenv::dotenv();
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = app_config::get_config();
    let pool = db::connect(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to the database")?;

    match cli.command {
        Command::InitSchema => {
            db::create_schema(&pool).await?;
            println!("Schema is up to date.");
        }
        Command::CreateSuperuser { username, email } => {
            let code = create_superuser(&pool, &username, &email, &config.auth).await?;
            println!("Created superuser `{}`.", username);
            println!("Confirmation code: {}", code);
        }
        Command::ResetCode { username } => {
            let user = find_by_username(&pool, &username)
                .await?
                .with_context(|| format!("No user named `{}`", username))?;
            let code = generate_confirmation_code(config.auth.confirmation_code_length);
            let mut active: users::ActiveModel = user.into();
            active.confirmation_code = Set(Some(code.clone()));
            active.update(&pool).await?;
            println!("Confirmation code: {}", code);
        }
    }

    Ok(())
}

async fn create_superuser(
    db: &DatabaseConnection,
    username: &str,
    email: &str,
    auth: &app_config::AuthConfig,
) -> Result<String> {
    if !USERNAME_RE.is_match(username) || validate_username_not_reserved(username).is_err() {
        bail!("`{}` is not a valid username", username);
    }
    let email = normalize_email(email);
    if find_by_username(db, username).await?.is_some() {
        bail!("A user named `{}` already exists", username);
    }
    if find_by_email(db, &email).await?.is_some() {
        bail!("A user with email `{}` already exists", email);
    }

    let code = generate_confirmation_code(auth.confirmation_code_length);
    users::ActiveModel {
        username: Set(username.to_owned()),
        email: Set(email),
        role: Set(Role::Admin),
        is_superuser: Set(true),
        confirmation_code: Set(Some(code.clone())),
        date_joined: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(code)
}
