//! Enfor CLI - operator tasks for the brokerage backend
//!
//! Usage:
//!   enfor migrate
//!   enfor create-admin --email <email> --password <password> ...
//!   enfor hash-password <password>
//!   enfor config [--format toml|json]
//!   enfor gen-secret

use std::sync::Arc;

use anyhow::Context;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{Parser, Subcommand, ValueEnum};
use enfor_api::auth::{hash_password, AuthService, JwtConfig, PasswordConfig};
use enfor_core::{AppConfig, PgStore, SignupRequest, UserRole};
use rand::{rngs::OsRng, RngCore};
use serde_json::json;

#[derive(Parser)]
#[command(name = "enfor")]
#[command(about = "Enfor brokerage backend administration")]
#[command(version)]
struct Cli {
    /// TOML config file; environment variables still override it
    #[arg(long, global = true, env = "ENFOR_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Create a verified admin account
    CreateAdmin(AdminArgs),
    /// Print the Argon2id hash of a password
    HashPassword {
        password: String,
    },
    /// Print the effective configuration with secrets redacted
    Config {
        #[arg(long, value_enum, default_value_t = Format::Toml)]
        format: Format,
    },
    /// Print a random value suitable for JWT_SECRET
    GenSecret {
        /// Number of random bytes before encoding
        #[arg(long, default_value_t = 32)]
        bytes: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Toml,
    Json,
}

#[derive(clap::Args)]
struct AdminArgs {
    #[arg(long)]
    email: String,
    #[arg(long, env = "ENFOR_ADMIN_PASSWORD", hide_env_values = true)]
    password: String,
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long, default_value = "Enfor Administration")]
    firm_name: String,
    #[arg(long, default_value = "1970-01-01")]
    date_of_birth: String,
    #[arg(long, default_value = "0000000000")]
    whatsapp_number: String,
    #[arg(long, default_value = "Head office address")]
    address: String,
    #[arg(long, default_value = "Head office")]
    location: String,
    #[arg(long, default_value = "Mumbai")]
    city: String,
    #[arg(long, default_value = "Maharashtra")]
    state: String,
    #[arg(long, default_value = "400001")]
    postal_code: String,
}

impl AdminArgs {
    fn into_request(self) -> anyhow::Result<SignupRequest> {
        let request = json!({
            "first_name": self.first_name,
            "last_name": self.last_name,
            "email": self.email,
            "password": self.password,
            "date_of_birth": self.date_of_birth,
            "firm_name": self.firm_name,
            "role": "admin",
            "whatsapp_number": self.whatsapp_number,
            "address": self.address,
            "location": self.location,
            "city": self.city,
            "state": self.state,
            "postal_code": self.postal_code,
        });
        serde_json::from_value(request).context("invalid admin details")
    }
}

fn load_config(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    config.validate()?;
    Ok(config)
}

async fn connect(config: &AppConfig) -> anyhow::Result<PgStore> {
    let store = PgStore::connect(&config.database)
        .await
        .context("connecting to PostgreSQL")?;
    store.migrate().await.context("running migrations")?;
    Ok(store)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "enfor_core=info,enfor_api=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate => {
            let config = load_config(cli.config.as_deref())?;
            connect(&config).await?;
            println!("Migrations applied to {}", config.database.name);
        }
        Commands::CreateAdmin(args) => {
            let config = load_config(cli.config.as_deref())?;
            let request = args.into_request()?;
            let store = connect(&config).await?;

            let auth = AuthService::new(
                Arc::new(store),
                JwtConfig::from_settings(&config.jwt)?,
                PasswordConfig::default(),
            );
            let user = auth.create_account(request, UserRole::Admin).await?;
            tracing::info!(user_id = %user.id, "Admin account created");
            println!("Created admin {} ({})", user.email, user.id);
        }
        Commands::HashPassword { password } => {
            println!("{}", hash_password(&password)?);
        }
        Commands::Config { format } => {
            let config = load_config(cli.config.as_deref())?.redacted();
            let rendered = match format {
                Format::Toml => toml::to_string_pretty(&config)?,
                Format::Json => serde_json::to_string_pretty(&config)?,
            };
            println!("{rendered}");
        }
        Commands::GenSecret { bytes } => {
            anyhow::ensure!(bytes >= 16, "use at least 16 bytes");
            let mut buf = vec![0u8; bytes];
            OsRng.fill_bytes(&mut buf);
            println!("{}", STANDARD.encode(buf));
        }
    }

    Ok(())
}
