//! Create the first admin account (or any staff account) from the command line.
//!
//! Usage: create-admin --username admin --password '...' --full-name 'Klinik Yöneticisi'
//!        [--email admin@klinik.com] [--role receptionist]

use clap::Parser;

use fizyo_clinic_api::{
    db,
    models::user::{CreateUserRequest, UserRole},
    services::users::UserService,
};

#[derive(Parser)]
#[command(name = "create-admin", about = "Create a staff account in the clinic database")]
struct Args {
    #[arg(long)]
    username: String,

    /// At least 8 characters
    #[arg(long)]
    password: String,

    #[arg(long)]
    full_name: String,

    #[arg(long)]
    email: Option<String>,

    /// admin, therapist or receptionist
    #[arg(long, default_value = "admin")]
    role: UserRole,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    if args.role == UserRole::Patient {
        anyhow::bail!("Patients log in with a phone code; create them from the patient registry");
    }

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable not set"))?;
    let pool = db::create_pool(&database_url).await?;
    db::run_migrations(&pool).await?;

    let user = UserService::create(
        &pool,
        &CreateUserRequest {
            username: args.username,
            email: args.email,
            password: args.password,
            full_name: args.full_name,
            phone: None,
            role: args.role,
        },
    )
    .await?;

    tracing::info!("Created {} account '{}' ({})", user.role, user.username, user.id);
    Ok(())
}
