//! Offline admin bootstrap tool. Users are never created through the
//! Control API; this binary is the only way a `User` row comes into being.

use clap::Parser;
use dnsentinel::config::Config;
use dnsentinel::model::User;
use dnsentinel::store::{SqliteStore, Store};

#[derive(Parser, Debug)]
#[command(name = "bootstrap-admin")]
#[command(about = "Creates a Control API user")]
struct Args {
    /// Username for the new account.
    #[arg(long)]
    username: String,

    /// Database URL to write into; defaults to the same one the server uses.
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    let args = Args::parse();
    let config = Config::from_env();
    let database_url = args.database_url.unwrap_or(config.database_url);

    let store = SqliteStore::connect(&database_url).await?;

    if store.find_user(&args.username).await?.is_some() {
        eprintln!("user '{}' already exists", args.username);
        std::process::exit(1);
    }

    let password = rpassword::prompt_password("Password: ")?;
    let confirm = rpassword::prompt_password("Confirm password: ")?;
    if password != confirm {
        eprintln!("passwords did not match");
        std::process::exit(1);
    }

    let hashed_password = bcrypt::hash(&password, bcrypt::DEFAULT_COST)?;
    store
        .insert_user(&User {
            username: args.username.clone(),
            hashed_password,
        })
        .await?;

    println!("created user '{}'", args.username);
    Ok(())
}
