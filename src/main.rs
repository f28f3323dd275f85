use clap::Parser;
use color_eyre::Result;
use my_organizer::{
    AppContext, Config, Database, Profile,
    cli::{self, Cli, CliError, Commands},
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Set up error reporting with color-eyre
    color_eyre::install()?;

    // Library logs go through `log`; RUST_LOG=info shows them
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Determine profile: --dev flag enables dev mode, otherwise use prod
    let profile = if cli.dev { Profile::Dev } else { Profile::Prod };

    let config = Config::load_with_profile(profile)?;
    let clock = config.clock()?;

    // Initialize database
    let db_path = config.get_database_path();
    let db = Database::new(
        db_path
            .to_str()
            .ok_or_else(|| color_eyre::eyre::eyre!("Database path contains invalid UTF-8"))?,
    )?;

    match cli.command {
        Commands::Register {
            nickname,
            email,
            password,
        } => {
            cli::handle_register(&db, &config, nickname, email, password)?;
        }
        Commands::Login { identifier, password } => {
            cli::handle_login(&db, &config, &identifier, &password, clock.now()).await?;
        }
        Commands::ResetPassword {
            email,
            password,
            confirm,
        } => {
            cli::handle_reset_password(&db, &email, &password, &confirm)?;
        }
        command => {
            let mut ctx = AppContext::restore(db, clock, &config)?.ok_or(CliError::NotLoggedIn)?;

            match command {
                Commands::Logout => {
                    let nickname = ctx.session().nickname.clone();
                    ctx.logout()?;
                    println!("Goodbye, @{}.", nickname);
                }
                Commands::DeleteAccount { confirm } => {
                    ctx.delete_account(&confirm)?;
                    println!("Account deleted.");
                }
                command => {
                    if config.access.enforce && !command.bypasses_access() {
                        cli::enforce_access(ctx.session(), ctx.now(), &config).await?;
                    }
                    cli::run(command, &mut ctx, &config).await?;
                }
            }
        }
    }

    Ok(())
}
