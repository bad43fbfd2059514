//! Order backend server binary

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kitchen_api::store::AccountStore;
use kitchen_api::{
    crypto, routes, AppState, Config, ConsoleGateway, ConsoleMailer, InMemoryOtpStore, Mailer,
    PaymentGateway, RestGateway, SmtpMailer, SqliteStore, TokenKeys,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kitchen_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    tracing::info!(port = config.port, database = %config.database_path, "Loaded configuration");

    // Open the store
    let store = SqliteStore::open(&config.database_path)
        .map_err(|e| anyhow::anyhow!("Failed to open database: {}", e))?;

    // Seed the first staff account out-of-band if requested
    if let Some(seed) = &config.seed_admin {
        if store.get_staff_by_email(&seed.email)?.is_none() {
            let password_hash = crypto::hash_password(&seed.password)?;
            store.create_staff(kitchen_api::store::NewStaff {
                username: seed.username.clone(),
                email: seed.email.clone(),
                password_hash,
                name: None,
                phone_number: None,
            })?;
            tracing::info!(email = %seed.email, "Seeded initial staff account");
        }
    }

    // Pick collaborators: production implementations when configured,
    // console fallbacks otherwise
    let mailer: Box<dyn Mailer> = match config.smtp.clone() {
        Some(smtp) => Box::new(SmtpMailer::new(smtp).map_err(|e| anyhow::anyhow!(e))?),
        None => {
            tracing::warn!("SMTP not configured; registration codes will be logged to the console");
            Box::new(ConsoleMailer::new())
        }
    };
    let gateway: Box<dyn PaymentGateway> = match config.gateway.clone() {
        Some(gw) => Box::new(RestGateway::new(gw)),
        None => {
            tracing::warn!("Payment gateway not configured; charges will get local references");
            Box::new(ConsoleGateway::new())
        }
    };

    // Create app state
    let state = Arc::new(AppState::new(
        TokenKeys::from_secrets(&config.customer_token_secret, &config.staff_token_secret),
        store,
        Box::new(InMemoryOtpStore::new()),
        mailer,
        gateway,
    ));

    // Periodic sweep bounding growth of the OTP store; expiry itself is
    // still enforced at verification time
    let sweep_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let evicted = sweep_state.otp.purge_expired(Utc::now());
            if evicted > 0 {
                tracing::debug!(evicted, "Evicted expired registration codes");
            }
        }
    });

    // Create router
    let app = routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
