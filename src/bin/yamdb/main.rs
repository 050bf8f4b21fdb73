use actix_web::http::header;
use actix_web::middleware::{DefaultHeaders, Logger, NormalizePath, TrailingSlash};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;
use env_logger::Env;
use yamdb::token::TokenKeys;
use yamdb::{app_config, db, email};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_lib_mods();
    app_config::init();

    let config = app_config::get_config();
    let pool = db::connect(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to the database")?;
    if config.database.auto_create_schema {
        db::create_schema(&pool)
            .await
            .context("Failed to create the database schema")?;
    }

    let keys = Data::new(TokenKeys::from_config(&config.auth));
    let mailer = Data::new(email::from_config(&config.email).context("Failed to set up email")?);
    let pool = Data::new(pool);

    let bind = (config.server.bind_address.clone(), config.server.port);

    HttpServer::new(move || {
        // Order of middleware IS IMPORTANT and is in REVERSE EXECUTION ORDER.
        App::new()
            .app_data(pool.clone())
            .app_data(keys.clone())
            .app_data(mailer.clone())
            .wrap(
                DefaultHeaders::new()
                    .add((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
                    .add(("Referrer-Policy", "no-referrer")),
            )
            .wrap(NormalizePath::new(TrailingSlash::Trim))
            .wrap(Logger::new("%a %r %s %Dms"))
            .configure(yamdb::web::configure)
    })
    .bind(bind)?
    .run()
    .await?;

    Ok(())
}

/// Initialize third party crates we rely on but don't have control over.
fn init_lib_mods() {
    // A missing .env is fine; the environment may already be populated.
    if let Err(e) = dotenv::dotenv() {
        eprintln!("No .env loaded: {}", e);
    }
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
}
