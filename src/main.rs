use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use mongodb::Client;
use tracing_subscriber::EnvFilter;
use tripsplit::config::Config;
use tripsplit::routes;
use tripsplit::store::MongoStore;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_tracing();

    let config = Config::from_env().map_err(|err| {
        tracing::error!(error = %err, "invalid configuration");
        std::io::Error::new(std::io::ErrorKind::InvalidInput, err)
    })?;
    tracing::info!(uri = %config.mongodb_uri, database = %config.database, "using MongoDB");

    let client = Client::with_uri_str(&config.mongodb_uri)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "failed to connect");
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, err)
        })?;
    let store = web::Data::new(MongoStore::new(&client, &config.database));
    tracing::info!(addr = %config.bind_addr, port = config.port, "listening");

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .app_data(store.clone())
            .configure(routes::configure::<MongoStore>)
    })
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await
}
