use crate::app::App;
use crate::config::{Cli, Config};
use crate::db::connection::init_db;
use astra::Server;
use clap::Parser;
use std::net::SocketAddr;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod app;
mod auth;
mod config;
mod db;
mod domain;
mod errors;
mod leads;
mod ratelimit;
mod responses;
mod router;
mod spreadsheets;

#[cfg(test)]
mod tests;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            std::process::exit(2);
        }
    };

    let addr: SocketAddr = match config.bind.parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("invalid bind address '{}': {e}", config.bind);
            std::process::exit(2);
        }
    };

    let app = App::new(config);
    if let Err(e) = init_db(&app.db) {
        error!("Database initialization failed: {e}");
        std::process::exit(1);
    }

    info!("Starting server at http://{addr}");
    let server = Server::bind(&addr).max_workers(app.config.max_workers);

    let result = server.serve(move |req, info: astra::ConnectionInfo| router::dispatch(req, info.peer_addr(), &app));
    if let Err(e) = result {
        error!("Server ended with error: {e}");
        std::process::exit(1);
    }

    info!("Server shut down cleanly.");
}
