use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};

mod args;
mod auth;
mod backend;
mod board;
mod message;
mod routes;
mod session;
mod time;
mod user;
mod view;

use args::Args;
use backend::Backend;
use board::Board;

#[tokio::main]
async fn main() -> ExitCode {
    pretty_env_logger::formatted_timed_builder()
        .parse_filters(&std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let addr = match args.addr() {
        Ok(addr) => addr,
        Err(e) => {
            error!("invalid listen address: {e}");
            return ExitCode::FAILURE;
        }
    };

    let backend = match Backend::new(args.data_dir()).await {
        Ok(backend) => backend,
        Err(e) => {
            error!("couldn't open database in {}: {e}", args.data_dir().display());
            return ExitCode::FAILURE;
        }
    };

    let board = Arc::new(Board::new(backend, args.session_lifetime()));

    let routes = routes::routes(
        board,
        routes::Options {
            secure: args.secure(),
            public_dir: args.public_dir().to_path_buf(),
        },
    );

    let (addr, server) = match warp::serve(routes).try_bind_ephemeral(addr) {
        Ok(bound) => bound,
        Err(e) => {
            error!("couldn't listen on {addr}: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!("listening on http://{addr}");
    server.await;

    ExitCode::SUCCESS
}
