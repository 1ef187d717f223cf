use std::error::Error;
use std::sync::Arc;

use futures::future::FutureExt;
use tokio::sync::mpsc;
use url::Url;
use warp::Filter;

use log::{error, info, initialize_logger};
use whispr::config::{get_variable, parse_variable_or};
use whispr::db::PgDb;
use whispr::environment::{Config, Environment};
use whispr::routes;
use whispr::store::S3Store;
use whispr::urls::Urls;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    let logger = initialize_logger();

    let store = Arc::new(S3Store::from_env().expect("initialize S3 store from environment"));

    let main_port: u16 = parse_variable_or("WHISPR_PORT", 8080);
    let admin_port: u16 = parse_variable_or("WHISPR_ADMIN_PORT", 8081);

    info!(logger, "Starting..."; "main_port" => main_port, "admin_port" => admin_port);
    let logger = Arc::new(logger);

    info!(logger, "Creating database pool...");
    let connection_string = get_variable("WHISPR_DB_CONNECTION_STRING");
    let pool = sqlx::Pool::connect(&connection_string)
        .await
        .expect("create database pool from WHISPR_DB_CONNECTION_STRING");
    let db = Arc::new(PgDb::new(pool));

    let base_url = Url::parse(&get_variable("WHISPR_BASE_URL")).expect("parse WHISPR_BASE_URL");
    let urls = Arc::new(Urls::new(base_url).expect("build URLs from WHISPR_BASE_URL"));

    let config = Config::from_env();
    info!(logger, "Loaded configuration"; "config" => ?config);

    let environment = Environment::new(logger.clone(), db, urls, store, config);

    let (termination_sender, mut termination_receiver) = mpsc::channel::<()>(1);

    let terminate = {
        let logger = logger.clone();

        Arc::new(move || {
            let termination_sender = termination_sender.clone();
            let logger = logger.clone();

            async move {
                if termination_sender.send(()).await.is_err() {
                    error!(logger, "Termination already in progress");
                }
            }
            .boxed()
        })
    };

    let should_terminate = async move {
        termination_receiver.recv().await;
    }
    .shared();

    let ctrlc = {
        let should_terminate = should_terminate.clone();
        let terminate = terminate.clone();

        let signal = tokio::signal::ctrl_c();

        async move {
            tokio::select! {
                _ = should_terminate => {},
                _ = signal => {
                    terminate().await;
                }
            }
        }
    };

    let main_server = {
        let should_terminate = should_terminate.clone();

        let (_, main_server) = warp::serve(routes::make_api(environment.clone()))
            .bind_with_graceful_shutdown(([0, 0, 0, 0], main_port), async {
                should_terminate.await;
            });

        main_server
    };

    let admin_server = {
        let should_terminate = should_terminate.clone();

        let routes = routes::admin::make_healthz_route()
            .or(routes::admin::make_termination_route(terminate));

        let (_, admin_server) =
            warp::serve(routes).bind_with_graceful_shutdown(([0, 0, 0, 0], admin_port), async {
                should_terminate.await;
            });

        admin_server
    };

    tokio::join!(ctrlc, main_server, admin_server);

    info!(logger, "Exiting gracefully...");

    Ok(())
}
