//! A helper program that prepares the database and the object store:
//! runs the migrations and creates the bucket if it is missing.

use movine::Movine;
use postgres::{Client, NoTls};

use log::{debug, info, initialize_logger, Logger};
use whispr::config::{get_variable, get_variable_or};
use whispr::store::S3Store;

fn main() {
    dotenv::dotenv().ok();

    let logger = initialize_logger();

    run_migrations(&logger);
    provision_bucket(&logger);

    debug!(logger, "Completed initialization.");
}

fn run_migrations(logger: &Logger) {
    let connection_string = get_variable("WHISPR_DB_CONNECTION_STRING");
    let migrations = get_variable_or("WHISPR_MIGRATIONS_DIR", "./migrations");

    debug!(logger, "Connecting to database...");

    let client = Client::connect(&connection_string, NoTls).expect("could not connect to database");

    let mut movine = Movine::new(client);
    movine.set_migration_dir(&migrations);

    if movine.status().is_err() {
        debug!(logger, "Initializing movine...");
        movine.initialize().expect("failed to initialize movine")
    }

    debug!(logger, "Running migrations..."; "directory" => &migrations);
    movine.up().expect("failed to run migrations");
}

fn provision_bucket(logger: &Logger) {
    let runtime = tokio::runtime::Runtime::new().expect("start runtime");

    debug!(logger, "Checking bucket...");
    let created = runtime
        .block_on(async {
            let store = S3Store::from_env().expect("initialize S3 store from environment");
            store.ensure_bucket().await
        })
        .expect("failed to provision bucket");

    info!(logger, "Bucket ready"; "created" => created);
}
