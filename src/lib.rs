pub mod config;
pub mod coordinates;
pub mod db;
pub mod emotions;
pub mod environment;
pub mod errors;
pub mod ingestion;
pub mod io;
pub mod lookup;
pub mod media;
pub mod proximity;
pub mod routes;
pub mod store;
pub mod urls;
pub mod whisper;
