pub mod ask;
pub mod init;
pub mod run;
pub mod schema;
pub mod setup;
