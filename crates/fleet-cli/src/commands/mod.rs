pub mod health;
pub mod init;
pub mod place;
pub mod validate;
