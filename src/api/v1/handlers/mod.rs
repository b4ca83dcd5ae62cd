pub mod health;
pub mod ping;
