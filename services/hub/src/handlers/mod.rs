pub mod health;
pub mod history;
pub mod instrument;
pub mod market;
pub mod ws;
