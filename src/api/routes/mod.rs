pub mod health;
pub mod nodes;
