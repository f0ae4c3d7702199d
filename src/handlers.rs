pub mod bill_lines;
pub mod bills;
pub mod errors;
pub mod health;
pub mod services;
pub mod users;
