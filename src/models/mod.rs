pub mod ai;
pub mod auth;
pub mod download;
pub mod market;
pub mod optimization;
pub mod response;
pub mod stock;
pub mod strategy;

pub use auth::*;
pub use download::*;
pub use market::*;
pub use optimization::*;
pub use response::*;
pub use stock::*;
pub use strategy::*;
