//! BusBot - keeps the bus head count over SMS.

pub mod attendance;
pub mod commands;
pub mod database;
pub mod directory;
pub mod engine;
pub mod fanout;
pub mod member;
pub mod roster;
pub mod sms;
pub mod store;


pub use commands::Settings;
pub use database::Database;
pub use engine::{Ack, Engine, Inbound, Receipt};
pub use fanout::{Outbound, Outbox};
pub use member::{Member, Phone, Status};
pub use sms::{SmsClient, SmsConfig};
pub use store::{Store, StoreError};
