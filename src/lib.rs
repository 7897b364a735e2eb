pub mod monitor;
pub mod notify;
pub mod shared;
pub mod sla;
pub mod store;
pub mod tickets;

pub use shared::clock::{Clock, SystemClock};
pub use shared::config::AppConfig;
pub use shared::error::HelpdeskError;
pub use shared::models::{
    Agent, Customer, Priority, SlaPolicy, Tenant, Ticket, TicketStatus,
};
