//! This file serves as the root for all SeaORM entity modules.
//! The billing schema: coworkers and their profiles, the service catalog,
//! bills with their lines, and the counter bill numbers are drawn from.

pub mod bill;
pub mod bill_line;
pub mod bill_sequence;
pub mod service;
pub mod user;
pub mod user_profile;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::bill::Entity as Bill;
    pub use super::bill_line::Entity as BillLine;
    pub use super::bill_sequence::Entity as BillSequence;
    pub use super::service::Entity as Service;
    pub use super::user::Entity as User;
    pub use super::user_profile::Entity as UserProfile;
}
