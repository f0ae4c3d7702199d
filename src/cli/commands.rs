pub mod initdb;
pub mod migrate_and_serve;
pub mod resync_sequence;
pub mod serve;

pub use initdb::init_database;
pub use migrate_and_serve::migrate_and_serve;
pub use resync_sequence::resync_sequence;
pub use serve::serve;
