mod migrate;
mod transfers;
mod users;

pub use migrate::cmd_migrate;
pub use transfers::cmd_pending_transfers;
pub use users::cmd_list_users;
