pub mod cat;
pub mod common;
pub mod ls;
pub mod mount;
pub mod stat;
pub mod version;

pub use cat::cmd_cat;
pub use ls::cmd_ls;
pub use mount::cmd_mount;
pub use stat::cmd_stat;
pub use version::cmd_version;
