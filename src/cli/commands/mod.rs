//! One module per subcommand.

pub mod add;
pub mod get;
pub mod key_info;
pub mod list;
