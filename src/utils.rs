mod log_error;
mod parsers;
mod teloxide;

pub use log_error::ResultExt;
pub use parsers::parse_delete_time;

pub use self::teloxide::BotExt;
