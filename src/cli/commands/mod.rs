mod user;

pub use user::cmd_user;
