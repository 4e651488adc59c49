pub mod prelude;

pub mod dashboard_users;
