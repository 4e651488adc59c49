pub use super::dashboard_users::Entity as DashboardUsers;
