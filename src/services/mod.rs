pub mod provisioning;
pub use provisioning::{CommandProvisioner, ProvisionError, ServerProvisioner};

pub mod servers;
pub use servers::{CreatedServer, ServerError, ServerService};
