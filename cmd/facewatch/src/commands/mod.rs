//! Command implementations.

mod add;
mod init;
mod list;
mod reconcile;
mod run;
mod util;

pub use add::AddCommand;
pub use init::InitCommand;
pub use list::ListCommand;
pub use reconcile::ReconcileCommand;
pub use run::RunCommand;
