//! CLI commands

mod check;
mod completions;
mod export;
mod init;
mod inspect;
mod lint;
mod resolve;

pub use check::CheckCommand;
pub use completions::CompletionsCommand;
pub use export::ExportCommand;
pub use init::InitCommand;
pub use inspect::InspectCommand;
pub use lint::LintCommand;
pub use resolve::ResolveCommand;
