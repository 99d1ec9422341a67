//! One module per subcommand.  Each exposes `execute` functions that
//! `main` dispatches to.

pub mod audit_cmd;
pub mod completions;
pub mod decrypt;
pub mod delete;
pub mod encrypt;
pub mod envelope;
pub mod get;
pub mod keygen;
pub mod list;
pub mod rotate;
pub mod run;
pub mod set;
