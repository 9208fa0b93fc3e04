// One module per subcommand; main.rs parses and dispatches.

pub mod districts;
pub mod route;
