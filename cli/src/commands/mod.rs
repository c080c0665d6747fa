pub mod check;
pub mod provision;
pub mod watch;
pub mod whoami;
