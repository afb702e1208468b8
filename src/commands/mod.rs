// Transaction and state inspection commands
pub mod apply;
pub mod diff;
pub mod status;
