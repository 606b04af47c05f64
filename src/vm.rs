pub mod commands;
pub mod dispatch;
pub mod mode;
pub mod program;
pub mod state;
