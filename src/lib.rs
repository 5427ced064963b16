pub mod core;
pub mod episodic;
pub mod history;
pub mod server;
pub mod state;
pub mod ui;
