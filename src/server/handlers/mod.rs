pub mod config;
pub mod episodic;
pub mod health;
pub mod logs;
pub mod page;
pub mod threads;
