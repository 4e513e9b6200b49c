pub mod actor;
pub mod error;
pub mod grader;
pub mod handlers;
pub mod leaderboard;
pub mod models;
pub mod registry;
