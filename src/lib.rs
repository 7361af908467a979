pub mod app;
pub mod client;
pub mod company;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod navigation;
pub mod normalize;
pub mod routes;
pub mod state;
pub mod stats;
pub mod storage;
pub mod store;
pub mod ui;
pub mod views;

pub use app::router;
pub use client::FleetClient;
pub use config::Config;
pub use state::AppState;
pub use storage::{load_snapshot, spawn_reloader};
pub use store::{CancelToken, DataPath, MemoryStore, RealtimeStore, SharedStore, Subscription};
