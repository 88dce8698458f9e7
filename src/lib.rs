pub mod config;
pub mod cricket_api;
pub mod event_store;
pub mod events;
pub mod fake_feed;
pub mod feed;
pub mod http_cache;
pub mod http_client;
pub mod images;
pub mod logging;
pub mod milestones;
pub mod model;
pub mod monitor;
pub mod poll_gate;
pub mod reconcile;
pub mod scheduler;
pub mod state;
pub mod task;
pub mod watermark_store;
