pub mod client;
pub mod models;
pub mod websocket;

pub use client::HttpDashboardClient;
pub use dashboard_backend::DashboardBackend;
pub use websocket::PriceStream;
