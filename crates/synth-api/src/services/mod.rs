//! HTTP 服务模块
//!
//! 每个服务提供一组路由，共享 [`AppState`](crate::state::AppState)。

pub mod health_service;
pub mod large_service;
pub mod pagination_service;
pub mod params;
pub mod scenario_service;
pub mod stream_service;

pub use health_service::health_routes;
pub use large_service::large_routes;
pub use pagination_service::pagination_routes;
pub use scenario_service::scenario_routes;
pub use stream_service::stream_routes;
