/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Room event to live broadcast bridge.
pub mod live_events;
/// Room lifecycle use cases.
pub mod room_service;
/// Joining rooms.
pub mod user_service;
/// WebSocket connection and message handling service.
pub mod websocket_service;
