//! Booking service API
//!
//! [`client::ApiClient`] is the request pipeline; the resource modules are
//! thin typed wrappers over it.

pub mod client;
pub mod endpoint;
pub mod equipment;
pub mod normalize;
pub mod reservations;
pub mod rooms;
pub mod types;
pub mod users;

pub use client::{ApiClient, ApiRequest};
pub use endpoint::ApiBase;
pub use equipment::EquipmentApi;
pub use reservations::ReservationsApi;
pub use rooms::RoomsApi;
pub use users::UsersApi;
