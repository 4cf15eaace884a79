pub mod api;
pub mod config;
pub mod events;
pub mod fecha;
pub mod guard;
pub mod horario;
pub mod model;
pub mod session;
pub mod socket;
pub mod store;
pub mod ventas;
