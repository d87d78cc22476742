pub mod status;

pub use status::{MonitorStatus, ProductStatus, StatusSnapshot};
