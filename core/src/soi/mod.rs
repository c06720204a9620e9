pub mod callsign;
pub mod signal;
pub mod site;

pub use callsign::Callsign;
pub use signal::Soi;
pub use site::{is_valid_name, Site, MAX_NAME_LEN};
