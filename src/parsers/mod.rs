pub mod listing;


pub use listing::{parse_listing, pick_image_source, resolve_against};
