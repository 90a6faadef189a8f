pub mod device;
pub mod device_type;
pub mod location;
pub mod part_type;
pub mod replacement_suggestion;
