pub mod clustering;
pub mod enums;
