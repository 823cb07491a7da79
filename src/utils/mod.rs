pub mod bytereader;
pub mod crc;
pub mod error;
pub mod image;
pub mod info;
pub mod info_display;
pub mod logger;
pub mod options;
pub(crate) mod traits;
