pub mod archive;
pub mod gzip;
