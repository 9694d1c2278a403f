pub mod google;
pub mod osrm;

pub use google::GoogleDistanceMatrix;
pub use osrm::OsrmTable;
