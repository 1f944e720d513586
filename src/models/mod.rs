pub mod geo;
pub mod person;

pub use geo::GeoPoint;
pub use person::Person;
