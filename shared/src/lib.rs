pub mod colors;
pub mod feature;
pub mod fills;
pub mod keys;
pub mod marks;
pub mod record;

pub use feature::{Feature, Geometry};
pub use fills::Fills;
pub use keys::structural_key;
pub use marks::{ArcMark, ArcStyle, Bubble, GeoPoint};
pub use record::{RegionRecord, RegionUpdate};
