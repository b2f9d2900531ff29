pub mod data_persistance;
pub mod detail;
pub mod droid;
pub mod extractor;
pub mod pipeline;
pub mod site;
pub mod wait;

pub use data_persistance::*;
pub use detail::*;
pub use droid::*;
pub use extractor::*;
pub use pipeline::*;
pub use site::*;
