mod bounded;

pub use bounded::{BoundedLine, BoundedLineReader};
