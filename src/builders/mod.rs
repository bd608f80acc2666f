mod select;

pub use select::{Select, SelectWithColumns, SelectWithTable};
