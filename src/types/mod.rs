pub mod market;
pub mod price;
pub mod quantity;

pub use market::Market;
pub use price::Price;
pub use quantity::Quantity;
