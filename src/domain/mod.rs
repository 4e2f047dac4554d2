pub mod order;
pub mod package;

pub use order::{FulfillmentDetails, Order, OrderStatus, PaymentDetails, PaymentStatus};
pub use package::{Category, Package};
