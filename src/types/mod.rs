mod models;
mod money;
mod status;

pub use models::*;
pub use money::Money;
pub use status::{DiscountKind, PaymentMethod, PrescriptionStatus, Role, SaleStatus, StockStatus};
