use std::fmt;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// Declares a string-backed enum stored as TEXT and serialized lowercase.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            pub fn parse(s: &str) -> Option<$name> {
                match s {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let text = value.as_str()?;
                $name::parse(text).ok_or_else(|| {
                    FromSqlError::Other(format!("unknown {} '{}'", stringify!($name), text).into())
                })
            }
        }
    };
}

text_enum! {
    /// Account role. Pharmacists and managers are "staff".
    pub enum Role {
        Customer => "customer",
        Pharmacist => "pharmacist",
        Manager => "manager",
    }
}

impl Role {
    #[must_use]
    pub const fn is_staff(self) -> bool {
        matches!(self, Role::Pharmacist | Role::Manager)
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Customer
    }
}

text_enum! {
    pub enum PrescriptionStatus {
        Pending => "pending",
        Verified => "verified",
        Dispensed => "dispensed",
        Rejected => "rejected",
    }
}

impl PrescriptionStatus {
    /// pending -> verified | rejected, verified -> dispensed | rejected.
    /// Dispensed and rejected are terminal.
    #[must_use]
    pub const fn can_transition_to(self, next: PrescriptionStatus) -> bool {
        use PrescriptionStatus::*;
        matches!(
            (self, next),
            (Pending, Verified) | (Pending, Rejected) | (Verified, Dispensed) | (Verified, Rejected)
        )
    }
}

text_enum! {
    pub enum SaleStatus {
        Pending => "pending",
        Completed => "completed",
        Refunded => "refunded",
    }
}

impl SaleStatus {
    #[must_use]
    pub const fn can_transition_to(self, next: SaleStatus) -> bool {
        use SaleStatus::*;
        matches!(
            (self, next),
            (Pending, Completed) | (Pending, Refunded) | (Completed, Refunded)
        )
    }

    /// Whether stock for this sale is currently taken out of inventory.
    #[must_use]
    pub const fn holds_stock(self) -> bool {
        matches!(self, SaleStatus::Pending | SaleStatus::Completed)
    }
}

text_enum! {
    pub enum PaymentMethod {
        Cash => "cash",
        Card => "card",
        Insurance => "insurance",
    }
}

text_enum! {
    pub enum DiscountKind {
        Percentage => "percentage",
        Fixed => "fixed",
    }
}

text_enum! {
    /// Derived from a batch's quantity against its minimum stock level.
    pub enum StockStatus {
        InStock => "in_stock",
        LowStock => "low_stock",
        OutOfStock => "out_of_stock",
    }
}

impl StockStatus {
    #[must_use]
    pub const fn classify(quantity: i64, min_stock_level: i64) -> StockStatus {
        if quantity <= 0 {
            StockStatus::OutOfStock
        } else if quantity <= min_stock_level {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prescription_transitions() {
        use PrescriptionStatus::*;
        assert!(Pending.can_transition_to(Verified));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Verified.can_transition_to(Dispensed));
        assert!(Verified.can_transition_to(Rejected));

        assert!(!Pending.can_transition_to(Dispensed));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Dispensed.can_transition_to(Rejected));
        assert!(!Rejected.can_transition_to(Verified));
    }

    #[test]
    fn test_terminal_prescription_states() {
        for next in PrescriptionStatus::ALL {
            assert!(!PrescriptionStatus::Dispensed.can_transition_to(*next));
            assert!(!PrescriptionStatus::Rejected.can_transition_to(*next));
        }
    }

    #[test]
    fn test_sale_transitions() {
        use SaleStatus::*;
        assert!(Pending.can_transition_to(Completed));
        assert!(Completed.can_transition_to(Refunded));
        assert!(!Refunded.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Pending));
    }

    #[test]
    fn test_role_parse_and_staff() {
        assert_eq!(Role::parse("manager"), Some(Role::Manager));
        assert_eq!(Role::parse("admin"), None);
        assert!(Role::Pharmacist.is_staff());
        assert!(!Role::Customer.is_staff());
        assert_eq!(serde_json::to_string(&Role::Pharmacist).unwrap(), "\"pharmacist\"");
    }

    #[test]
    fn test_stock_status_classify() {
        assert_eq!(StockStatus::classify(0, 10), StockStatus::OutOfStock);
        assert_eq!(StockStatus::classify(10, 10), StockStatus::LowStock);
        assert_eq!(StockStatus::classify(11, 10), StockStatus::InStock);
    }
}
