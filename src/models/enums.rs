use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(StaffRole {
    Admin => "admin",
    Doctor => "doctor",
    Nurse => "nurse",
    Receptionist => "receptionist",
    LabTechnician => "lab_technician",
    Pharmacist => "pharmacist",
    Cashier => "cashier",
});

str_enum!(Gender {
    Male => "male",
    Female => "female",
    Other => "other",
});

str_enum!(AppointmentStatus {
    Scheduled => "scheduled",
    Completed => "completed",
    Cancelled => "cancelled",
    NoShow => "no_show",
});

str_enum!(AppointmentPayment {
    Unpaid => "unpaid",
    Paid => "paid",
});

str_enum!(TestRequestStatus {
    Requested => "requested",
    InProgress => "in_progress",
    Completed => "completed",
    Cancelled => "cancelled",
});

str_enum!(PaymentMethod {
    Cash => "cash",
    Card => "card",
    MobileMoney => "mobile_money",
    Insurance => "insurance",
});

str_enum!(PaymentStatus {
    Pending => "pending",
    Completed => "completed",
    Refunded => "refunded",
    Cancelled => "cancelled",
});

str_enum!(InvoiceStatus {
    Pending => "pending",
    Paid => "paid",
});

str_enum!(ReferralStatus {
    Pending => "pending",
    Accepted => "accepted",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl AppointmentStatus {
    /// Forward transitions only. Completed/cancelled/no-show are terminal.
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        matches!(
            (self, next),
            (
                AppointmentStatus::Scheduled,
                AppointmentStatus::Completed
                    | AppointmentStatus::Cancelled
                    | AppointmentStatus::NoShow
            )
        )
    }
}

impl TestRequestStatus {
    /// requested → in_progress → completed, cancellable until terminal.
    pub fn can_transition_to(&self, next: TestRequestStatus) -> bool {
        matches!(
            (self, next),
            (
                TestRequestStatus::Requested,
                TestRequestStatus::InProgress | TestRequestStatus::Cancelled
            ) | (
                TestRequestStatus::InProgress,
                TestRequestStatus::Completed | TestRequestStatus::Cancelled
            )
        )
    }
}

impl ReferralStatus {
    /// pending → accepted → completed; cancellable until terminal.
    pub fn can_transition_to(&self, next: ReferralStatus) -> bool {
        matches!(
            (self, next),
            (
                ReferralStatus::Pending,
                ReferralStatus::Accepted | ReferralStatus::Cancelled
            ) | (
                ReferralStatus::Accepted,
                ReferralStatus::Completed | ReferralStatus::Cancelled
            )
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn staff_role_round_trip() {
        for (variant, s) in [
            (StaffRole::Admin, "admin"),
            (StaffRole::Doctor, "doctor"),
            (StaffRole::Nurse, "nurse"),
            (StaffRole::Receptionist, "receptionist"),
            (StaffRole::LabTechnician, "lab_technician"),
            (StaffRole::Pharmacist, "pharmacist"),
            (StaffRole::Cashier, "cashier"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(StaffRole::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn test_request_status_round_trip() {
        for (variant, s) in [
            (TestRequestStatus::Requested, "requested"),
            (TestRequestStatus::InProgress, "in_progress"),
            (TestRequestStatus::Completed, "completed"),
            (TestRequestStatus::Cancelled, "cancelled"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(TestRequestStatus::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn invalid_enum_returns_error() {
        assert!(StaffRole::from_str("janitor").is_err());
        assert!(AppointmentStatus::from_str("unknown").is_err());
        assert!(PaymentMethod::from_str("").is_err());
    }

    #[test]
    fn appointment_transitions() {
        let s = AppointmentStatus::Scheduled;
        assert!(s.can_transition_to(AppointmentStatus::Completed));
        assert!(s.can_transition_to(AppointmentStatus::Cancelled));
        assert!(s.can_transition_to(AppointmentStatus::NoShow));
        assert!(!AppointmentStatus::Completed.can_transition_to(AppointmentStatus::Scheduled));
        assert!(!AppointmentStatus::Cancelled.can_transition_to(AppointmentStatus::Completed));
    }

    #[test]
    fn test_request_transitions() {
        assert!(TestRequestStatus::Requested.can_transition_to(TestRequestStatus::InProgress));
        assert!(TestRequestStatus::Requested.can_transition_to(TestRequestStatus::Cancelled));
        assert!(TestRequestStatus::InProgress.can_transition_to(TestRequestStatus::Completed));
        assert!(!TestRequestStatus::Requested.can_transition_to(TestRequestStatus::Completed));
        assert!(!TestRequestStatus::Completed.can_transition_to(TestRequestStatus::InProgress));
        assert!(!TestRequestStatus::Cancelled.can_transition_to(TestRequestStatus::Requested));
    }

    #[test]
    fn referral_transitions() {
        assert!(ReferralStatus::Pending.can_transition_to(ReferralStatus::Accepted));
        assert!(ReferralStatus::Accepted.can_transition_to(ReferralStatus::Completed));
        assert!(!ReferralStatus::Pending.can_transition_to(ReferralStatus::Completed));
        assert!(!ReferralStatus::Completed.can_transition_to(ReferralStatus::Pending));
    }
}
