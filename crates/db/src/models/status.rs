//! Status helper enums mapping to SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding `*_statuses` database table. `try_from_id` turns a
//! raw column value back into the closed enum so callers can match
//! exhaustively instead of comparing magic numbers.

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Map a raw status ID back onto the enum.
            pub fn try_from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Project hosting lifecycle.
    ProjectStatus {
        Onboarding = 1,
        Migrating = 2,
        Active = 3,
        Suspended = 4,
        Deleted = 5,
    }
}

define_status_enum! {
    /// Fix request lifecycle.
    FixStatus {
        Submitted = 1,
        Triaging = 2,
        Quoted = 3,
        AwaitingPayment = 4,
        InProgress = 5,
        PreviewReady = 6,
        Approved = 7,
        Deploying = 8,
        Deployed = 9,
        Rejected = 10,
        OutOfScope = 11,
        Failed = 12,
    }
}

define_status_enum! {
    /// Triage complexity classification.
    FixComplexity {
        Simple = 1,
        Complex = 2,
        OutOfScope = 3,
    }
}

define_status_enum! {
    /// Deployment build lifecycle (the closed internal vocabulary; remote
    /// readiness strings are translated onto this exactly once, in the
    /// deployment poller).
    DeploymentStatus {
        Queued = 1,
        Building = 2,
        Ready = 3,
        Error = 4,
        Cancelled = 5,
    }
}

define_status_enum! {
    /// Invoice settlement state.
    InvoiceStatus {
        Pending = 1,
        Paid = 2,
        Failed = 3,
    }
}

define_status_enum! {
    /// Background pipeline job execution status.
    JobStatus {
        Pending = 1,
        Running = 2,
        Completed = 3,
        Failed = 4,
    }
}

impl FixStatus {
    /// Terminal states: no pipeline step will advance the fix further.
    /// `Failed` is recoverable by re-invoking the failed step and is not
    /// considered terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, FixStatus::Deployed | FixStatus::Rejected | FixStatus::OutOfScope)
    }
}

impl DeploymentStatus {
    /// A deployment the poller no longer needs to reconcile.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DeploymentStatus::Ready | DeploymentStatus::Error | DeploymentStatus::Cancelled
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_status_ids_match_seed_data() {
        assert_eq!(ProjectStatus::Onboarding.id(), 1);
        assert_eq!(ProjectStatus::Migrating.id(), 2);
        assert_eq!(ProjectStatus::Active.id(), 3);
        assert_eq!(ProjectStatus::Suspended.id(), 4);
        assert_eq!(ProjectStatus::Deleted.id(), 5);
    }

    #[test]
    fn fix_status_ids_match_seed_data() {
        assert_eq!(FixStatus::Submitted.id(), 1);
        assert_eq!(FixStatus::Triaging.id(), 2);
        assert_eq!(FixStatus::Quoted.id(), 3);
        assert_eq!(FixStatus::AwaitingPayment.id(), 4);
        assert_eq!(FixStatus::InProgress.id(), 5);
        assert_eq!(FixStatus::PreviewReady.id(), 6);
        assert_eq!(FixStatus::Approved.id(), 7);
        assert_eq!(FixStatus::Deploying.id(), 8);
        assert_eq!(FixStatus::Deployed.id(), 9);
        assert_eq!(FixStatus::Rejected.id(), 10);
        assert_eq!(FixStatus::OutOfScope.id(), 11);
        assert_eq!(FixStatus::Failed.id(), 12);
    }

    #[test]
    fn round_trip_through_raw_id() {
        for status in [
            FixStatus::Submitted,
            FixStatus::PreviewReady,
            FixStatus::Failed,
        ] {
            assert_eq!(FixStatus::try_from_id(status.id()), Some(status));
        }
        assert_eq!(FixStatus::try_from_id(99), None);
    }

    #[test]
    fn terminal_fix_statuses() {
        assert!(FixStatus::Deployed.is_terminal());
        assert!(FixStatus::Rejected.is_terminal());
        assert!(FixStatus::OutOfScope.is_terminal());
        assert!(!FixStatus::Failed.is_terminal());
        assert!(!FixStatus::PreviewReady.is_terminal());
    }

    #[test]
    fn terminal_deployment_statuses() {
        assert!(DeploymentStatus::Ready.is_terminal());
        assert!(DeploymentStatus::Error.is_terminal());
        assert!(DeploymentStatus::Cancelled.is_terminal());
        assert!(!DeploymentStatus::Queued.is_terminal());
        assert!(!DeploymentStatus::Building.is_terminal());
    }

    #[test]
    fn status_into_status_id() {
        let id: StatusId = ProjectStatus::Onboarding.into();
        assert_eq!(id, 1);
    }
}
