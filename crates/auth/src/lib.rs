//! `boimedicado-auth` — acting identity and farm-unit access rules.
//!
//! Authentication itself happens elsewhere; this crate only describes who is
//! acting, in which unit, and what their role lets them do.

pub mod authorize;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod unit;

pub use authorize::{AuthzError, authorize};
pub use permissions::Permission;
pub use principal::Actor;
pub use roles::Role;
pub use unit::FarmUnit;
