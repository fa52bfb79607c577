pub mod appointment;
pub mod billing;
pub mod diagnosis;
pub mod enums;
pub mod filters;
pub mod lab;
pub mod patient;
pub mod pharmacy;
pub mod prescription;
pub mod referral;
pub mod staff;

pub use appointment::*;
pub use billing::*;
pub use diagnosis::*;
pub use lab::*;
pub use patient::*;
pub use pharmacy::*;
pub use prescription::*;
pub use referral::*;
pub use staff::*;
