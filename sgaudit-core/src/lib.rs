//! sgaudit Core
//!
//! Core library for auditing cloud security group descriptions for
//! permissions that open every port, either to the whole internet or to
//! the group itself.

pub mod analyzer;
pub mod audit;
pub mod config;
pub mod inventory;
pub mod security_group;

pub use audit::{AuditReport, Check, Finding, Severity, audit, audit_security_group};
pub use config::{AuditConfig, ConfigError};
pub use inventory::{InventoryError, load_inventory, parse_inventory};
pub use security_group::{IpPermission, IpRange, Ipv6Range, SecurityGroup, UserIdGroupPair};
