//! Audit - Turn analyzer results into findings
//!
//! Each enabled check is run against every security group, producing one
//! Finding per offending permission. A Finding only means "flag for manual
//! review"; nothing is remediated here.

use serde::{Deserialize, Serialize};

use crate::analyzer;
use crate::config::AuditConfig;
use crate::security_group::SecurityGroup;

/// How urgently a finding should be reviewed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

/// A single audit check over a security group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Check {
    /// Some permission opens every port
    #[serde(rename = "all-ports")]
    OpensAllPorts,
    /// Some permission opens every port to the group itself
    #[serde(rename = "all-ports-to-self")]
    OpensAllPortsToSelf,
    /// Some permission opens every port to every address
    #[serde(rename = "all-ports-to-all")]
    OpensAllPortsToAll,
}

impl Check {
    pub const ALL: [Check; 3] = [
        Check::OpensAllPorts,
        Check::OpensAllPortsToSelf,
        Check::OpensAllPortsToAll,
    ];

    /// Stable name used in configuration files and on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Check::OpensAllPorts => "all-ports",
            Check::OpensAllPortsToSelf => "all-ports-to-self",
            Check::OpensAllPortsToAll => "all-ports-to-all",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Check::OpensAllPorts => "permission opens all ports",
            Check::OpensAllPortsToSelf => "permission opens all ports to the group itself",
            Check::OpensAllPortsToAll => "permission opens all ports to all IPv4/IPv6 addresses",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Check::OpensAllPorts => Severity::Low,
            Check::OpensAllPortsToSelf => Severity::Medium,
            Check::OpensAllPortsToAll => Severity::High,
        }
    }

    /// Indexes of the group's permissions failing this check
    pub fn offending_permissions(&self, group: &SecurityGroup) -> Vec<usize> {
        match self {
            Check::OpensAllPorts => analyzer::all_ports_permissions(group),
            Check::OpensAllPortsToSelf => analyzer::self_referencing_permissions(group),
            Check::OpensAllPortsToAll => analyzer::publicly_open_permissions(group),
        }
    }
}

impl std::fmt::Display for Check {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Check {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Check::ALL
            .into_iter()
            .find(|check| check.name() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Check::ALL.iter().map(Check::name).collect();
                format!("Unknown check '{}'. Must be one of: {}", s, names.join(", "))
            })
    }
}

/// One permission of one group failing one check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub group_id: Option<String>,
    pub group_name: Option<String>,
    pub check: Check,
    pub severity: Severity,
    /// Position of the offending rule in `IpPermissions`
    pub permission_index: usize,
    /// Port range of the offending rule, for display
    pub port_range: String,
}

/// Run every enabled check against one security group
pub fn audit_security_group(group: &SecurityGroup, config: &AuditConfig) -> Vec<Finding> {
    if let Some(group_id) = group.group_id.as_deref()
        && config.is_ignored(group_id)
    {
        log::debug!("Skipping ignored security group {}", group_id);
        return Vec::new();
    }

    let mut findings = Vec::new();
    for check in Check::ALL.into_iter().filter(|c| config.is_enabled(*c)) {
        for index in check.offending_permissions(group) {
            log::debug!(
                "{}: permission #{} fails {}",
                group.label(),
                index,
                check.name()
            );
            let port_range = group
                .ip_permissions
                .as_ref()
                .and_then(|permissions| permissions.get(index))
                .map(|permission| permission.port_range())
                .unwrap_or_default();
            findings.push(Finding {
                group_id: group.group_id.clone(),
                group_name: group.group_name.clone(),
                check,
                severity: check.severity(),
                permission_index: index,
                port_range,
            });
        }
    }
    findings
}

/// Audit all groups in order
pub fn audit(groups: &[SecurityGroup], config: &AuditConfig) -> AuditReport {
    let mut report = AuditReport::default();
    for group in groups {
        report.findings.extend(audit_security_group(group, config));
        report.groups_audited += 1;
    }
    log::info!(
        "Audited {} security groups, {} findings",
        report.groups_audited,
        report.findings.len()
    );
    report
}

/// Findings of an audit run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub groups_audited: usize,
    pub findings: Vec<Finding>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    /// Returns true if any finding is at least as severe as `threshold`
    pub fn has_severity_at_least(&self, threshold: Severity) -> bool {
        self.findings.iter().any(|f| f.severity >= threshold)
    }

    /// Distinct group ids with at least one finding, in first-seen order
    pub fn flagged_groups(&self) -> Vec<&str> {
        let mut groups: Vec<&str> = Vec::new();
        for finding in &self.findings {
            if let Some(id) = finding.group_id.as_deref()
                && !groups.contains(&id)
            {
                groups.push(id);
            }
        }
        groups
    }

    pub fn summary(&self) -> AuditSummary {
        let mut summary = AuditSummary {
            groups: self.groups_audited,
            ..Default::default()
        };
        for finding in &self.findings {
            match finding.severity {
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Default)]
pub struct AuditSummary {
    pub groups: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl std::fmt::Display for AuditSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Audit: {} {}, {} high, {} medium, {} low",
            self.groups,
            if self.groups == 1 { "group" } else { "groups" },
            self.high,
            self.medium,
            self.low
        )
    }
}
