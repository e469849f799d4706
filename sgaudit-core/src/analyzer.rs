//! Analyzer - Predicates over security group permissions
//!
//! Every function here is pure and total. Missing or malformed data never
//! fails; it resolves to `false`.

use crate::security_group::{IpPermission, SecurityGroup};

/// Port value meaning "all ICMP/ICMPv6 codes"
pub const ALL_ICMP_CODES: i64 = -1;

/// Highest TCP/UDP port
pub const MAX_PORT: i64 = 65535;

/// IPv4 CIDR matching every address
pub const ANY_IPV4: &str = "0.0.0.0/0";

/// IPv6 CIDR matching every address
pub const ANY_IPV6: &str = "::/0";

/// Returns true if the permission's port range covers all ports.
///
/// ```
/// use sgaudit_core::analyzer::opens_all_ports;
/// use sgaudit_core::IpPermission;
///
/// assert!(opens_all_ports(&IpPermission::ports(1, 65535)));
/// assert!(opens_all_ports(&IpPermission::ports(20, -1)));
/// assert!(!opens_all_ports(&IpPermission::ports(22, 22)));
/// ```
pub fn opens_all_ports(permission: &IpPermission) -> bool {
    let (Some(from_port), Some(to_port)) = (permission.from_port, permission.to_port) else {
        return false;
    };

    if from_port == ALL_ICMP_CODES || to_port == ALL_ICMP_CODES {
        return true;
    }

    from_port <= 1 && to_port >= MAX_PORT
}

/// Returns true if any IPv4 or IPv6 range of the permission is the
/// any-address CIDR. Exact string match only, no containment math.
pub fn cidr_allows_all_ips(permission: &IpPermission) -> bool {
    let any_ipv4 = permission
        .ip_ranges
        .iter()
        .flatten()
        .any(|range| range.cidr_ip.as_deref() == Some(ANY_IPV4));

    any_ipv4
        || permission
            .ipv6_ranges
            .iter()
            .flatten()
            .any(|range| range.cidr_ipv6.as_deref() == Some(ANY_IPV6))
}

/// Returns true if the permission grants access to the group with `group_id`
pub fn grants_access_to_group(permission: &IpPermission, group_id: &str) -> bool {
    permission
        .user_id_group_pairs
        .iter()
        .flatten()
        .any(|pair| pair.group_id.as_deref() == Some(group_id))
}

/// Indexes of the group's permissions matching `predicate`.
/// A group without `IpPermissions` has none.
fn matching_permissions(
    group: &SecurityGroup,
    predicate: impl Fn(&IpPermission) -> bool,
) -> Vec<usize> {
    group
        .ip_permissions
        .iter()
        .flatten()
        .enumerate()
        .filter(|(_, permission)| predicate(*permission))
        .map(|(index, _)| index)
        .collect()
}

/// Indexes of permissions opening all ports
pub fn all_ports_permissions(group: &SecurityGroup) -> Vec<usize> {
    matching_permissions(group, opens_all_ports)
}

/// Indexes of permissions opening all ports to the group itself.
/// Empty when the group has no `GroupId`.
pub fn self_referencing_permissions(group: &SecurityGroup) -> Vec<usize> {
    let Some(group_id) = group.group_id.as_deref() else {
        return Vec::new();
    };
    matching_permissions(group, |permission| {
        opens_all_ports(permission) && grants_access_to_group(permission, group_id)
    })
}

/// Indexes of permissions opening all ports to every address
pub fn publicly_open_permissions(group: &SecurityGroup) -> Vec<usize> {
    matching_permissions(group, |permission| {
        opens_all_ports(permission) && cidr_allows_all_ips(permission)
    })
}

/// Returns true if any permission of the group opens all ports
pub fn security_group_opens_all_ports(group: &SecurityGroup) -> bool {
    group
        .ip_permissions
        .iter()
        .flatten()
        .any(opens_all_ports)
}

/// Returns true if the group grants itself inbound access on all ports
pub fn security_group_opens_all_ports_to_self(group: &SecurityGroup) -> bool {
    let Some(group_id) = group.group_id.as_deref() else {
        return false;
    };
    group
        .ip_permissions
        .iter()
        .flatten()
        .any(|permission| {
            opens_all_ports(permission) && grants_access_to_group(permission, group_id)
        })
}

/// Returns true if the group allows every address inbound access on all ports
///
/// ```
/// use sgaudit_core::analyzer::security_group_opens_all_ports_to_all;
/// use sgaudit_core::{IpPermission, SecurityGroup};
///
/// let group = SecurityGroup::new("sg-1")
///     .with_permission(IpPermission::ports(-1, 65535).with_cidr_ip("0.0.0.0/0"));
/// assert!(security_group_opens_all_ports_to_all(&group));
/// ```
pub fn security_group_opens_all_ports_to_all(group: &SecurityGroup) -> bool {
    group
        .ip_permissions
        .iter()
        .flatten()
        .any(|permission| opens_all_ports(permission) && cidr_allows_all_ips(permission))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn permission(value: serde_json::Value) -> IpPermission {
        IpPermission::from(value)
    }

    fn group(value: serde_json::Value) -> SecurityGroup {
        SecurityGroup::from(value)
    }

    #[test]
    fn opens_all_ports_full_range() {
        assert!(opens_all_ports(&permission(json!({"FromPort": 1, "ToPort": 65535}))));
        assert!(opens_all_ports(&permission(json!({"FromPort": 0, "ToPort": 65535}))));
    }

    #[test]
    fn opens_all_ports_tolerates_out_of_range_upper_bound() {
        assert!(opens_all_ports(&permission(json!({"FromPort": 1, "ToPort": 965535}))));
        assert!(security_group_opens_all_ports_to_all(&group(json!({
            "IpPermissions": [{
                "FromPort": 0,
                "ToPort": 18446744073709551615u64,
                "IpRanges": [{"CidrIp": "0.0.0.0/0"}]
            }]
        }))));
    }

    #[test]
    fn opens_all_ports_integral_float_bounds() {
        assert!(opens_all_ports(&permission(json!({"FromPort": -1.0, "ToPort": 65535.0}))));
        assert!(opens_all_ports(&permission(json!({"FromPort": 1.0, "ToPort": 65535.0}))));
        assert!(!opens_all_ports(&permission(json!({"FromPort": 22.0, "ToPort": 22.0}))));
    }

    #[test]
    fn opens_all_ports_icmp_sentinel_on_either_bound() {
        assert!(opens_all_ports(&permission(json!({"FromPort": -1, "ToPort": 20}))));
        assert!(opens_all_ports(&permission(json!({"FromPort": 20, "ToPort": -1}))));
        assert!(opens_all_ports(&permission(json!({"FromPort": 443, "ToPort": -1}))));
    }

    #[test]
    fn opens_all_ports_requires_both_bounds() {
        assert!(!opens_all_ports(&permission(json!({"ToPort": -1}))));
        assert!(!opens_all_ports(&permission(json!({"FromPort": -1}))));
        assert!(!opens_all_ports(&permission(json!({}))));
    }

    #[test]
    fn opens_all_ports_narrow_ranges() {
        assert!(!opens_all_ports(&permission(json!({"FromPort": 22, "ToPort": 22}))));
        assert!(!opens_all_ports(&permission(json!({"FromPort": 2, "ToPort": 65535}))));
        assert!(!opens_all_ports(&permission(json!({"FromPort": 1, "ToPort": 65534}))));
    }

    #[test]
    fn cidr_allows_all_ips_matches_any_address() {
        assert!(cidr_allows_all_ips(&permission(
            json!({"IpRanges": [{"CidrIp": "0.0.0.0/0"}]})
        )));
        assert!(cidr_allows_all_ips(&permission(
            json!({"Ipv6Ranges": [{"CidrIpv6": "::/0"}]})
        )));
        assert!(cidr_allows_all_ips(&permission(json!({
            "IpRanges": [{"CidrIp": "10.0.0.0/8"}, {"CidrIp": "0.0.0.0/0"}]
        }))));
    }

    #[test]
    fn cidr_allows_all_ips_rejects_narrower_ranges() {
        assert!(!cidr_allows_all_ips(&permission(
            json!({"IpRanges": [{"CidrIp": "192.0.1.1/8"}]})
        )));
        assert!(!cidr_allows_all_ips(&permission(
            json!({"Ipv6Ranges": [{"CidrIpv6": "192.0.1.1/8"}]})
        )));
        assert!(!cidr_allows_all_ips(&permission(json!({}))));
    }

    #[test]
    fn cidr_allows_all_ips_is_exact_string_match() {
        // Equivalent notations are not recognised
        assert!(!cidr_allows_all_ips(&permission(
            json!({"IpRanges": [{"CidrIp": "0.0.0.0/00"}]})
        )));
        assert!(!cidr_allows_all_ips(&permission(
            json!({"Ipv6Ranges": [{"CidrIpv6": "0::/0"}]})
        )));
        // Families are not crossed
        assert!(!cidr_allows_all_ips(&permission(
            json!({"IpRanges": [{"CidrIp": "::/0"}]})
        )));
    }

    #[test]
    fn grants_access_to_group_by_id() {
        let p = permission(json!({"UserIdGroupPairs": [{"GroupId": "test-sgid"}]}));
        assert!(grants_access_to_group(&p, "test-sgid"));
        assert!(!grants_access_to_group(&p, "not-test-sgid"));
        assert!(!grants_access_to_group(&permission(json!({})), "test-sgid"));
    }

    #[test]
    fn security_group_opens_all_ports_any_permission() {
        assert!(security_group_opens_all_ports(&group(json!({
            "IpPermissions": [{}, {"FromPort": -1, "ToPort": 65536}]
        }))));
        assert!(!security_group_opens_all_ports(&group(json!({}))));
        assert!(!security_group_opens_all_ports(&group(json!({
            "IpPermissions": [{"FromPort": 80, "ToPort": 80}]
        }))));
    }

    #[test]
    fn security_group_opens_all_ports_to_self_cases() {
        assert!(security_group_opens_all_ports_to_self(&group(json!({
            "GroupId": "test-sgid",
            "IpPermissions": [
                {"FromPort": 1, "ToPort": 65535, "UserIdGroupPairs": [{"GroupId": "test-sgid"}]}
            ]
        }))));
        assert!(!security_group_opens_all_ports_to_self(&group(json!({
            "GroupId": "test-sgid",
            "IpPermissions": [{"UserIdGroupPairs": [{"GroupId": "test-sgid"}]}]
        }))));
        assert!(!security_group_opens_all_ports_to_self(&group(json!({
            "GroupId": "test-sgid",
            "IpPermissions": [{"FromPort": 1, "ToPort": 65535, "UserIdGroupPairs": []}]
        }))));
        assert!(!security_group_opens_all_ports_to_self(&group(json!({"GroupId": "test-sgid"}))));
        assert!(!security_group_opens_all_ports_to_self(&group(json!({
            "IpPermissions": [
                {"FromPort": 1, "ToPort": 65535, "UserIdGroupPairs": [{"GroupId": "test-sgid"}]}
            ]
        }))));
        assert!(!security_group_opens_all_ports_to_self(&group(json!({}))));
        assert!(!security_group_opens_all_ports_to_self(&group(json!([]))));
    }

    #[test]
    fn security_group_opens_all_ports_to_self_other_group() {
        assert!(!security_group_opens_all_ports_to_self(&group(json!({
            "GroupId": "sg-a",
            "IpPermissions": [
                {"FromPort": -1, "ToPort": -1, "UserIdGroupPairs": [{"GroupId": "sg-b"}]}
            ]
        }))));
    }

    #[test]
    fn security_group_opens_all_ports_to_all_cases() {
        assert!(security_group_opens_all_ports_to_all(&group(json!({
            "IpPermissions": [
                {"FromPort": -1, "ToPort": 65535, "IpRanges": [{"CidrIp": "0.0.0.0/0"}]}
            ]
        }))));
        assert!(security_group_opens_all_ports_to_all(&group(json!({
            "IpPermissions": [
                {"FromPort": 1, "ToPort": 65535, "Ipv6Ranges": [{"CidrIpv6": "::/0"}]}
            ]
        }))));
        assert!(!security_group_opens_all_ports_to_all(&group(json!({"IpPermissions": []}))));
        assert!(!security_group_opens_all_ports_to_all(&group(json!({}))));
        assert!(!security_group_opens_all_ports_to_all(&group(json!([]))));
    }

    #[test]
    fn security_group_opens_all_ports_to_all_needs_both_conditions_on_one_rule() {
        // Public narrow rule plus private all-ports rule is not flagged
        assert!(!security_group_opens_all_ports_to_all(&group(json!({
            "IpPermissions": [
                {"FromPort": 443, "ToPort": 443, "IpRanges": [{"CidrIp": "0.0.0.0/0"}]},
                {"FromPort": 1, "ToPort": 65535, "IpRanges": [{"CidrIp": "10.0.0.0/8"}]}
            ]
        }))));
    }

    #[test]
    fn permission_indexes_agree_with_predicates() {
        let g = group(json!({
            "GroupId": "sg-1",
            "IpPermissions": [
                {"FromPort": 22, "ToPort": 22, "IpRanges": [{"CidrIp": "0.0.0.0/0"}]},
                {"FromPort": -1, "ToPort": -1, "IpRanges": [{"CidrIp": "0.0.0.0/0"}]},
                {"FromPort": 0, "ToPort": 65535, "UserIdGroupPairs": [{"GroupId": "sg-1"}]}
            ]
        }));

        assert_eq!(all_ports_permissions(&g), vec![1, 2]);
        assert_eq!(publicly_open_permissions(&g), vec![1]);
        assert_eq!(self_referencing_permissions(&g), vec![2]);
        assert!(security_group_opens_all_ports(&g));
        assert!(security_group_opens_all_ports_to_all(&g));
        assert!(security_group_opens_all_ports_to_self(&g));
    }

    #[test]
    fn predicates_are_idempotent() {
        let g = group(json!({
            "GroupId": "sg-1",
            "IpPermissions": [{"FromPort": 1, "ToPort": 65535, "IpRanges": [{"CidrIp": "0.0.0.0/0"}]}]
        }));
        for _ in 0..2 {
            assert!(security_group_opens_all_ports(&g));
            assert!(security_group_opens_all_ports_to_all(&g));
            assert!(!security_group_opens_all_ports_to_self(&g));
        }
    }
}
