//! Security group - Data model mirroring the EC2 DescribeSecurityGroups shape
//!
//! Every field is optional. Values are built leniently from JSON: a value
//! that is not an object becomes the empty structure, and a field holding
//! the wrong JSON type is treated as absent. Serialization uses the cloud
//! API's PascalCase key names and omits absent fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One IPv4 range entry of an IP permission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", from = "Value")]
pub struct IpRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cidr_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One IPv6 range entry of an IP permission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", from = "Value")]
pub struct Ipv6Range {
    #[serde(rename = "CidrIpv6", skip_serializing_if = "Option::is_none")]
    pub cidr_ipv6: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A security group referenced as a traffic source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", from = "Value")]
pub struct UserIdGroupPair {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// One inbound rule of a security group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", from = "Value")]
pub struct IpPermission {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_ranges: Option<Vec<IpRange>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv6_ranges: Option<Vec<Ipv6Range>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id_group_pairs: Option<Vec<UserIdGroupPair>>,
}

impl IpPermission {
    /// Create a permission covering the given port range
    pub fn ports(from_port: i64, to_port: i64) -> Self {
        Self {
            from_port: Some(from_port),
            to_port: Some(to_port),
            ..Default::default()
        }
    }

    pub fn with_cidr_ip(mut self, cidr: impl Into<String>) -> Self {
        self.ip_ranges.get_or_insert_with(Vec::new).push(IpRange {
            cidr_ip: Some(cidr.into()),
            description: None,
        });
        self
    }

    pub fn with_cidr_ipv6(mut self, cidr: impl Into<String>) -> Self {
        self.ipv6_ranges.get_or_insert_with(Vec::new).push(Ipv6Range {
            cidr_ipv6: Some(cidr.into()),
            description: None,
        });
        self
    }

    pub fn with_group_pair(mut self, group_id: impl Into<String>) -> Self {
        self.user_id_group_pairs
            .get_or_insert_with(Vec::new)
            .push(UserIdGroupPair {
                group_id: Some(group_id.into()),
                user_id: None,
            });
        self
    }

    /// Human readable port range (e.g. "22", "1-65535", "all")
    pub fn port_range(&self) -> String {
        match (self.from_port, self.to_port) {
            (Some(-1), _) | (_, Some(-1)) => "all".to_string(),
            (Some(from), Some(to)) if from == to => from.to_string(),
            (Some(from), Some(to)) => format!("{}-{}", from, to),
            _ => "-".to_string(),
        }
    }
}

/// An EC2 security group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", from = "Value")]
pub struct SecurityGroup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_permissions: Option<Vec<IpPermission>>,
}

impl SecurityGroup {
    pub fn new(group_id: impl Into<String>) -> Self {
        Self {
            group_id: Some(group_id.into()),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.group_name = Some(name.into());
        self
    }

    pub fn with_permission(mut self, permission: IpPermission) -> Self {
        self.ip_permissions
            .get_or_insert_with(Vec::new)
            .push(permission);
        self
    }

    /// Display id "<GroupId> <GroupName>", with "-" for a missing part
    pub fn label(&self) -> String {
        format!(
            "{} {}",
            self.group_id.as_deref().unwrap_or("-"),
            self.group_name.as_deref().unwrap_or("-")
        )
    }
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Integer field. Values above `i64::MAX` saturate and integral floats
/// (e.g. `65535.0`) are accepted; fractional floats are absent.
fn int_field(map: &Map<String, Value>, key: &str) -> Option<i64> {
    let value = map.get(key)?;
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    if value.as_u64().is_some() {
        return Some(i64::MAX);
    }
    value
        .as_f64()
        .filter(|n| n.is_finite() && n.fract() == 0.0)
        .map(|n| n as i64)
}

fn list_field<T>(map: &Map<String, Value>, key: &str) -> Option<Vec<T>>
where
    T: for<'a> From<&'a Value>,
{
    map.get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().map(T::from).collect())
}

/// Implements lenient conversion from both `&Value` and `Value`
macro_rules! from_json_value {
    ($ty:ty, |$map:ident| $body:expr) => {
        impl From<&Value> for $ty {
            fn from(value: &Value) -> Self {
                match value.as_object() {
                    Some($map) => $body,
                    None => Self::default(),
                }
            }
        }

        impl From<Value> for $ty {
            fn from(value: Value) -> Self {
                Self::from(&value)
            }
        }
    };
}

from_json_value!(IpRange, |map| IpRange {
    cidr_ip: string_field(map, "CidrIp"),
    description: string_field(map, "Description"),
});

from_json_value!(Ipv6Range, |map| Ipv6Range {
    cidr_ipv6: string_field(map, "CidrIpv6"),
    description: string_field(map, "Description"),
});

from_json_value!(UserIdGroupPair, |map| UserIdGroupPair {
    group_id: string_field(map, "GroupId"),
    user_id: string_field(map, "UserId"),
});

from_json_value!(IpPermission, |map| IpPermission {
    ip_protocol: string_field(map, "IpProtocol"),
    from_port: int_field(map, "FromPort"),
    to_port: int_field(map, "ToPort"),
    ip_ranges: list_field(map, "IpRanges"),
    ipv6_ranges: list_field(map, "Ipv6Ranges"),
    user_id_group_pairs: list_field(map, "UserIdGroupPairs"),
});

from_json_value!(SecurityGroup, |map| SecurityGroup {
    group_id: string_field(map, "GroupId"),
    group_name: string_field(map, "GroupName"),
    vpc_id: string_field(map, "VpcId"),
    description: string_field(map, "Description"),
    ip_permissions: list_field(map, "IpPermissions"),
});
