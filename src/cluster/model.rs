//! Typed cluster topology payloads.
//!
//! Optional fields are omitted on serialization rather than written as
//! `null`: the cluster API treats an absent field as "leave unchanged" and a
//! `null` as an explicit value.

use serde::{Deserialize, Serialize};

/// Hardware specification for one node group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSpecs {
    /// Compute/memory tier (for example `M30`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_size: Option<String>,
    /// Number of nodes of this kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_count: Option<u32>,
    /// Provisioned disk IOPS.
    #[serde(rename = "diskIOPS", default, skip_serializing_if = "Option::is_none")]
    pub disk_iops: Option<u64>,
    /// Block storage volume type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ebs_volume_type: Option<String>,
    /// Disk size in gigabytes.
    #[serde(rename = "diskSizeGB", default, skip_serializing_if = "Option::is_none")]
    pub disk_size_gb: Option<f64>,
}

impl InstanceSpecs {
    /// Copies these specs with `instance_size` replaced by `target`.
    ///
    /// Every other field is carried over as-is, absent fields stay absent.
    #[must_use]
    pub fn resized(&self, target: &str) -> Self {
        Self {
            instance_size: Some(target.to_string()),
            ..self.clone()
        }
    }
}

/// Placement and sizing of a cluster in one cloud region.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionConfig {
    /// Cloud provider (`AWS`, `GCP`, `AZURE`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,
    /// Provider region name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_name: Option<String>,
    /// Election priority of the region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    /// Electable (voting) nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub electable_specs: Option<InstanceSpecs>,
    /// Read-only nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only_specs: Option<InstanceSpecs>,
    /// Analytics nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytics_specs: Option<InstanceSpecs>,
}

/// One shard/zone of the cluster topology.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicationSpec {
    /// Number of shards in this zone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_shards: Option<u32>,
    /// Zone name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_name: Option<String>,
    /// Regions serving this zone.
    #[serde(default)]
    pub region_configs: Vec<RegionConfig>,
}

/// The subset of a cluster description the resize workflow reads.
///
/// Returned by both `GET` and `PATCH` on the cluster resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDescription {
    /// Cluster name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Lifecycle state (`IDLE`, `UPDATING`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_name: Option<String>,
    /// Topology.
    #[serde(default)]
    pub replication_specs: Vec<ReplicationSpec>,
}

/// `PATCH` body that resizes a cluster while keeping its topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizeRequest {
    /// Full topology with every present spec kind resized.
    pub replication_specs: Vec<ReplicationSpec>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_instance_specs_with_only_node_count() {
        let specs: InstanceSpecs = serde_json::from_value(json!({"nodeCount": 3})).unwrap();
        let value = serde_json::to_value(specs.resized("M40")).unwrap();
        assert_eq!(value, json!({"instanceSize": "M40", "nodeCount": 3}));
    }

    #[test]
    fn test_instance_specs_keep_every_optional_field() {
        let specs: InstanceSpecs = serde_json::from_value(json!({
            "instanceSize": "M10",
            "nodeCount": 3,
            "diskIOPS": 3000,
            "ebsVolumeType": "STANDARD",
            "diskSizeGB": 40.0
        }))
        .unwrap();
        let value = serde_json::to_value(specs.resized("M50")).unwrap();
        assert_eq!(
            value,
            json!({
                "instanceSize": "M50",
                "nodeCount": 3,
                "diskIOPS": 3000,
                "ebsVolumeType": "STANDARD",
                "diskSizeGB": 40.0
            })
        );
    }

    #[test]
    fn test_cluster_description_ignores_unknown_fields() {
        let cluster: ClusterDescription = serde_json::from_value(json!({
            "name": "c0",
            "stateName": "IDLE",
            "clusterType": "REPLICASET",
            "replicationSpecs": [{
                "id": "abc",
                "numShards": 1,
                "zoneName": "Zone 1",
                "regionConfigs": [{
                    "providerName": "AWS",
                    "regionName": "US_EAST_1",
                    "priority": 7,
                    "autoScaling": {"compute": {"enabled": false}},
                    "electableSpecs": {"instanceSize": "M30", "nodeCount": 3}
                }]
            }]
        }))
        .unwrap();

        assert_eq!(cluster.state_name.as_deref(), Some("IDLE"));
        let region = &cluster.replication_specs[0].region_configs[0];
        assert_eq!(region.priority, Some(7));
        assert!(region.read_only_specs.is_none());
    }

    #[test]
    fn test_absent_spec_kinds_are_not_serialized_as_null() {
        let region = RegionConfig {
            provider_name: Some("GCP".to_string()),
            ..RegionConfig::default()
        };
        let value = serde_json::to_value(region).unwrap();
        assert_eq!(value, json!({"providerName": "GCP"}));
    }
}
