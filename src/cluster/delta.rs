//! Target specification computed from the observed topology.

use super::error::ResizeError;
use super::model::{ClusterDescription, RegionConfig, ReplicationSpec, ResizeRequest};

/// Instance size of the first electable node group, for reporting only.
#[must_use]
pub fn current_instance_size(cluster: &ClusterDescription) -> Option<&str> {
    cluster
        .replication_specs
        .first()?
        .region_configs
        .first()?
        .electable_specs
        .as_ref()?
        .instance_size
        .as_deref()
}

/// Builds the `PATCH` body that moves every node group to `target_size`.
///
/// Shard counts, zones and regions are copied unchanged; only
/// `instanceSize` changes, on each spec kind the region already has.
///
/// # Errors
///
/// Returns [`ResizeError::NoTopologyFound`] when the cluster has no
/// replication specs, or a replication spec has no region configs.
pub fn build_resize_request(
    cluster_name: &str,
    cluster: &ClusterDescription,
    target_size: &str,
) -> Result<ResizeRequest, ResizeError> {
    if cluster.replication_specs.is_empty()
        || cluster
            .replication_specs
            .iter()
            .any(|spec| spec.region_configs.is_empty())
    {
        return Err(ResizeError::no_topology(cluster_name));
    }

    let replication_specs = cluster
        .replication_specs
        .iter()
        .map(|spec| ReplicationSpec {
            num_shards: spec.num_shards,
            zone_name: spec.zone_name.clone(),
            region_configs: spec
                .region_configs
                .iter()
                .map(|region| resize_region(region, target_size))
                .collect(),
        })
        .collect();

    Ok(ResizeRequest { replication_specs })
}

fn resize_region(region: &RegionConfig, target_size: &str) -> RegionConfig {
    RegionConfig {
        provider_name: region.provider_name.clone(),
        region_name: region.region_name.clone(),
        priority: region.priority,
        electable_specs: region
            .electable_specs
            .as_ref()
            .map(|specs| specs.resized(target_size)),
        read_only_specs: region
            .read_only_specs
            .as_ref()
            .map(|specs| specs.resized(target_size)),
        analytics_specs: region
            .analytics_specs
            .as_ref()
            .map(|specs| specs.resized(target_size)),
    }
}
