// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The declarative launch specification and the provider-call parameters
//! derived from it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything the caller declares about the instance to launch.
///
/// Immutable once handed to [`crate::Provisioner::provision`].
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct LaunchSpec {
    /// Provider region to launch into.
    pub region: String,
    pub availability_zone: Option<String>,
    pub instance_type: String,
    pub image_id: String,
    pub key_name: Option<String>,
    pub private_ip_address: Option<String>,
    /// Ordered set of security-group identifiers: names when launching into
    /// the classic network, group ids when a subnet is configured.
    pub security_groups: Vec<String>,
    pub subnet_id: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub user_data: Option<String>,
    pub block_device_mappings: Vec<BlockDeviceMapping>,
    /// Allocate via a price bid rather than on-demand.
    pub spot: bool,
    /// Maximum bid, in the provider's price-string form. `None` defers to
    /// the provider's default cap.
    pub spot_max_price: Option<String>,
    pub spot_valid_until: Option<DateTime<Utc>>,
    pub monitoring: bool,
    /// Budget for the instance-ready wait, in seconds.
    pub instance_ready_timeout: u64,
}

impl Default for LaunchSpec {
    fn default() -> LaunchSpec {
        LaunchSpec {
            region: String::new(),
            availability_zone: None,
            instance_type: String::new(),
            image_id: String::new(),
            key_name: None,
            private_ip_address: None,
            security_groups: Vec::new(),
            subnet_id: None,
            tags: BTreeMap::new(),
            user_data: None,
            block_device_mappings: Vec::new(),
            spot: false,
            spot_max_price: None,
            spot_valid_until: None,
            monitoring: false,
            instance_ready_timeout: 120,
        }
    }
}

impl LaunchSpec {
    /// Derive the parameters for an on-demand create call.
    ///
    /// A total function: no side effects and no failure modes. Fields the
    /// spec leaves unset are omitted from the serialized form entirely
    /// rather than sent as nulls.
    pub fn launch_options(&self) -> LaunchOptions {
        LaunchOptions {
            image_id: self.image_id.clone(),
            instance_type: self.instance_type.clone(),
            availability_zone: self.availability_zone.clone(),
            key_name: self.key_name.clone(),
            private_ip_address: self.private_ip_address.clone(),
            security_groups: self.security_group_placement(),
            tags: self.tags.clone(),
            user_data: self.user_data.clone(),
            block_device_mappings: self.block_device_mappings.clone(),
            monitoring: self.monitoring,
        }
    }

    /// Derive the parameters for a spot-bid submission. The security-group
    /// placement rule is identical to [`LaunchSpec::launch_options`].
    pub fn spot_options(&self) -> SpotOptions {
        SpotOptions {
            availability_zone: self.availability_zone.clone(),
            key_name: self.key_name.clone(),
            security_groups: self.security_group_placement(),
            user_data: self.user_data.clone(),
            valid_until: self.spot_valid_until,
            monitoring: self.monitoring,
        }
    }

    fn security_group_placement(&self) -> SecurityGroups {
        match &self.subnet_id {
            Some(subnet_id) => SecurityGroups::BySubnet {
                subnet_id: subnet_id.clone(),
                security_group_ids: self.security_groups.clone(),
            },
            None => SecurityGroups::ByName {
                security_groups: self.security_groups.clone(),
            },
        }
    }
}

/// Security-group placement for a provider call.
///
/// The two addressing modes are mutually exclusive by construction: a launch
/// into a subnet carries group *ids* under the subnet-scoped key, a classic
/// launch carries group *names* under the named-group key.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SecurityGroups {
    ByName {
        #[serde(skip_serializing_if = "Vec::is_empty")]
        security_groups: Vec<String>,
    },
    BySubnet {
        subnet_id: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        security_group_ids: Vec<String>,
    },
}

/// Parameters actually sent to the provider's create-instance call.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LaunchOptions {
    pub image_id: String,
    pub instance_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_ip_address: Option<String>,
    #[serde(flatten)]
    pub security_groups: SecurityGroups,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub block_device_mappings: Vec<BlockDeviceMapping>,
    pub monitoring: bool,
}

/// Parameters sent alongside a spot-bid submission. The image, instance
/// type, and bid price travel as direct arguments of
/// [`crate::CloudComputeClient::request_spot_instances`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SpotOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,
    #[serde(flatten)]
    pub security_groups: SecurityGroups,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<DateTime<Utc>>,
    pub monitoring: bool,
}

/// One entry of the block-device mapping sent to the provider.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct BlockDeviceMapping {
    pub device_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_on_termination: Option<bool>,
}
