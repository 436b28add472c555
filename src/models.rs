//! Network API models.

use serde::{Deserialize, Serialize};

/// DNS settings of a public IP address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIpAddressDnsSettings {
    /// Label concatenated with the regional DNS zone to form the FQDN.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_name_label: Option<String>,
    /// Reuse policy for the label's hashed form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_name_label_scope: Option<PublicIpAddressDnsSettingsDomainNameLabelScope>,
    /// Fully qualified domain name of the A record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    /// Domain name that resolves back to this address in reverse DNS.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse_fqdn: Option<String>,
}

/// Scope in which a domain name label may be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PublicIpAddressDnsSettingsDomainNameLabelScope {
    /// The label is never reused.
    NoReuse,
    /// Reusable within the same resource group.
    ResourceGroupReuse,
    /// Reusable within the same subscription.
    SubscriptionReuse,
    /// Reusable within the same tenant.
    TenantReuse,
}
