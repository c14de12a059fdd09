//! Template configuration validation
//!
//! [`check_prefix`] is pure and doubles as the cheap guard in front of every
//! inventory and teardown query. [`TemplateValidator`] adds the checks that need
//! the cloud (datacenter, image).

use crate::error::Result;
use crate::template::{DISK_TYPES, NETWORK_DOMAIN_TYPES, ResourceTemplate, keys};
use dimensionflow_cloud::{CloudClient, Condition, ConditionAccumulator, Details, Severity};
use regex::Regex;
use std::sync::LazyLock;

pub const MIN_BOOT_DISK_SIZE_GB: i64 = 10;
pub const MIN_DATA_DISK_SIZE_GB: i64 = 10;
pub const MAX_PREFIX_LENGTH: usize = 26;

pub const PREFIX_MISSING_MSG: &str = "Instance name prefix must be provided.";
pub const INVALID_PREFIX_LENGTH_MSG: &str =
    "Instance name prefix must be between 1 and 26 characters.";
pub const INVALID_PREFIX_MSG: &str = "Instance name prefix must follow this pattern: \
     The first character must be a lowercase letter, and all following characters must be a dash, \
     lowercase letter, or digit.";

/// Same as instance names in general, but a trailing dash is allowed since
/// `-<instance id>` is always appended.
static PREFIX_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][-a-z0-9]*$").expect("prefix pattern is valid"));

/// Validate an instance name prefix
pub fn check_prefix(prefix: Option<&str>) -> Vec<Condition> {
    tracing::debug!("Validating prefix {:?}", prefix);

    let message = match prefix {
        None | Some("") => Some(PREFIX_MISSING_MSG),
        Some(p) if p.chars().count() > MAX_PREFIX_LENGTH => Some(INVALID_PREFIX_LENGTH_MSG),
        Some(p) if !PREFIX_PATTERN.is_match(p) => Some(INVALID_PREFIX_MSG),
        Some(_) => None,
    };

    message
        .map(|message| Condition {
            severity: Severity::Error,
            key: Some(keys::INSTANCE_NAME_PREFIX.to_string()),
            message: message.to_string(),
        })
        .into_iter()
        .collect()
}

/// Checks that need no cloud access: prefix, enumerations and numeric fields
pub fn check_template(template: &ResourceTemplate) -> Details {
    let mut accumulator = ConditionAccumulator::new();

    for condition in check_prefix(template.instance_name_prefix.as_deref()) {
        accumulator.add_error(condition.key.as_deref(), condition.message);
    }

    if !NETWORK_DOMAIN_TYPES.contains(&template.network_domain_type.as_str()) {
        accumulator.add_error(
            Some(keys::TYPE),
            format!(
                "Invalid network domain type '{}'. Available options: {}",
                template.network_domain_type,
                NETWORK_DOMAIN_TYPES.join(", ")
            ),
        );
    }

    check_disk_type(&mut accumulator, keys::BOOT_DISK_TYPE, &template.boot_disk_type);
    check_disk_type(&mut accumulator, keys::DATA_DISK_TYPE, &template.data_disk_type);

    if template.boot_disk_size_gb < MIN_BOOT_DISK_SIZE_GB {
        accumulator.add_error(
            Some(keys::BOOT_DISK_SIZE_GB),
            format!(
                "Boot disk size must be at least '{}GB'. Current configuration: '{}GB'.",
                MIN_BOOT_DISK_SIZE_GB, template.boot_disk_size_gb
            ),
        );
    }

    if template.data_disk_count < 0 {
        accumulator.add_error(
            Some(keys::DATA_DISK_COUNT),
            format!(
                "Data disk count must be non-negative. Current configuration: '{}'.",
                template.data_disk_count
            ),
        );
    }

    if template.data_disk_size_gb < MIN_DATA_DISK_SIZE_GB {
        accumulator.add_error(
            Some(keys::DATA_DISK_SIZE_GB),
            format!(
                "Data disk size must be at least '{}GB'. Current configuration: '{}GB'.",
                MIN_DATA_DISK_SIZE_GB, template.data_disk_size_gb
            ),
        );
    }

    accumulator.into_details()
}

fn check_disk_type(accumulator: &mut ConditionAccumulator, key: &str, value: &str) {
    if !DISK_TYPES.contains(&value) {
        accumulator.add_error(
            Some(key),
            format!(
                "Invalid disk type '{}'. Available options: {}",
                value,
                DISK_TYPES.join(", ")
            ),
        );
    }
}

/// Full template validation including lookups against the cloud
pub struct TemplateValidator<'a, C: ?Sized> {
    client: &'a C,
}

impl<'a, C: CloudClient + ?Sized> TemplateValidator<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// Returns the accumulated conditions; only provider failures other than
    /// not-found are returned as errors.
    pub async fn validate(&self, template: &ResourceTemplate) -> Result<Details> {
        let mut accumulator = ConditionAccumulator::new();

        self.check_datacenter(template, &mut accumulator).await?;
        self.check_image(template, &mut accumulator).await?;
        accumulator.merge(check_template(template));

        Ok(accumulator.into_details())
    }

    async fn check_datacenter(
        &self,
        template: &ResourceTemplate,
        accumulator: &mut ConditionAccumulator,
    ) -> Result<()> {
        if template.datacenter.is_empty() {
            accumulator.add_error(Some(keys::DATACENTER), "Datacenter is mandatory");
            return Ok(());
        }

        tracing::info!("Querying datacenter '{}'", template.datacenter);
        match self.client.get_datacenter(&template.datacenter).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => {
                accumulator.add_error(
                    Some(keys::DATACENTER),
                    format!("Datacenter '{}' not found.", template.datacenter),
                );
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn check_image(
        &self,
        template: &ResourceTemplate,
        accumulator: &mut ConditionAccumulator,
    ) -> Result<()> {
        if template.image.is_empty() {
            accumulator.add_error(Some(keys::IMAGE), "Image name is mandatory");
            return Ok(());
        }

        tracing::info!("Querying image '{}'", template.image);
        match self.client.get_os_image(&template.image).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => {
                accumulator.add_error(
                    Some(keys::IMAGE),
                    format!("Image '{}' not found.", template.image),
                );
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
