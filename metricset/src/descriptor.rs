//! Metric descriptor validation.
//!
//! Rules are checked in a fixed order: name, type, label keys. Fail-fast
//! [`validate`] reports the first violation in that order, [`violations`]
//! reports all of them.

use std::collections::HashMap;

use error::{CodecError, DescriptorError};

use crate::model::{MetricDescriptor, MetricType};
use crate::policy::{ValidationPolicy, Violations};
use crate::proto;

pub fn validate(
    descriptor: &MetricDescriptor,
    policy: &ValidationPolicy,
) -> Result<(), DescriptorError> {
    let mut v = Violations::fail_fast();
    walk(descriptor, policy, &mut v);
    v.into_result()
}

pub fn violations(
    descriptor: &MetricDescriptor,
    policy: &ValidationPolicy,
) -> Vec<DescriptorError> {
    let mut v = Violations::collect_all();
    walk(descriptor, policy, &mut v);
    v.into_vec()
}

fn walk(
    descriptor: &MetricDescriptor,
    policy: &ValidationPolicy,
    v: &mut Violations<DescriptorError>,
) {
    if descriptor.name.is_empty() && v.record(DescriptorError::EmptyName) {
        return;
    }

    if descriptor.metric_type == MetricType::Unspecified
        && v.record(DescriptorError::UnspecifiedType)
    {
        return;
    }

    if !policy.unique_label_keys {
        return;
    }

    let mut seen: HashMap<&str, usize> = HashMap::with_capacity(descriptor.label_keys.len());
    for (idx, key) in descriptor.label_keys.iter().enumerate() {
        if let Some(&first) = seen.get(key.as_str()) {
            let err = DescriptorError::DuplicateLabelKey {
                key: key.clone(),
                first,
                duplicate: idx,
            };
            if v.record(err) {
                return;
            }
        } else {
            seen.insert(key, idx);
        }
    }
}

pub(crate) fn to_proto(descriptor: &MetricDescriptor) -> proto::MetricDescriptor {
    proto::MetricDescriptor {
        name: descriptor.name.clone(),
        description: descriptor.description.clone(),
        unit: descriptor.unit.clone(),
        r#type: descriptor.metric_type.into(),
        label_keys: descriptor.label_keys.clone(),
    }
}

pub(crate) fn from_proto(msg: proto::MetricDescriptor) -> Result<MetricDescriptor, CodecError> {
    let metric_type =
        MetricType::try_from(msg.r#type).map_err(|_| CodecError::UnknownMetricType(msg.r#type))?;

    Ok(MetricDescriptor {
        name: msg.name,
        description: msg.description,
        unit: msg.unit,
        metric_type,
        label_keys: msg.label_keys,
    })
}
