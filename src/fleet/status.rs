use std::cmp::Ordering;

use crate::models::{Device, DeviceStatusInfo};

pub fn find_device_by_id<'a>(devices: &'a [Device], id: &str) -> Option<&'a Device> {
    devices.iter().find(|device| device.id == id)
}

/// Order status records by the name of their device. Records whose device
/// is unknown go last, keeping their relative order.
pub fn sort_status_by_device_name(statuses: &mut [DeviceStatusInfo], devices: &[Device]) {
    statuses.sort_by(|a, b| {
        let name_a = find_device_by_id(devices, &a.device.id).map(|d| d.name.as_str());
        let name_b = find_device_by_id(devices, &b.device.id).map(|d| d.name.as_str());
        match (name_a, name_b) {
            (Some(a), Some(b)) => a.cmp(b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
}

/// One display line for a device's status
pub fn describe_status(status: &DeviceStatusInfo, devices: &[Device]) -> String {
    let name = find_device_by_id(devices, &status.device.id)
        .map(|d| d.name.as_str())
        .unwrap_or(&status.device.id);

    format!(
        "{} | {:.0} km/h | driving: {} | communicating: {} | ({:.5}, {:.5})",
        name,
        status.speed,
        yes_no(status.is_driving),
        yes_no(status.is_device_communicating),
        status.latitude,
        status.longitude,
    )
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}
