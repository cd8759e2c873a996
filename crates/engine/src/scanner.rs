// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! USB printer discovery.
//!
//! Subscribes to the OS's USB interface-device event stream (delivery
//! mechanism is a collaborator; a channel of [`DeviceEvent`] suffices),
//! keeps printer-class interfaces only, parses the IEEE-1284 Device ID and
//! derives a `usb://` URI and a human description for each device.

use pd_core::{Event, MethodError};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::collections::HashMap;
use tokio::sync::mpsc;

/// Escape everything outside the URI unreserved set.
const URI_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// A raw uevent from the USB subsystem.
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    Add {
        sysfs_path: String,
        /// sysfs attributes of the interface device (`bInterfaceClass`,
        /// `bInterfaceSubClass`, `ieee1284_id`, ...).
        attrs: HashMap<String, String>,
    },
    Remove {
        sysfs_path: String,
    },
}

/// A discovered printer device; lives while the hardware is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub sysfs_path: String,
    pub ieee1284_id: String,
    pub manufacturer: String,
    pub model: String,
    pub serial: Option<String>,
    pub uri: String,
    pub description: String,
}

impl Device {
    /// Build a device record from an interface's IEEE-1284 Device ID.
    pub fn from_ieee1284(sysfs_path: &str, ieee1284_id: &str) -> Result<Device, MethodError> {
        let fields = parse_ieee1284_id(ieee1284_id);
        let manufacturer = fields
            .get("mfg")
            .map(|mfg| normalize_manufacturer(mfg).to_string())
            .ok_or_else(|| {
                MethodError::InvalidArgument("IEEE-1284 Device ID has no manufacturer".into())
            })?;
        let model = fields
            .get("mdl")
            .cloned()
            .ok_or_else(|| MethodError::InvalidArgument("IEEE-1284 Device ID has no model".into()))?;
        let serial = fields.get("sn").cloned();

        let mut uri = format!(
            "usb://{}/{}",
            utf8_percent_encode(&manufacturer, URI_ESCAPE),
            utf8_percent_encode(&model, URI_ESCAPE)
        );
        if let Some(serial) = &serial {
            uri.push_str("?serial=");
            uri.push_str(&utf8_percent_encode(serial, URI_ESCAPE).to_string());
        }
        let description = format!("{manufacturer} {model} (USB)");

        Ok(Device {
            sysfs_path: sysfs_path.to_string(),
            ieee1284_id: ieee1284_id.to_string(),
            manufacturer,
            model,
            serial,
            uri,
            description,
        })
    }
}

/// Parse an IEEE-1284 Device ID (`KEY:value;` pairs) into lowercase keys,
/// folding the long key spellings onto their short forms.
pub fn parse_ieee1284_id(id: &str) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    for part in id.split(';') {
        let Some((key, value)) = part.split_once(':') else {
            continue;
        };
        let key = match key.trim().to_ascii_lowercase().as_str() {
            "manufacturer" => "mfg".to_string(),
            "model" => "mdl".to_string(),
            "serialnumber" | "sern" => "sn".to_string(),
            "command set" => "cmd".to_string(),
            other => other.to_string(),
        };
        fields.insert(key, value.trim().to_string());
    }
    fields
}

fn normalize_manufacturer(mfg: &str) -> &str {
    if mfg.eq_ignore_ascii_case("hewlett-packard") {
        "HP"
    } else if mfg.eq_ignore_ascii_case("lexmark international") {
        "Lexmark"
    } else {
        mfg
    }
}

/// Printer interfaces are USB class 0x07, subclass 0x01.
fn is_printer_interface(attrs: &HashMap<String, String>) -> bool {
    let hex = |key: &str| {
        attrs
            .get(key)
            .and_then(|value| u8::from_str_radix(value.trim(), 16).ok())
    };
    hex("bInterfaceClass") == Some(0x07) && hex("bInterfaceSubClass") == Some(0x01)
}

/// Watches the uevent stream and reports printers to the control loop.
pub struct DeviceScanner {
    devices: HashMap<String, Device>,
    events: mpsc::Sender<Event>,
}

impl DeviceScanner {
    pub fn new(events: mpsc::Sender<Event>) -> Self {
        Self {
            devices: HashMap::new(),
            events,
        }
    }

    /// Consume uevents until the stream ends. The sender side replays
    /// already-present devices as `Add` events on startup (coldplug).
    pub async fn run(mut self, mut uevents: mpsc::Receiver<DeviceEvent>) {
        while let Some(event) = uevents.recv().await {
            self.handle_uevent(event).await;
        }
    }

    pub(crate) async fn handle_uevent(&mut self, event: DeviceEvent) {
        match event {
            DeviceEvent::Add { sysfs_path, attrs } => {
                if !is_printer_interface(&attrs) {
                    return;
                }
                let Some(ieee1284_id) = attrs.get("ieee1284_id") else {
                    tracing::warn!(
                        sysfs_path,
                        "failed to get IEEE-1284 Device ID (perhaps no usblp?)"
                    );
                    return;
                };
                let device = match Device::from_ieee1284(&sysfs_path, ieee1284_id) {
                    Ok(device) => device,
                    Err(error) => {
                        tracing::warn!(sysfs_path, %error, "failed to parse IEEE-1284 Device ID");
                        return;
                    }
                };
                tracing::debug!(uri = %device.uri, id = %device.ieee1284_id, "add device");
                let _ = self
                    .events
                    .send(Event::DeviceAdded {
                        sysfs_path: device.sysfs_path.clone(),
                        ieee1284_id: device.ieee1284_id.clone(),
                        uri: device.uri.clone(),
                        description: device.description.clone(),
                    })
                    .await;
                self.devices.insert(sysfs_path, device);
            }
            DeviceEvent::Remove { sysfs_path } => {
                if self.devices.remove(&sysfs_path).is_some() {
                    tracing::debug!(sysfs_path, "remove device");
                    let _ = self.events.send(Event::DeviceRemoved { sysfs_path }).await;
                }
            }
        }
    }

    /// Devices currently known, for inspection.
    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }
}

#[cfg(test)]
#[path = "scanner_tests.rs"]
mod tests;
