//! Compute device selection.
//!
//! The preferred device is resolved once when a pipeline is built. An
//! unavailable or unknown preference falls back to the CPU with a warning;
//! the pipeline never fails because of it.

use std::{fmt, path::Path, str::FromStr};

use tracing::warn;

use crate::error::TtsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Cuda(usize),
    Metal,
}

impl FromStr for Device {
    type Err = TtsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "cpu" => Ok(Device::Cpu),
            "cuda" | "gpu" => Ok(Device::Cuda(0)),
            "metal" | "mps" => Ok(Device::Metal),
            other => other
                .strip_prefix("cuda:")
                .and_then(|index| index.parse().ok())
                .map(Device::Cuda)
                .ok_or_else(|| TtsError::DeviceUnavailable(s.to_string())),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(index) => write!(f, "cuda:{index}"),
            Device::Metal => write!(f, "metal"),
        }
    }
}

/// Runtime capability check for a compute device.
pub trait DeviceProbe: Send + Sync {
    fn is_available(&self, device: Device) -> bool;
}

/// Probes the host: CUDA through the NVIDIA device nodes, Metal by platform.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl DeviceProbe for SystemProbe {
    fn is_available(&self, device: Device) -> bool {
        match device {
            Device::Cpu => true,
            Device::Cuda(index) => {
                cfg!(target_os = "linux")
                    && Path::new("/dev/nvidiactl").exists()
                    && Path::new(&format!("/dev/nvidia{index}")).exists()
            }
            Device::Metal => cfg!(target_os = "macos"),
        }
    }
}

/// Resolve a device preference, falling back to the CPU.
pub fn resolve_device(preference: &str, probe: &dyn DeviceProbe) -> Device {
    let unavailable = match preference.parse::<Device>() {
        Ok(device) if probe.is_available(device) => return device,
        Ok(device) => TtsError::DeviceUnavailable(device.to_string()),
        Err(e) => e,
    };
    warn!(error = %unavailable, "falling back to cpu");
    Device::Cpu
}
