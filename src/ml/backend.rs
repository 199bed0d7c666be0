// ============================================================
// Layer 5 — Backend Selection
// ============================================================
// Training runs on Autodiff<inner>; validation and prediction
// run on the inner backend directly.
//
//   wgpu     GPU through WebGPU (default)
//   ndarray  CPU, no GPU required

use burn::backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, Autodiff, NdArray, Wgpu};
use serde::{Deserialize, Serialize};

pub type GpuBackend = Wgpu;
pub type CpuBackend = NdArray<f32>;
pub type GpuTrainBackend = Autodiff<GpuBackend>;
pub type CpuTrainBackend = Autodiff<CpuBackend>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    #[default]
    Wgpu,
    Ndarray,
}

impl BackendKind {
    pub fn gpu_device() -> WgpuDevice {
        WgpuDevice::default()
    }

    pub fn cpu_device() -> NdArrayDevice {
        NdArrayDevice::Cpu
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Wgpu => write!(f, "wgpu"),
            BackendKind::Ndarray => write!(f, "ndarray"),
        }
    }
}
