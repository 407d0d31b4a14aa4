// Backend selection. NdArray (CPU) unless built with `--features wgpu`.

use burn::backend::Autodiff;

#[cfg(not(feature = "wgpu"))]
pub type InferBackend = burn::backend::NdArray;

#[cfg(feature = "wgpu")]
pub type InferBackend = burn::backend::Wgpu;

/// Backend used while training: gradients tracked on top of InferBackend
pub type TrainBackend = Autodiff<InferBackend>;

pub type InferDevice = <InferBackend as burn::tensor::backend::Backend>::Device;

pub fn default_device() -> InferDevice {
    InferDevice::default()
}
