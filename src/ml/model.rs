use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        loss::CrossEntropyLossConfig,
        pool::{MaxPool2d, MaxPool2dConfig},
        Linear, LinearConfig, Relu,
    },
    prelude::*,
    tensor::activation::softmax,
};

use crate::domain::digit::{IMAGE_HEIGHT, IMAGE_WIDTH};

const KERNEL_SIZE: usize = 3;
const POOL_SIZE: usize = 2;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct DigitCnnConfig {
    #[config(default = 10)]
    pub num_classes:   usize,
    #[config(default = 32)]
    pub conv_channels: usize,
    #[config(default = 128)]
    pub hidden_size:   usize,
}

impl DigitCnnConfig {
    /// Side length after a valid 3×3 convolution followed by 2×2 pooling.
    pub fn pooled_side(side: usize) -> usize {
        (side - KERNEL_SIZE + 1) / POOL_SIZE
    }

    /// Width of the flattened feature vector fed to the first dense layer.
    pub fn flattened_size(&self) -> usize {
        self.conv_channels * Self::pooled_side(IMAGE_HEIGHT) * Self::pooled_side(IMAGE_WIDTH)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> DigitCnn<B> {
        let conv    = Conv2dConfig::new([1, self.conv_channels], [KERNEL_SIZE, KERNEL_SIZE]).init(device);
        let pool    = MaxPool2dConfig::new([POOL_SIZE, POOL_SIZE])
            .with_strides([POOL_SIZE, POOL_SIZE])
            .init();
        let hidden  = LinearConfig::new(self.flattened_size(), self.hidden_size).init(device);
        let output  = LinearConfig::new(self.hidden_size, self.num_classes).init(device);
        DigitCnn { conv, pool, hidden, output, activation: Relu::new() }
    }
}

/// conv(3×3, ReLU) → maxpool(2×2) → flatten → dense(ReLU) → dense(classes)
#[derive(Module, Debug)]
pub struct DigitCnn<B: Backend> {
    pub conv:       Conv2d<B>,
    pub pool:       MaxPool2d,
    pub hidden:     Linear<B>,
    pub output:     Linear<B>,
    pub activation: Relu,
}

pub struct ClassifierOutput<B: Backend> {
    pub loss:    Tensor<B, 1>,
    pub logits:  Tensor<B, 2>,
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> ClassifierOutput<B> {
    /// Number of rows whose arg-max matches the target
    pub fn correct(&self) -> usize {
        let predicted = self.logits.clone().argmax(1).flatten::<1>(0, 1);
        predicted
            .equal(self.targets.clone())
            .int()
            .sum()
            .into_scalar()
            .elem::<i64>() as usize
    }
}

impl<B: Backend> DigitCnn<B> {
    /// images: [batch, 28, 28] → logits: [batch, num_classes]
    pub fn forward(&self, images: Tensor<B, 3>) -> Tensor<B, 2> {
        let [batch_size, height, width] = images.dims();

        let x = images.reshape([batch_size, 1, height, width]);
        let x = self.activation.forward(self.conv.forward(x)); // [batch, channels, 26, 26]
        let x = self.pool.forward(x);                          // [batch, channels, 13, 13]
        let x = x.flatten::<2>(1, 3);

        let x = self.activation.forward(self.hidden.forward(x));
        self.output.forward(x)
    }

    /// Softmax over classes; the loss works on raw logits instead.
    pub fn forward_probabilities(&self, images: Tensor<B, 3>) -> Tensor<B, 2> {
        softmax(self.forward(images), 1)
    }

    /// Sparse categorical cross-entropy against integer targets.
    pub fn forward_classification(
        &self,
        images:  Tensor<B, 3>,
        targets: Tensor<B, 1, Int>,
    ) -> ClassifierOutput<B> {
        let logits = self.forward(images);
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), targets.clone());
        ClassifierOutput { loss, logits, targets }
    }
}
