use candle_core::{DType, Device, Tensor};
use image::imageops::FilterType;
use image::RgbImage;

use crate::error::ClassifyError;

pub const INPUT_SIZE: usize = 224;
pub const INPUT_SHAPE: [usize; 4] = [1, 3, INPUT_SIZE, INPUT_SIZE];

pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    Bgr,
    Rgb,
}

/// Interleaved 8-bit image, row-major (height, width, 3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    height: usize,
    width: usize,
    order: ChannelOrder,
    data: Vec<u8>,
}

impl Image {
    pub fn new(
        height: usize,
        width: usize,
        order: ChannelOrder,
        data: Vec<u8>,
    ) -> Result<Self, ClassifyError> {
        let len = height.checked_mul(width).and_then(|n| n.checked_mul(3));
        if height == 0 || width == 0 || len != Some(data.len()) {
            return Err(ClassifyError::ShapeMismatch {
                expected: vec![height, width, 3],
                actual: vec![data.len()],
            });
        }
        Ok(Self {
            height,
            width,
            order,
            data,
        })
    }

    /// Decodes any format the `image` crate understands. Decoded pixels are RGB.
    pub fn decode(bytes: &[u8]) -> image::ImageResult<Self> {
        let img = image::load_from_memory(bytes)?.to_rgb8();
        Ok(Self::from(img))
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn order(&self) -> ChannelOrder {
        self.order
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn to_rgb(&self) -> Image {
        match self.order {
            ChannelOrder::Rgb => self.clone(),
            ChannelOrder::Bgr => {
                let mut data = self.data.clone();
                for px in data.chunks_exact_mut(3) {
                    px.swap(0, 2);
                }
                Image {
                    order: ChannelOrder::Rgb,
                    data,
                    ..*self
                }
            }
        }
    }
}

impl From<RgbImage> for Image {
    fn from(img: RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Image {
            height: height as usize,
            width: width as usize,
            order: ChannelOrder::Rgb,
            data: img.into_raw(),
        }
    }
}

/// A tensor of shape (1, 3, 224, 224), f32, channel-first.
#[derive(Debug, Clone)]
pub struct ModelInput(Tensor);

impl ModelInput {
    pub fn new(tensor: Tensor) -> Result<Self, ClassifyError> {
        if tensor.dims() != INPUT_SHAPE {
            return Err(ClassifyError::ShapeMismatch {
                expected: INPUT_SHAPE.to_vec(),
                actual: tensor.dims().to_vec(),
            });
        }
        Ok(Self(tensor))
    }

    pub fn tensor(&self) -> &Tensor {
        &self.0
    }

    pub fn into_inner(self) -> Tensor {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Normalization {
    pub const IMAGENET: Normalization = Normalization {
        mean: IMAGENET_MEAN,
        std: IMAGENET_STD,
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preprocessor {
    normalization: Option<Normalization>,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::imagenet()
    }
}

impl Preprocessor {
    /// Scales to [0, 1] and applies the ImageNet mean/std.
    pub fn imagenet() -> Self {
        Self {
            normalization: Some(Normalization::IMAGENET),
        }
    }

    /// Keeps raw 0..=255 sample values.
    pub fn raw() -> Self {
        Self {
            normalization: None,
        }
    }

    pub fn with_normalization(normalization: Normalization) -> Self {
        Self {
            normalization: Some(normalization),
        }
    }

    pub fn preprocess(&self, image: &Image) -> anyhow::Result<ModelInput> {
        let rgb = image.to_rgb();
        let buf = RgbImage::from_raw(rgb.width as u32, rgb.height as u32, rgb.data)
            .ok_or_else(|| anyhow::anyhow!("image buffer does not match its dimensions"))?;
        let size = INPUT_SIZE as u32;
        let buf = if buf.dimensions() == (size, size) {
            buf
        } else {
            image::imageops::resize(&buf, size, size, FilterType::Triangle)
        };

        // (h, w, c) -> (c, w, h) -> (c, h, w) -> (1, c, h, w)
        let t = Tensor::from_vec(buf.into_raw(), (INPUT_SIZE, INPUT_SIZE, 3), &Device::Cpu)?
            .transpose(0, 2)?
            .transpose(1, 2)?
            .unsqueeze(0)?
            .to_dtype(DType::F32)?;

        let t = match &self.normalization {
            None => t,
            Some(n) => {
                let mean = Tensor::new(&n.mean, &Device::Cpu)?.reshape((1, 3, 1, 1))?;
                let std = Tensor::new(&n.std, &Device::Cpu)?.reshape((1, 3, 1, 1))?;
                t.affine(1. / 255., 0.)?
                    .broadcast_sub(&mean)?
                    .broadcast_div(&std)?
            }
        };
        Ok(ModelInput::new(t.contiguous()?)?)
    }
}
