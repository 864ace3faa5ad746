use image::RgbImage;
use ndarray::{ArrayView3, ShapeError};

/// A single decoded video frame: contiguous RGB bytes in row-major order.
///
/// Format conversion happens at I/O boundaries only; detection and
/// rendering work on this tightly packed buffer.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    /// Wraps an RGB image as the frame at position `index`.
    pub fn from_rgb_image(image: RgbImage, index: usize) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height, 3, index)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Copies the pixels into an `image` buffer for drawing.
    ///
    /// Returns `None` for frames that are not 3-channel RGB.
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        if self.channels != 3 {
            return None;
        }
        RgbImage::from_raw(self.width, self.height, self.data.clone())
    }

    /// `[height, width, channels]` view of the pixels.
    ///
    /// Fails when the buffer does not match the frame dimensions.
    pub fn as_ndarray(&self) -> Result<ArrayView3<'_, u8>, ShapeError> {
        ArrayView3::from_shape(self.shape(), &self.data)
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
