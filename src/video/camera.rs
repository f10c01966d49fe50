use anyhow::{ensure, Context, Result};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use nokhwa::Camera;
use tracing::info;

/// One decoded video frame, RGB24 packed rows.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Source of video frames for a recording session.
///
/// `read_frame` blocks until the device delivers the next frame. A failed
/// read is not fatal to a session; the caller records it as a skipped frame.
pub trait VideoSource: Send {
    fn read_frame(&mut self) -> Result<VideoFrame>;
}

/// Camera capture via nokhwa.
pub struct CameraSource {
    camera: Camera,
    width: u32,
    height: u32,
}

impl CameraSource {
    /// Open a capture device at a fixed resolution.
    ///
    /// Requests the camera format closest to `width`×`height` at
    /// `target_fps`; output pacing is the caller's responsibility, so the
    /// device's own frame rate only bounds how fast reads can complete.
    pub fn open(index: u32, width: u32, height: u32, target_fps: u32) -> Result<Self> {
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
            CameraFormat::new(Resolution::new(width, height), FrameFormat::MJPEG, target_fps),
        ));
        let mut camera = Camera::new(CameraIndex::Index(index), requested)
            .with_context(|| format!("failed to open camera {index}"))?;
        camera
            .open_stream()
            .with_context(|| format!("failed to start camera {index} stream"))?;

        info!(
            "camera {} open: {:?} ({}x{} requested)",
            index,
            camera.camera_format(),
            width,
            height
        );

        Ok(Self {
            camera,
            width,
            height,
        })
    }
}

impl VideoSource for CameraSource {
    fn read_frame(&mut self) -> Result<VideoFrame> {
        let decoded = self
            .camera
            .frame()
            .context("frame read failed")?
            .decode_image::<RgbFormat>()
            .context("frame decode failed")?;
        ensure!(
            decoded.width() == self.width && decoded.height() == self.height,
            "camera delivered {}x{}, expected {}x{}",
            decoded.width(),
            decoded.height(),
            self.width,
            self.height
        );
        let (width, height) = (decoded.width(), decoded.height());
        Ok(VideoFrame {
            data: decoded.into_raw(),
            width,
            height,
        })
    }
}
