/*!
    Frame conversion for the movie decoding pipeline.

    For video: pixel format conversion with swscale. For audio:
    resampling, channel layout and sample format conversion with swresample.
*/

mod audio;
mod video;

pub use audio::{AudioTransform, AudioTransformConfig};
pub use video::{PackedImage, VideoTransform, VideoTransformConfig};
