pub mod image_sequence_camera;
pub mod stream_sink;
