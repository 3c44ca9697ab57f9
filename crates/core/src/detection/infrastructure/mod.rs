pub mod inference_worker;
pub mod model_cell;
pub mod onnx_blazeface_inference;
