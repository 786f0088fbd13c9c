pub mod jsonl_landmark_provider;
pub mod onnx_face_mesh_provider;
