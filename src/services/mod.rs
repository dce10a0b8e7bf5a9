pub mod ai_service;
pub mod attempt_service;
pub mod exam_service;
pub mod generation_service;
pub mod grade_scale;
pub mod grading_service;
pub mod progress_service;
pub mod registry;
pub mod result_service;
