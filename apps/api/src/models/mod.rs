pub mod saved_plan;
