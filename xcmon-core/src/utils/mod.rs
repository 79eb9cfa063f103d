pub mod task_key;
